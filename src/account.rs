use thiserror::Error;
use tracing::{info, warn};

use crate::auth::Session;
use crate::client::{ApiClient, ApiError};
use crate::records::account::{
    DashboardDetails, ExpenseBreakdown, ExpenseCategory, LoginRequest, MonthlyCashflow,
    ProfileUpdate, RegisterRequest, SubscriptionPlan, TokenPair, TopProduct, TopProductsResponse,
    UpgradeRequest, UserProfile,
};

const LOGIN_PATH: &str = "user/api/token/";
const REGISTER_PATH: &str = "user/register/";
const LOGOUT_PATH: &str = "user/logout/";
const PROFILE_PATH: &str = "user/profile/view/";
const PLANS_PATH: &str = "subscription/all/";
const UPGRADE_PATH: &str = "subscription/upgrade/";
const DASHBOARD_PATH: &str = "dashboard/details/";
const CASHFLOW_PATH: &str = "dashboard/income-expenses/";
const EXPENSE_BREAKDOWN_PATH: &str = "dashboard/expense/";
const TOP_PRODUCTS_PATH: &str = "dashboard/details/products/";
const EXPENSE_CATEGORIES_PATH: &str = "sale/expenses-category/";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(String),

    #[error("payment was not completed: {reason}")]
    CheckoutFailed { reason: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result reported by the third-party checkout widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed { reference: String },
    Failed { reason: String },
}

#[derive(serde::Serialize)]
struct LogoutRequest<'a> {
    refresh_token: &'a str,
}

/// Login, profile, subscription and dashboard calls.
#[derive(Clone, Debug)]
pub struct AccountService {
    client: ApiClient,
}

impl AccountService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate().map_err(AccountError::Invalid)?;

        let tokens: TokenPair = self.client.post_public(LOGIN_PATH, &request).await?;
        let session = Session {
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            user_id: tokens.user_id,
        };
        self.client
            .auth()
            .store(&session)
            .map_err(ApiError::from)?;
        info!(user_id = ?session.user_id, "logged in");
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), AccountError> {
        request.validate().map_err(AccountError::Invalid)?;
        let _: serde_json::Value = self.client.post_public(REGISTER_PATH, request).await?;
        Ok(())
    }

    /// Blacklists the refresh token on the server and forgets the local
    /// session. The local session is dropped even if the server call fails.
    pub async fn logout(&self) -> Result<(), AccountError> {
        let auth = self.client.auth();
        let session = auth.session().map_err(ApiError::from)?;
        let server_result = match session.as_ref() {
            Some(s) => self
                .client
                .post_public::<_, serde_json::Value>(
                    LOGOUT_PATH,
                    &LogoutRequest {
                        refresh_token: &s.refresh_token,
                    },
                )
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        auth.clear().map_err(ApiError::from)?;
        info!("logged out");
        if let Err(e) = &server_result {
            warn!(error = %e, "server-side logout failed");
        }
        server_result.map_err(AccountError::from)
    }

    pub async fn profile(&self) -> Result<UserProfile, AccountError> {
        Ok(self.client.get(PROFILE_PATH).await?)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, AccountError> {
        if update.is_empty() {
            return Err(AccountError::Invalid("nothing to update".to_string()));
        }
        Ok(self.client.put(PROFILE_PATH, update).await?)
    }

    pub async fn plans(&self) -> Result<Vec<SubscriptionPlan>, AccountError> {
        Ok(self.client.get(PLANS_PATH).await?)
    }

    pub async fn upgrade(&self, plan: &str) -> Result<(), AccountError> {
        let plan = plan.trim();
        if plan.is_empty() {
            return Err(AccountError::Invalid("plan name is required".to_string()));
        }
        let _: serde_json::Value = self
            .client
            .post(
                UPGRADE_PATH,
                &UpgradeRequest {
                    new_plan: plan.to_string(),
                },
            )
            .await?;
        info!(plan, "subscription upgraded");
        Ok(())
    }

    /// Only a completed checkout reaches the upgrade endpoint.
    pub async fn complete_checkout(
        &self,
        outcome: CheckoutOutcome,
        plan: &str,
    ) -> Result<String, AccountError> {
        match outcome {
            CheckoutOutcome::Completed { reference } => {
                self.upgrade(plan).await?;
                Ok(reference)
            }
            CheckoutOutcome::Failed { reason } => Err(AccountError::CheckoutFailed { reason }),
        }
    }

    pub async fn dashboard(&self) -> Result<DashboardDetails, AccountError> {
        Ok(self.client.get(DASHBOARD_PATH).await?)
    }

    pub async fn cashflow(&self, year: i32) -> Result<Vec<MonthlyCashflow>, AccountError> {
        let path = format!("{CASHFLOW_PATH}?year={year}");
        Ok(self.client.get(&path).await?)
    }

    pub async fn expense_breakdown(&self) -> Result<ExpenseBreakdown, AccountError> {
        Ok(self.client.get(EXPENSE_BREAKDOWN_PATH).await?)
    }

    pub async fn top_products(&self) -> Result<Vec<TopProduct>, AccountError> {
        let response: TopProductsResponse = self.client.get(TOP_PRODUCTS_PATH).await?;
        Ok(response.top_selling_products)
    }

    pub async fn expense_categories(&self) -> Result<Vec<ExpenseCategory>, AccountError> {
        Ok(self.client.get(EXPENSE_CATEGORIES_PATH).await?)
    }
}
