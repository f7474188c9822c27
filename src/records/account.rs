use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::decimal;
use super::entities::StockLevel;

pub const MIN_PASSWORD_LEN: usize = 8;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn validate_credentials(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("email is required".to_string());
    }
    if !email_pattern().is_match(email.trim()) {
        return Err(format!("invalid email address '{}'", email.trim()));
    }
    if password.is_empty() {
        return Err("password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_credentials(&self.email, &self.password)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user_id: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub organization_name: String,
    pub email: String,
    pub password: String,
    pub country: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.organization_name.trim().is_empty() {
            return Err("organization name is required".to_string());
        }
        validate_credentials(&self.email, &self.password)?;
        if self.country.trim().is_empty() {
            return Err("please choose a country".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Partial profile update; unset fields are left out of the request body.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.display_name.is_none()
            && self.location.is_none()
            && self.mobile_number.is_none()
            && self.address.is_none()
            && self.business_type.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionPlan {
    pub plan: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpgradeRequest {
    pub new_plan: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DashboardDetails {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub income: Option<f64>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub expense: Option<f64>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub profit: Option<f64>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub cash_flow: Option<f64>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub products_sold: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MonthlyCashflow {
    pub month: u32,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub income: f64,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub expense: f64,
}

impl MonthlyCashflow {
    pub fn month_name(&self) -> &'static str {
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        self.month
            .checked_sub(1)
            .and_then(|i| MONTHS.get(i as usize).copied())
            .unwrap_or("")
    }

    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExpenseCategory {
    pub id: u64,
    pub name: String,
}

/// Reporting windows the expense breakdown is grouped by.
pub const EXPENSE_PERIODS: [&str; 4] = ["this_month", "last_month", "this_quarter", "this_year"];

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CategoryTotal {
    #[serde(rename = "category__name")]
    pub category: String,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub total_amount: Option<f64>,
}

impl CategoryTotal {
    pub fn amount(&self) -> f64 {
        self.total_amount.unwrap_or(0.0)
    }
}

/// Expense totals per category, keyed by reporting window.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExpenseBreakdown {
    pub periods: BTreeMap<String, Vec<CategoryTotal>>,
}

impl ExpenseBreakdown {
    /// Totals for one window; an unknown window has none.
    pub fn period(&self, name: &str) -> &[CategoryTotal] {
        self.periods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TopProduct {
    #[serde(rename = "product__name")]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub quantity_sold: Option<f64>,
    #[serde(
        rename = "product__remaining_percentage",
        default,
        deserialize_with = "decimal::option::deserialize"
    )]
    pub remaining_percentage: Option<f64>,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub total: Option<f64>,
}

impl TopProduct {
    pub fn stock_level(&self) -> Option<StockLevel> {
        self.remaining_percentage.map(StockLevel::from_percentage)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TopProductsResponse {
    #[serde(default)]
    pub top_selling_products: Vec<TopProduct>,
}
