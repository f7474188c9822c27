pub mod transport;

use std::sync::Arc;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{AuthContext, SessionError};
use crate::records::SchemaError;

pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};

pub const TOKEN_REFRESH_PATH: &str = "token/refresh/";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("session expired, please log in again")]
    SessionExpired,

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the user has to log in before retrying.
    pub fn needs_login(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

struct Inner {
    base_url: Url,
    transport: Arc<dyn Transport>,
    auth: AuthContext,
    refresh_lock: tokio::sync::Mutex<()>,
}

/// JSON client for the backend. Every authenticated call goes through one
/// interceptor that handles 401s: refresh the access token once, replay the
/// request once, and drop the session if that does not help.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        auth: AuthContext,
    ) -> Result<Self, ApiError> {
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let parsed = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        Ok(Self {
            inner: Arc::new(Inner {
                base_url: parsed,
                transport,
                auth,
                refresh_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn auth(&self) -> &AuthContext {
        &self.inner.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None).await?;
        decode(path, &response)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, Some(encode(body)?)).await?;
        decode(path, &response)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PUT, path, Some(encode(body)?)).await?;
        decode(path, &response)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// POST without a bearer token, for login and registration.
    pub async fn post_public<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let response = self
            .dispatch(Method::POST, url, None, Some(encode(body)?))
            .await?;
        decode(path, &check_status(response)?)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        bearer: Option<String>,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ApiError> {
        debug!(%method, %url, "sending request");
        let response = self
            .inner
            .transport
            .execute(ApiRequest {
                method,
                url,
                bearer,
                body,
            })
            .await?;
        debug!(status = response.status, "response received");
        Ok(response)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(path)?;
        let token = self
            .inner
            .auth
            .access_token()?
            .ok_or(ApiError::NotAuthenticated)?;

        let response = self
            .dispatch(method.clone(), url.clone(), Some(token.clone()), body.clone())
            .await?;
        if response.status != 401 {
            return check_status(response);
        }

        debug!(%url, "access token rejected, refreshing");
        let fresh = match self.refresh_access_token(&token).await {
            Ok(fresh) => fresh,
            Err(ApiError::Transport(e)) => return Err(ApiError::Transport(e)),
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                self.expire_session();
                return Err(ApiError::SessionExpired);
            }
        };

        let replay = self.dispatch(method, url, Some(fresh), body).await?;
        if replay.status == 401 {
            warn!("request rejected again after token refresh");
            self.expire_session();
            return Err(ApiError::SessionExpired);
        }
        check_status(replay)
    }

    /// Refreshes at most once per stale token: callers that lost the race
    /// pick up the token the winner stored.
    async fn refresh_access_token(&self, stale: &str) -> Result<String, ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;

        let session = self
            .inner
            .auth
            .session()?
            .ok_or(ApiError::SessionExpired)?;
        if session.access_token != stale {
            return Ok(session.access_token);
        }

        let url = self.url(TOKEN_REFRESH_PATH)?;
        let body = encode(&RefreshRequest {
            refresh: &session.refresh_token,
        })?;
        let response = check_status(self.dispatch(Method::POST, url, None, Some(body)).await?)?;
        let refreshed: RefreshResponse = decode(TOKEN_REFRESH_PATH, &response)?;

        if !self
            .inner
            .auth
            .replace_access_token(refreshed.access.clone())?
        {
            return Err(ApiError::SessionExpired);
        }
        info!("access token refreshed");
        Ok(refreshed.access)
    }

    fn expire_session(&self) {
        if let Err(e) = self.inner.auth.clear() {
            warn!(error = %e, "failed to clear expired session");
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|e| ApiError::Encode { source: e })
}

fn decode<T: DeserializeOwned>(path: &str, response: &ApiResponse) -> Result<T, ApiError> {
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        source: e,
    })
}

fn check_status(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::Status {
        status: response.status,
        message: error_message(&response),
    })
}

/// Pulls a readable message out of an error body: the `detail` field the
/// backend uses, else the first field error in body order, else the raw text.
fn error_message(response: &ApiResponse) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
        if let Some(obj) = value.as_object() {
            if let Some((field, errors)) = obj.iter().next() {
                let first = errors
                    .as_array()
                    .and_then(|a| a.first())
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| errors.to_string());
                return format!("{field}: {first}");
            }
        }
    }
    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        return "no response body".to_string();
    }
    text.chars().take(200).collect()
}
