use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::platform::Platform;

/// A response the server answered with a non-success status, decoded from
/// the stable `{error, code}` wire shape where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request rejected with status {}", .0.status)]
    Rejected(Rejection),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected(r) => Some(r.status),
            ApiError::Transport(_) => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Rejected(r) => r.code.as_deref(),
            ApiError::Transport(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub role: String,
    pub approved: bool,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub session_token: String,
    pub user: SessionUser,
}

/// Deliberately permissive: a 200 with no `redirectUrl` must decode cleanly
/// so the orchestrator can reject it as malformed instead of choking on a
/// parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffOutcome {
    pub token: Option<String>,
    pub redirect_url: Option<String>,
    pub expires_at: Option<String>,
}

/// Network seam between the orchestrator and the identity service. The
/// orchestrator only ever talks through this trait, so the whole flow runs
/// against a scripted fake in tests.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(
        &self,
        email: &str,
        password: &str,
        platform: Platform,
    ) -> Result<LoginOutcome, ApiError>;
    async fn read_session(&self, session_token: &str) -> Result<SessionUser, ApiError>;
    async fn request_handoff(
        &self,
        session_token: &str,
        platform: Platform,
    ) -> Result<HandoffOutcome, ApiError>;
    async fn logout(&self, session_token: &str) -> Result<(), ApiError>;
}

/// `AuthApi` over HTTP against a deployed identity service.
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()));
        }

        #[derive(Deserialize, Default)]
        struct ErrorBody {
            error: Option<String>,
            code: Option<String>,
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(ApiError::Rejected(Rejection {
            status: status.as_u16(),
            code: body.code,
            message: body.error,
        }))
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(
        &self,
        email: &str,
        password: &str,
        platform: Platform,
    ) -> Result<LoginOutcome, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "platform": platform,
            }))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn read_session(&self, session_token: &str) -> Result<SessionUser, ApiError> {
        let response = self
            .client
            .get(self.url("/auth/session"))
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn request_handoff(
        &self,
        session_token: &str,
        platform: Platform,
    ) -> Result<HandoffOutcome, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/sso-token"))
            .bearer_auth(session_token)
            .json(&serde_json::json!({ "platform": platform }))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn logout(&self, session_token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(session_token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected(Rejection {
                status: status.as_u16(),
                code: None,
                message: None,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_outcome_tolerates_missing_fields() {
        let outcome: HandoffOutcome = serde_json::from_str("{}").unwrap();
        assert!(outcome.redirect_url.is_none());

        let outcome: HandoffOutcome =
            serde_json::from_str(r#"{"token":"t","redirectUrl":"u","expiresAt":"e"}"#).unwrap();
        assert_eq!(outcome.redirect_url.as_deref(), Some("u"));
    }

    #[test]
    fn unauthorized_detection_reads_the_status() {
        let err = ApiError::Rejected(Rejection {
            status: 401,
            code: Some("UNAUTHENTICATED".into()),
            message: Some("Unauthorized".into()),
        });
        assert!(err.is_unauthorized());
        assert!(!ApiError::Transport("timeout".into()).is_unauthorized());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpAuthApi::new("https://id.example.com/");
        assert_eq!(api.url("/auth/login"), "https://id.example.com/auth/login");
    }
}
