use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Error taxonomy for the login and hand-off pipeline.
///
/// Every variant maps to a stable `{"error", "code"}` JSON body before it
/// crosses the network boundary; clients key off `code` and may show the
/// 4xx messages to the user. Internal detail stays in server logs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or failed password comparison.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Credentials belong to an account registered for the other platform.
    /// Hard rejection: the client is using the wrong login surface.
    #[error("This account belongs to a different platform")]
    PlatformMismatch,

    /// Teacher account that has not been approved yet.
    #[error("Your account is awaiting approval")]
    ApprovalPending,

    /// No session, or the session artifact failed validation.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Authenticated, but the session role does not match the requested
    /// platform. Distinct from [`AuthError::Unauthenticated`] so clients can
    /// tell authentication and authorization failures apart.
    #[error("Role mismatch")]
    RoleMismatch,

    /// The requested platform is not one of the known values.
    #[error("Invalid platform")]
    InvalidPlatform,

    /// No base origin configured for the requested platform. A deployment
    /// fault, reported as a server error; the body never includes the
    /// missing variable or any configured value.
    #[error("Platform URL is not configured")]
    PlatformUnconfigured,

    /// Store or crypto failure. Logged server-side, generic on the wire.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for handler return values.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Stable machine-readable code for the wire body.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::PlatformMismatch => "PLATFORM_MISMATCH",
            AuthError::ApprovalPending => "APPROVAL_PENDING",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::RoleMismatch => "ROLE_MISMATCH",
            AuthError::InvalidPlatform => "INVALID_PLATFORM",
            AuthError::PlatformUnconfigured => "PLATFORM_UNCONFIGURED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::PlatformMismatch
            | AuthError::ApprovalPending
            | AuthError::RoleMismatch => StatusCode::FORBIDDEN,
            AuthError::InvalidPlatform => StatusCode::BAD_REQUEST,
            AuthError::PlatformUnconfigured | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                "An internal error occurred".to_string()
            }
            AuthError::PlatformUnconfigured => {
                tracing::error!("platform origin missing from configuration");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": self.code(),
        });

        (self.status(), axum::Json(body)).into_response()
    }
}
