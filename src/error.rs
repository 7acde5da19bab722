use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Broker error taxonomy. Every failure a caller can branch on maps to
/// exactly one variant; collaborator errors are translated at the boundary
/// and never cross the public interface raw.
#[derive(Debug, Error)]
pub enum AppError {
    /// The assertion validator rejected the SSO response.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Unknown, already redeemed, or expired one-time code. The three cases
    /// are deliberately indistinguishable.
    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    /// No usable authentication evidence on the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A required upstream credential is missing from configuration.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Upstream fetch failed after timeout/retry exhaustion.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        // Authentication failures carry generic messages only; validator and
        // upstream diagnostics are logged at the source, not echoed to callers.
        let (status, error_message) = match self {
            AppError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "Authentication failed".to_string())
            }
            AppError::InvalidOrExpiredCode => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired code".to_string())
            }
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
            AppError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            AppError::NotConfigured(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} is not configured", what),
            ),
            AppError::UpstreamUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                "Failed to fetch from upstream dashboard".to_string(),
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
            }),
        )
            .into_response()
    }
}
