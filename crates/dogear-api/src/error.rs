use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Application-level error type for services and HTTP handlers.
///
/// Every failure is scoped to the request that caused it. The response body
/// is `{"error": <message>, "kind": <machine-readable kind>}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or empty input.
    #[error("{0}")]
    Validation(String),

    /// Unknown, used or expired invite. Reported as a validation failure.
    #[error("{0}")]
    InvalidInvite(String),

    /// Missing credentials, bad credentials, or an inactive/unknown user.
    #[error("{0}")]
    Authentication(String),

    /// Signature, format or expiry failure on a session token.
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// Absent or owned by someone else; the two are never distinguished.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate email at registration.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for service and handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidInvite(_) => "validation_error",
            Self::Authentication(_) | Self::InvalidToken(_) => "authentication_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict_error",
            Self::Database(_) | Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // The register contract reports invite and email problems as 400.
            Self::InvalidInvite(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::InvalidToken(_) => "Invalid token".to_string(),
            Self::Database(e) => {
                error!(error = %e, "Database error");
                "An internal error occurred".to_string()
            }
            Self::Internal(msg) => {
                error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "kind": self.kind(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Run blocking work (SQLite, password hashing) off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AppError::Internal(format!("blocking task failed: {e}"))
    })?
}
