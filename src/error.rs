use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures a handler can surface to the client. Everything that is not
/// expected control flow folds into `Internal` and renders opaquely.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<String>),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    AuthRequired,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("account temporarily locked")]
    AccountLocked,
    #[error("account deactivated")]
    AccountDeactivated,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid or expired reset token")]
    InvalidResetToken,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "errors": errors }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": "Invalid credentials" }),
            ),
            ApiError::AuthRequired => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": "Authentication required" }),
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": "Invalid or expired token" }),
            ),
            ApiError::AccountLocked => (
                StatusCode::LOCKED,
                json!({ "success": false, "error": "Account temporarily locked" }),
            ),
            ApiError::AccountDeactivated => (
                StatusCode::FORBIDDEN,
                json!({ "success": false, "error": "Account deactivated" }),
            ),
            ApiError::DuplicateEmail => (
                StatusCode::CONFLICT,
                json!({ "success": false, "error": "Email already registered" }),
            ),
            ApiError::InvalidResetToken => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": "Invalid or expired reset token" }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": format!("{what} not found") }),
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "success": false, "error": "Too many requests, try again later" }),
            ),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_renders_errors_array() {
        let (status, body) =
            render(ApiError::Validation(vec!["Password too short".into()])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0], "Password too short");
    }

    #[tokio::test]
    async fn locked_account_is_423() {
        let (status, body) = render(ApiError::AccountLocked).await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["error"], "Account temporarily locked");
    }

    #[tokio::test]
    async fn internal_error_body_is_opaque() {
        let (status, body) =
            render(ApiError::Internal(anyhow::anyhow!("pool timed out"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("pool"));
    }
}
