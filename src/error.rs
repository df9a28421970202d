use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Malformed provider output: {0}")]
    MalformedProviderOutput(String),

    #[error("Recommendation chain exhausted: {0}")]
    ExhaustedChain(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl AppError {
    /// Whether the orchestrator may advance past this error to the next
    /// provider in the chain. Non-recoverable errors propagate to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited(_)
                | AppError::Transport(_)
                | AppError::ValidationFailed(_)
                | AppError::MalformedProviderOutput(_)
                | AppError::Cache(_)
        )
    }

    /// Stable machine-readable code included in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::RateLimited(_) => "rate_limited",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Transport(_) => "transport_error",
            AppError::ValidationFailed(_) => "validation_failed",
            AppError::MalformedProviderOutput(_) => "malformed_provider_output",
            AppError::ExhaustedChain(_) => "chain_exhausted",
            AppError::Cache(_) => "cache_error",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ExhaustedChain(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Transport(_) | AppError::ValidationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::MalformedProviderOutput(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
