use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{kv::KvError, rate_limit::LimitExceeded};

/// One rejected field of a request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    /// A requested or default difficulty has no static board configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    RateLimited(LimitExceeded),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(#[from] KvError),

    #[error("game with id \"{0}\" not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Unauthorized(&'static str),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GameError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GameError::Configuration(_) => "CONFIGURATION_ERROR",
            GameError::Validation(_) => "VALIDATION_ERROR",
            GameError::RateLimited(LimitExceeded::Daily { .. }) => "DAILY_LIMIT_EXCEEDED",
            GameError::RateLimited(LimitExceeded::Window { .. }) => "WINDOW_LIMIT_EXCEEDED",
            GameError::Persistence(_) => "PERSISTENCE_ERROR",
            GameError::CacheUnavailable(_) => "CACHE_UNAVAILABLE",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the logs
        let message = match &self {
            GameError::Persistence(e) => {
                tracing::error!("Persistence failure: {}", e);
                "Internal server error".to_string()
            }
            GameError::Configuration(msg) => {
                tracing::error!("Configuration failure: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            GameError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
                details,
            },
        });

        let mut response = (status, body).into_response();
        if let GameError::RateLimited(LimitExceeded::Window { window_seconds, .. }) = &self {
            if let Ok(value) = HeaderValue::from_str(&window_seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
