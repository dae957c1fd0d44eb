// src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Why a payload was rejected before anything reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("date '{value}' is not a valid calendar date")]
    InvalidDate { value: String },
}

/// Failure reported by the entity store. Never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {operation} failed: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("stored document is corrupt: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn database(operation: &'static str, source: mongodb::error::Error) -> Self {
        StoreError::Database { operation, source }
    }
}

/// Outcome taxonomy of the record service.
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("todo {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TodoResult<T> = Result<T, TodoError>;

/// Raised while loading configuration, before the server accepts traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ALLOWED_IPS entry '{0}' is not a valid IP address")]
    InvalidAllowedIp(String),

    #[error("APP_ENV '{0}' is not one of development, production")]
    InvalidEnvironment(String),
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
        }
    }
}

impl ResponseError for TodoError {
    fn status_code(&self) -> StatusCode {
        match self {
            TodoError::Validation(_) => StatusCode::BAD_REQUEST,
            TodoError::NotFound(_) => StatusCode::NOT_FOUND,
            TodoError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // store details stay in the log
        let message = match self {
            TodoError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ErrorResponse::new(status, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let validation = TodoError::from(ValidationError::Required { field: "name" });
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(TodoError::NotFound(7).status_code(), StatusCode::NOT_FOUND);

        let store = TodoError::from(StoreError::Unavailable("down".to_string()));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn store_failure_body_hides_details() {
        let store = TodoError::from(StoreError::Unavailable("db-7.internal".to_string()));
        let resp = store.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("500"));
        assert!(!body.contains("db-7.internal"));
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::TooLong { field: "status", max: 50 };
        assert_eq!(err.to_string(), "status must be at most 50 characters");
    }
}
