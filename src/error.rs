//! Error taxonomy of the portal.
//!
//! The Access Guard and the Classification Filter never fail; everything that can
//! go wrong at the store or HTTP boundary ends up as a `PortalError`, which knows
//! how to render itself as a response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Message shared by every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// No authenticated principal on the request.
    #[error("authentication required")]
    NotAuthenticated,

    /// Authenticated, but the role ranks below the required level.
    #[error("access denied")]
    Forbidden,

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not found")]
    NotFound,

    /// A uniqueness constraint of the store was broken.
    #[error("{0} already exists")]
    ConstraintViolation(String),

    /// A form field is missing or holds an unrecognized value.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::NotAuthenticated | PortalError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            PortalError::Forbidden => StatusCode::FORBIDDEN,
            PortalError::NotFound => StatusCode::NOT_FOUND,
            PortalError::ConstraintViolation(_) => StatusCode::CONFLICT,
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let what = db_err.constraint().unwrap_or("record").to_string();
                PortalError::ConstraintViolation(what)
            }
            sqlx::Error::RowNotFound => PortalError::NotFound,
            _ => PortalError::Storage(err.to_string()),
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Store details stay in the logs.
        let message = match &self {
            PortalError::Storage(detail) => {
                tracing::error!("storage failure: {}", detail);
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
