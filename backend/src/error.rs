//! Error types for the server
//!
//! Every failure a command or request can hit maps onto one
//! [`ServiceError`] variant. HTTP handlers turn it into a status code and a
//! JSON body; the WebSocket handler turns it into a single `ERROR` message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_rules::RulesError;
use shared::models::ErrorResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Bad or missing auth token, or wrong credentials
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed command or invalid reference
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Seat or username already taken
    #[error("already taken: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected by the rules engine
    #[error("invalid move: {0}")]
    InvalidMove(#[from] RulesError),

    /// Unexpected failure in a collaborator
    #[error("server error: {0}")]
    ServerError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::BadRequest(_) | ServiceError::InvalidMove(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to clients
    pub fn client_message(&self) -> String {
        format!("Error: {}", self)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::ServerError(format!("database error: {}", err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::ServerError(format!("serialization error: {}", err))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.client_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
