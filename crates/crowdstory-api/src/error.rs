//! Crowdstory — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crowdstory_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The story table could not be loaded.
    #[error("story content error: {0}")]
    Content(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::RoomNotFound(_) => (StatusCode::NOT_FOUND, "room_not_found"),
            DomainError::UnknownPlayer(_) => (StatusCode::NOT_FOUND, "unknown_player"),
            DomainError::NameTaken(_) => (StatusCode::CONFLICT, "name_taken"),
            DomainError::RoomFull { .. } => (StatusCode::CONFLICT, "room_full"),
            DomainError::GameAlreadyStarted => (StatusCode::CONFLICT, "game_already_started"),
            DomainError::InvalidPhase { .. } => (StatusCode::CONFLICT, "invalid_phase"),
            DomainError::VotingClosed => (StatusCode::CONFLICT, "voting_closed"),
            DomainError::NotHost => (StatusCode::FORBIDDEN, "not_host"),
            DomainError::InvalidChoice(_) => (StatusCode::BAD_REQUEST, "invalid_choice"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::GenerationExhausted { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "generation_exhausted")
            }
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
