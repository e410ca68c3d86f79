// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::ImageError;
use crate::services::ingest::IngestError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Vision inference failed: {0}")]
    Inference(String),

    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Sighting could not be saved: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::InvalidImage(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_image", msg.clone())
            }
            AppError::Inference(msg) => {
                tracing::error!(error = %msg, "Inference failure");
                (StatusCode::BAD_GATEWAY, "inference_error", self.to_string())
            }
            AppError::Upload(msg) => {
                tracing::error!(error = %msg, "Upload failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "upload_error", self.to_string())
            }
            AppError::Persistence(msg) => {
                tracing::error!(error = %msg, "Persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", self.to_string())
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database unavailable".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            detail,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        AppError::InvalidImage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnknownUser(_) => AppError::Unauthorized,
            IngestError::InferenceFailure { .. } => AppError::Inference(err.to_string()),
            IngestError::UploadFailure(msg) => AppError::Upload(msg),
            IngestError::PersistenceFailure(msg) => AppError::Persistence(msg),
            IngestError::UserLookupFailure(msg) => AppError::Database(msg),
        }
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
