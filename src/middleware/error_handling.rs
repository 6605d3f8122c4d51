// ============================================================================
// Error Handling - HTTP error responses
// ============================================================================
//
// Internal failures (database, encryption, ERPNext transport) are logged
// server-side with full detail and answered with a generic message. Messages
// that are already user-facing (integration disabled, ERPNext missing, "check
// error log") pass through unchanged.
//
// ============================================================================

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::erpnext_crm_service::IntegrationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] JsonRejection),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),
}

impl From<crate::services::encryption_service::EncryptionError> for AppError {
    fn from(err: crate::services::encryption_service::EncryptionError) -> Self {
        tracing::error!("Encryption error: {:?}", err);
        AppError::Encryption("Encryption operation failed".to_string())
    }
}

impl From<IntegrationError> for AppError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::NotIntegrated | IntegrationError::ErpNextNotInstalled => {
                AppError::BadRequest(err.to_string())
            }
            IntegrationError::ErpNext(message) => AppError::BadGateway(message.to_string()),
            IntegrationError::DealNotFound(_) => AppError::NotFound(err.to_string()),
            IntegrationError::Storage(inner) => inner,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Validation(errors) => {
                let fields: Vec<&str> = errors.field_errors().keys().copied().collect();
                (
                    StatusCode::BAD_REQUEST,
                    format!("Validation failed: {}", fields.join(", ")),
                )
            }
            AppError::Json(_) => (StatusCode::BAD_REQUEST, "Invalid JSON".to_string()),
            AppError::JsonParsing(ref e) => {
                tracing::error!("JSON parsing error: {:?}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON format".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            // Already logged in the From impl.
            AppError::Encryption(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
