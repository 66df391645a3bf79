//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::booking::BookingStatus;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Código estable expuesto al cliente
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::Jwt(_) => "JWT_ERROR",
            AppError::Hash(_) => "HASH_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Hash(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Solo los fallos transitorios del almacenamiento se pueden reintentar
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_))
    }
}

/// Clasifica los errores de SQLx entre transitorios e internos
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::StorageUnavailable(e.to_string())
            }
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Internal(format!("Database error: {}", other)),
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
    code: &'static str,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let retryable = self.is_retryable();

        let (error, message, details) = match &self {
            AppError::Validation(msg) => ("Validation Error", msg.clone(), None),
            AppError::InvalidFields(e) => (
                "Validation Error",
                "The provided data is invalid".to_string(),
                Some(json!(e)),
            ),
            AppError::Unauthenticated(msg) => ("Unauthenticated", msg.clone(), None),
            AppError::Forbidden(msg) => ("Forbidden", msg.clone(), None),
            AppError::NotFound(msg) => ("Not Found", msg.clone(), None),
            AppError::Conflict(msg) => ("Conflict", msg.clone(), None),
            AppError::InvalidTransition { from, to } => (
                "Invalid Transition",
                self.to_string(),
                Some(json!({ "currentStatus": from, "requestedStatus": to })),
            ),
            AppError::ServiceUnavailable(msg) => ("Service Unavailable", msg.clone(), None),
            AppError::StorageUnavailable(_) => (
                "Storage Unavailable",
                "The booking store is temporarily unavailable. Please retry".to_string(),
                None,
            ),
            AppError::Jwt(msg) => ("JWT Error", msg.clone(), None),
            AppError::Hash(_) => (
                "Hash Error",
                "An error occurred while processing credentials".to_string(),
                None,
            ),
            AppError::Internal(_) => (
                "Internal Server Error",
                "An unexpected error occurred".to_string(),
                None,
            ),
        };

        if status.is_server_error() {
            error!("❌ {} ({}): {}", error, code, self);
        } else {
            warn!("⚠️ {} ({}): {}", error, code, self);
        }

        let body = ErrorResponse {
            success: false,
            error: error.to_string(),
            message,
            code,
            retryable,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

/// Función helper para crear errores internos
pub fn internal_error(message: &str) -> AppError {
    AppError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(validation_error("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unauthenticated("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(forbidden_error("edit", "not owner").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(not_found_error("Booking", "1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InvalidTransition {
                from: BookingStatus::Completed,
                to: BookingStatus::Cancelled,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ServiceUnavailable("inactive".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::StorageUnavailable("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(AppError::StorageUnavailable("timeout".into()).is_retryable());
        assert!(!validation_error("bad").is_retryable());
        assert!(!AppError::Forbidden("no".into()).is_retryable());
        assert!(!internal_error("boom").is_retryable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppError::InvalidTransition {
            from: BookingStatus::Completed,
            to: BookingStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Cannot transition from completed to cancelled");
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_sqlx_pool_timeout_is_storage_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::StorageUnavailable(_)));
    }
}
