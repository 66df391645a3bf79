//! DTOs de la API
//!
//! Requests y responses JSON (camelCase), el envoltorio `ApiResponse` y los
//! extractores que convierten los rechazos de axum en errores de validación.

pub mod auth_dto;
pub mod booking_dto;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

use crate::utils::errors::AppError;

/// Envoltorio común de las respuestas
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Body JSON deserializado y validado con `validator`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string con los rechazos como `VALIDATION_ERROR`
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Parámetros de ruta; un id mal formado es `VALIDATION_ERROR`
#[derive(Debug, Clone)]
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Body opcional: vacío equivale a `T::default()`
pub fn parse_optional_body<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?;
    value.validate()?;
    Ok(value)
}
