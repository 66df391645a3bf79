//! Repositorios
//!
//! Puertos de almacenamiento (bookings, catálogo, identidades) con sus
//! implementaciones PostgreSQL y en memoria.

pub mod booking_repository;
pub mod catalog_repository;
pub mod memory_booking_repository;
pub mod postgres_booking_repository;
pub mod user_repository;

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::utils::errors::{AppError, AppResult};

/// Acota una llamada al almacenamiento; al expirar devuelve `StorageUnavailable`
pub async fn with_storage_timeout<T, F>(limit: Duration, operation: &str, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("⏱️ Timeout de almacenamiento en '{}' tras {}ms", operation, limit.as_millis());
            Err(AppError::StorageUnavailable(format!(
                "{} timed out after {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}
