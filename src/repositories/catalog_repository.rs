//! Catálogo de servicios
//!
//! Solo lectura desde el núcleo: un booking consulta su servicio al crearse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::service::CatalogService;
use crate::utils::errors::AppResult;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CatalogService>>;
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    title: String,
    category: String,
    price: Decimal,
    duration_minutes: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ServiceRow> for CatalogService {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            category: row.category,
            price: row.price,
            duration_minutes: row.duration_minutes,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CatalogService>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, title, category, price, duration_minutes, is_active, created_at
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CatalogService::from))
    }
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    services: RwLock<HashMap<Uuid, CatalogService>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, service: CatalogService) {
        self.services.write().await.insert(service.id, service);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CatalogService>> {
        Ok(self.services.read().await.get(&id).cloned())
    }
}
