//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Los stores se inyectan como trait objects.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::StatsCache;
use crate::config::environment::EnvironmentConfig;
use crate::repositories::booking_repository::BookingStore;
use crate::repositories::catalog_repository::{CatalogStore, InMemoryCatalogStore, PgCatalogStore};
use crate::repositories::memory_booking_repository::InMemoryBookingStore;
use crate::repositories::postgres_booking_repository::PgBookingStore;
use crate::repositories::user_repository::{IdentityStore, InMemoryIdentityStore, PgIdentityStore};
use crate::services::auth_service::AuthService;
use crate::services::booking_ledger::BookingLedger;
use crate::services::booking_stats_service::BookingStatsService;
use crate::utils::jwt::{JwtConfig, JwtService};

/// Stores de los que depende el núcleo
#[derive(Clone)]
pub struct Stores {
    pub bookings: Arc<dyn BookingStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub identities: Arc<dyn IdentityStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            bookings: Arc::new(PgBookingStore::new(pool.clone())),
            catalog: Arc::new(PgCatalogStore::new(pool.clone())),
            identities: Arc::new(PgIdentityStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            bookings: Arc::new(InMemoryBookingStore::new()),
            catalog: Arc::new(InMemoryCatalogStore::new()),
            identities: Arc::new(InMemoryIdentityStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub ledger: BookingLedger,
    pub stats: BookingStatsService,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, stores: Stores, stats_cache: Option<StatsCache>) -> Self {
        let timeout: Duration = config.storage_timeout();
        let jwt = JwtService::new(&JwtConfig::from(&config));

        Self {
            ledger: BookingLedger::new(
                stores.bookings.clone(),
                stores.catalog,
                stores.identities.clone(),
                timeout,
            ),
            stats: BookingStatsService::new(stores.bookings, stats_cache, timeout),
            auth: AuthService::new(stores.identities, jwt, timeout),
            config: Arc::new(config),
        }
    }
}
