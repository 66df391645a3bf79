//! Puerto de persistencia de bookings
//!
//! Las escrituras de estado son condicionales: el store solo acepta la
//! actualización si el registro sigue en el estado que el llamador observó.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingNote, BookingStatus, DateRange};
use crate::utils::errors::AppResult;

/// Qué bookings ve cada rol en los listados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    All,
    Customer(Uuid),
    Mechanic(Uuid),
}

impl BookingScope {
    pub fn includes(&self, booking: &Booking) -> bool {
        match self {
            BookingScope::All => true,
            BookingScope::Customer(id) => booking.customer_id == *id,
            BookingScope::Mechanic(id) => booking.mechanic_id == Some(*id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingFilter {
    pub scope: BookingScope,
    pub status: Option<BookingStatus>,
    /// Se aplica sobre `scheduled_at`
    pub scheduled: DateRange,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.scope.includes(booking)
            && self.status.map_or(true, |status| booking.status == status)
            && self.scheduled.contains(booking.scheduled_at)
    }
}

/// Página solicitada (page empieza en 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: u64,
}

/// Estado observado antes de planificar una transición
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedState {
    pub status: BookingStatus,
    pub mechanic_id: Option<Uuid>,
}

impl From<&Booking> for ExpectedState {
    fn from(booking: &Booking) -> Self {
        Self {
            status: booking.status,
            mechanic_id: booking.mechanic_id,
        }
    }
}

/// Agregado por estado para las estadísticas
#[derive(Debug, Clone, PartialEq)]
pub struct StatusAggregate {
    pub status: BookingStatus,
    pub count: i64,
    pub total_revenue: Decimal,
    pub avg_rating: Option<f64>,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> AppResult<()>;

    /// Booking con sus notas en orden de escritura
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>>;

    /// Compare-and-set sobre `(status, mechanic_id)`. Escribe estado,
    /// asignación, timeline, coste y la nota opcional en una sola operación.
    /// Devuelve `false` (sin escribir nada) si el registro ya no coincide
    /// con `expected`.
    async fn apply_transition(
        &self,
        expected: ExpectedState,
        updated: &Booking,
        note: Option<&BookingNote>,
    ) -> AppResult<bool>;

    /// Escribe los campos editables solo si el booking sigue `pending`
    /// y su versión es `expected_version`.
    async fn update_fields(&self, updated: &Booking, expected_version: i64) -> AppResult<bool>;

    /// Añade una nota al final. `false` si el booking no existe.
    async fn append_note(&self, booking_id: Uuid, note: &BookingNote) -> AppResult<bool>;

    /// Más recientes primero por fecha de creación
    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> AppResult<BookingPage>;

    /// Pendientes sin asignar programados después de `now`, por urgencia
    /// descendente y luego fecha programada ascendente.
    async fn list_unassigned(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Booking>>;

    /// Agregados por estado de los bookings creados dentro de `created`
    async fn aggregate_by_status(&self, created: &DateRange) -> AppResult<Vec<StatusAggregate>>;
}
