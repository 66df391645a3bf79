//! Ledger de bookings
//!
//! Crea, lee y persiste bookings. Cada operación pasa por la autorización,
//! valida la entrada antes de tocar el almacenamiento y acota cada llamada al
//! store con el timeout configurado.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::booking::{
    Booking, BookingNote, BookingPatch, BookingStatus, DateRange, NewBooking,
};
use crate::models::service::CatalogService;
use crate::models::user::{Identity, UserRole};
use crate::repositories::booking_repository::{
    BookingFilter, BookingPage, BookingScope, BookingStore, ExpectedState, PageRequest,
};
use crate::repositories::catalog_repository::CatalogStore;
use crate::repositories::user_repository::IdentityStore;
use crate::repositories::with_storage_timeout;
use crate::services::authorization_service::{AuthorizationService, BookingOperation};
use crate::services::booking_state_machine::{plan_transition, TransitionRequest};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::validation::{normalize_note_message, validate_new_booking, validate_patch};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_QUEUE_LIMIT: u32 = 20;

/// Cambio de estado pedido por la API
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub mechanic_id: Option<Uuid>,
    pub actual_cost: Option<Decimal>,
}

impl StatusChange {
    pub fn to(status: BookingStatus) -> Self {
        Self {
            status,
            notes: None,
            mechanic_id: None,
            actual_cost: None,
        }
    }
}

/// Filtros del listado por rol
#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub scheduled: DateRange,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Resultado paginado con sus metadatos
#[derive(Debug, Clone)]
pub struct PagedBookings {
    pub bookings: Vec<Booking>,
    pub page: PageRequest,
    pub total: u64,
}

impl PagedBookings {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page.limit))
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page.page) < self.total_pages()
    }

    pub fn has_prev_page(&self) -> bool {
        self.page.page > 1
    }
}

/// Valida `page` (>= 1) y `limit` (1..=100)
pub fn page_request(page: Option<u32>, limit: Option<u32>) -> AppResult<PageRequest> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(PageRequest { page, limit })
}

#[derive(Clone)]
pub struct BookingLedger {
    bookings: Arc<dyn BookingStore>,
    catalog: Arc<dyn CatalogStore>,
    identities: Arc<dyn IdentityStore>,
    gate: AuthorizationService,
    timeout: Duration,
}

impl BookingLedger {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        catalog: Arc<dyn CatalogStore>,
        identities: Arc<dyn IdentityStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            bookings,
            catalog,
            identities,
            gate: AuthorizationService::new(),
            timeout,
        }
    }

    pub fn gate(&self) -> &AuthorizationService {
        &self.gate
    }

    async fn load(&self, id: Uuid) -> AppResult<Booking> {
        with_storage_timeout(self.timeout, "find booking", self.bookings.find_by_id(id))
            .await?
            .ok_or_else(|| not_found_error("Booking", &id.to_string()))
    }

    /// Crea un booking pendiente con el precio del catálogo como estimación
    pub async fn create(
        &self,
        identity: &Identity,
        service_id: Uuid,
        fields: NewBooking,
    ) -> AppResult<Booking> {
        self.gate.authorize(identity, BookingOperation::Create, None)?;

        let now = Utc::now();
        validate_new_booking(&fields, now)?;

        let service = with_storage_timeout(
            self.timeout,
            "find service",
            self.catalog.find_by_id(service_id),
        )
        .await?
        .filter(|service| service.is_active)
        .ok_or_else(|| {
            AppError::ServiceUnavailable(format!(
                "Service '{}' is not available for booking",
                service_id
            ))
        })?;

        let booking = Booking::new(identity.user_id, service.id, fields, service.price, now);
        with_storage_timeout(self.timeout, "insert booking", self.bookings.insert(&booking))
            .await?;

        info!(
            "📅 Booking {} creado por {} para el servicio '{}'",
            booking.id, identity.user_id, service.title
        );
        Ok(booking)
    }

    /// Lectura con autorización de vista
    pub async fn get(&self, identity: &Identity, id: Uuid) -> AppResult<Booking> {
        let booking = self.load(id).await?;
        self.gate.authorize(identity, BookingOperation::View, Some(&booking))?;
        Ok(booking)
    }

    /// Servicio de catálogo referenciado, si sigue existiendo
    pub async fn service_of(&self, booking: &Booking) -> AppResult<Option<CatalogService>> {
        with_storage_timeout(
            self.timeout,
            "find service",
            self.catalog.find_by_id(booking.service_id),
        )
        .await
    }

    /// Aplica una transición con compare-and-set sobre `(status, mechanic_id)`
    pub async fn transition(
        &self,
        identity: &Identity,
        id: Uuid,
        change: StatusChange,
    ) -> AppResult<Booking> {
        let booking = self.load(id).await?;
        self.gate.authorize(
            identity,
            BookingOperation::ChangeStatus(change.status),
            Some(&booking),
        )?;

        let note = change
            .notes
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(normalize_note_message)
            .transpose()?
            .map(|message| BookingNote {
                author_id: identity.user_id,
                message,
                timestamp: Utc::now(),
                is_internal: false,
            });

        if let Some(mechanic_id) = change.mechanic_id {
            if identity.role != UserRole::Admin {
                return Err(AppError::Forbidden(
                    "Only administrators can assign a mechanic".to_string(),
                ));
            }
            if change.status != BookingStatus::Accepted {
                return Err(AppError::Validation(
                    "mechanicId can only be set when accepting a booking".to_string(),
                ));
            }
            self.ensure_assignable(mechanic_id).await?;
        }

        let request = TransitionRequest {
            to: change.status,
            actor: *identity,
            assign_mechanic: change.mechanic_id,
            actual_cost: change.actual_cost,
        };
        let mut updated = plan_transition(&booking, &request, Utc::now())?;

        let applied = with_storage_timeout(
            self.timeout,
            "apply transition",
            self.bookings
                .apply_transition(ExpectedState::from(&booking), &updated, note.as_ref()),
        )
        .await?;

        if !applied {
            let current = self.load(id).await?;
            warn!(
                "⚠️ Transición {} -> {} de {} perdida: el booking ya está en {}",
                booking.status, change.status, id, current.status
            );
            return Err(AppError::InvalidTransition {
                from: current.status,
                to: change.status,
            });
        }

        info!(
            "🔄 Booking {}: {} -> {} por {} ({})",
            id,
            booking.status,
            change.status,
            identity.user_id,
            identity.role.as_str()
        );

        // Ya está escrito: un fallo al releer no puede convertirse en error
        match with_storage_timeout(self.timeout, "find booking", self.bookings.find_by_id(id))
            .await
        {
            Ok(Some(current)) => Ok(current),
            Ok(None) => {
                warn!("⚠️ Booking {} no encontrado tras la transición", id);
                updated.notes.extend(note);
                Ok(updated)
            }
            Err(e) => {
                warn!("⚠️ No se pudo releer el booking {} tras la transición: {}", id, e);
                updated.notes.extend(note);
                Ok(updated)
            }
        }
    }

    /// Cancelación; el motivo se guarda como nota pública
    pub async fn cancel(
        &self,
        identity: &Identity,
        id: Uuid,
        reason: Option<String>,
    ) -> AppResult<Booking> {
        let change = StatusChange {
            notes: reason
                .filter(|r| !r.trim().is_empty())
                .map(|r| format!("Cancelled: {}", r.trim())),
            ..StatusChange::to(BookingStatus::Cancelled)
        };
        self.transition(identity, id, change).await
    }

    /// Edita campos de un booking pendiente. La escritura es condicional a
    /// que siga `pending` y en la misma versión.
    pub async fn edit_fields(
        &self,
        identity: &Identity,
        id: Uuid,
        patch: BookingPatch,
    ) -> AppResult<Booking> {
        let booking = self.load(id).await?;
        self.gate
            .authorize(identity, BookingOperation::EditFields, Some(&booking))?;

        if booking.status != BookingStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Booking is {} and can no longer be edited",
                booking.status
            )));
        }

        let now = Utc::now();
        validate_patch(&patch, now)?;

        let mut updated = booking.clone();
        patch.apply_to(&mut updated);
        updated.updated_at = now;

        let applied = with_storage_timeout(
            self.timeout,
            "update booking",
            self.bookings.update_fields(&updated, booking.version),
        )
        .await?;

        if !applied {
            return Err(AppError::Conflict(
                "Booking was modified concurrently; reload and retry".to_string(),
            ));
        }

        debug!("✏️ Booking {} editado por {}", id, identity.user_id);
        self.load(id).await
    }

    /// Añade una nota al final de la lista del booking
    pub async fn append_note(
        &self,
        identity: &Identity,
        id: Uuid,
        message: &str,
        is_internal: bool,
    ) -> AppResult<Booking> {
        let booking = self.load(id).await?;
        self.gate
            .authorize(identity, BookingOperation::AppendNote, Some(&booking))?;

        let message = normalize_note_message(message)?;
        let is_internal = self.gate.effective_internal_flag(identity, is_internal);
        self.write_note(id, identity.user_id, message, is_internal)
            .await?;

        self.load(id).await
    }

    async fn write_note(
        &self,
        id: Uuid,
        author_id: Uuid,
        message: String,
        is_internal: bool,
    ) -> AppResult<()> {
        let note = BookingNote {
            author_id,
            message,
            timestamp: Utc::now(),
            is_internal,
        };

        let appended = with_storage_timeout(
            self.timeout,
            "append note",
            self.bookings.append_note(id, &note),
        )
        .await?;

        if !appended {
            return Err(not_found_error("Booking", &id.to_string()));
        }
        debug!("📝 Nota añadida a {} (interna: {})", id, is_internal);
        Ok(())
    }

    /// Clientes ven los suyos, mecánicos los asignados, admins todos
    pub async fn find_for_identity(
        &self,
        identity: &Identity,
        query: BookingQuery,
    ) -> AppResult<PagedBookings> {
        let page = page_request(query.page, query.limit)?;
        let scope = match identity.role {
            UserRole::Customer => BookingScope::Customer(identity.user_id),
            UserRole::Mechanic => BookingScope::Mechanic(identity.user_id),
            UserRole::Admin => BookingScope::All,
        };
        let filter = BookingFilter {
            scope,
            status: query.status,
            scheduled: query.scheduled,
        };

        let BookingPage { bookings, total } = with_storage_timeout(
            self.timeout,
            "list bookings",
            self.bookings.list(&filter, page),
        )
        .await?;

        Ok(PagedBookings {
            bookings,
            page,
            total,
        })
    }

    /// Cola de pendientes sin asignar; límite por defecto 20, máximo 100
    pub async fn find_unassigned(
        &self,
        identity: &Identity,
        limit: Option<u32>,
    ) -> AppResult<Vec<Booking>> {
        self.gate
            .authorize(identity, BookingOperation::ViewUnassigned, None)?;

        let limit = match limit {
            Some(0) => {
                return Err(AppError::Validation("limit must be at least 1".to_string()))
            }
            Some(limit) => limit.min(MAX_PAGE_LIMIT),
            None => DEFAULT_QUEUE_LIMIT,
        };

        with_storage_timeout(
            self.timeout,
            "list unassigned bookings",
            self.bookings.list_unassigned(Utc::now(), limit),
        )
        .await
    }

    async fn ensure_assignable(&self, mechanic_id: Uuid) -> AppResult<()> {
        let user = with_storage_timeout(
            self.timeout,
            "find user",
            self.identities.find_by_id(mechanic_id),
        )
        .await?;

        match user {
            Some(user) if user.is_active && user.role.is_staff() => Ok(()),
            _ => Err(AppError::Validation(format!(
                "mechanicId '{}' is not an active mechanic",
                mechanic_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_bounds() {
        assert_eq!(
            page_request(None, None).unwrap(),
            PageRequest { page: 1, limit: 10 }
        );
        assert!(page_request(Some(0), None).is_err());
        assert!(page_request(None, Some(0)).is_err());
        assert!(page_request(None, Some(101)).is_err());
        assert!(page_request(Some(3), Some(100)).is_ok());
    }

    #[test]
    fn test_paged_metadata() {
        let paged = PagedBookings {
            bookings: Vec::new(),
            page: PageRequest { page: 2, limit: 10 },
            total: 25,
        };
        assert_eq!(paged.total_pages(), 3);
        assert!(paged.has_next_page());
        assert!(paged.has_prev_page());

        let last = PagedBookings {
            page: PageRequest { page: 3, limit: 10 },
            ..paged
        };
        assert!(!last.has_next_page());
    }
}
