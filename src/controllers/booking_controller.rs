use uuid::Uuid;

use crate::dto::booking_dto::{
    AddNoteRequest, BookingListResponse, BookingResponse, CancelBookingRequest,
    CreateBookingRequest, ListBookingsQuery, PaginationMeta, PendingBookingsQuery,
    PendingBookingsResponse, StatsQuery, UpdateBookingRequest, UpdateStatusRequest,
};
use crate::dto::ApiResponse;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::user::{Identity, UserRole};
use crate::services::booking_ledger::{BookingLedger, BookingQuery, StatusChange};
use crate::services::booking_stats_service::{BookingStatsService, StatsReport};
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};
use crate::utils::validation::parse_date_range;

pub struct BookingController {
    ledger: BookingLedger,
    stats: BookingStatsService,
}

impl BookingController {
    pub fn new(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
            stats: state.stats.clone(),
        }
    }

    fn render(&self, identity: &Identity, booking: Booking) -> BookingResponse {
        let include_internal = self.ledger.gate().can_see_internal_notes(identity);
        BookingResponse::from_booking(booking, include_internal)
    }

    pub async fn create(
        &self,
        identity: &Identity,
        request: CreateBookingRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let (service_id, fields) = request.into_fields();
        let booking = self.ledger.create(identity, service_id, fields).await?;
        let service = self.ledger.service_of(&booking).await?;

        Ok(ApiResponse::success_with_message(
            self.render(identity, booking).with_service(service),
            "Booking created successfully",
        ))
    }

    pub async fn list(
        &self,
        identity: &Identity,
        query: ListBookingsQuery,
    ) -> Result<ApiResponse<BookingListResponse>, AppError> {
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<BookingStatus>)
            .transpose()?;
        let scheduled =
            parse_date_range(query.start_date.as_deref(), query.end_date.as_deref())?;

        let paged = self
            .ledger
            .find_for_identity(
                identity,
                BookingQuery {
                    status,
                    scheduled,
                    page: query.page,
                    limit: query.limit,
                },
            )
            .await?;

        let pagination = PaginationMeta::from(&paged);
        let bookings = paged
            .bookings
            .into_iter()
            .map(|booking| self.render(identity, booking))
            .collect();

        Ok(ApiResponse::success(BookingListResponse {
            bookings,
            pagination,
        }))
    }

    pub async fn get(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let booking = self.ledger.get(identity, id).await?;
        let service = self.ledger.service_of(&booking).await?;
        Ok(ApiResponse::success(
            self.render(identity, booking).with_service(service),
        ))
    }

    pub async fn update_status(
        &self,
        identity: &Identity,
        id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        // Los clientes cancelan por /cancel
        if identity.role == UserRole::Customer {
            return Err(forbidden_error(
                "update booking status",
                "only mechanics and administrators can change a booking status",
            ));
        }

        let status: BookingStatus = request.status.trim().parse()?;
        let change = StatusChange {
            status,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            mechanic_id: request.mechanic_id,
            actual_cost: request.actual_cost,
        };

        let booking = self.ledger.transition(identity, id, change).await?;
        Ok(ApiResponse::success_with_message(
            self.render(identity, booking),
            format!("Booking status updated to {}", status),
        ))
    }

    pub async fn cancel(
        &self,
        identity: &Identity,
        id: Uuid,
        request: CancelBookingRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let booking = self.ledger.cancel(identity, id, request.reason).await?;
        Ok(ApiResponse::success_with_message(
            self.render(identity, booking),
            "Booking cancelled successfully",
        ))
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        request: UpdateBookingRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let booking = self.ledger.edit_fields(identity, id, request.into()).await?;
        Ok(ApiResponse::success_with_message(
            self.render(identity, booking),
            "Booking updated successfully",
        ))
    }

    pub async fn add_note(
        &self,
        identity: &Identity,
        id: Uuid,
        request: AddNoteRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let booking = self
            .ledger
            .append_note(identity, id, &request.message, request.is_internal)
            .await?;
        Ok(ApiResponse::success_with_message(
            self.render(identity, booking),
            "Note added successfully",
        ))
    }

    pub async fn pending(
        &self,
        identity: &Identity,
        query: PendingBookingsQuery,
    ) -> Result<ApiResponse<PendingBookingsResponse>, AppError> {
        let bookings: Vec<BookingResponse> = self
            .ledger
            .find_unassigned(identity, query.limit)
            .await?
            .into_iter()
            .map(|booking| self.render(identity, booking))
            .collect();

        Ok(ApiResponse::success(PendingBookingsResponse {
            count: bookings.len(),
            bookings,
        }))
    }

    pub async fn stats(
        &self,
        identity: &Identity,
        query: StatsQuery,
    ) -> Result<ApiResponse<StatsReport>, AppError> {
        let report = self
            .stats
            .generate(
                identity,
                query.start_date.as_deref(),
                query.end_date.as_deref(),
            )
            .await?;
        Ok(ApiResponse::success(report))
    }
}
