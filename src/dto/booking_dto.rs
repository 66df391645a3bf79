//! DTOs de bookings
//!
//! Los campos derivados (`durationMinutes`, `totalDurationHours`,
//! `statusDisplay`) se calculan aquí al construir la respuesta.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::{
    Booking, BookingNote, BookingPatch, BookingStatus, ContactInfo, Location, NewBooking, Rating,
    Timeline, UrgencyLevel, VehicleInfo,
};
use crate::models::service::CatalogService;
use crate::services::booking_ledger::PagedBookings;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub service_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub location: Location,
    #[serde(default)]
    pub vehicle_info: Option<VehicleInfo>,
    pub contact_info: ContactInfo,
    #[validate(length(max = 1000, message = "Problem description cannot exceed 1000 characters"))]
    pub problem_description: Option<String>,
    #[serde(default)]
    pub urgency_level: Option<UrgencyLevel>,
}

impl CreateBookingRequest {
    pub fn into_fields(self) -> (Uuid, NewBooking) {
        let fields = NewBooking {
            scheduled_at: self.scheduled_at,
            location: self.location,
            vehicle_info: self.vehicle_info.unwrap_or_default(),
            contact_info: self.contact_info,
            problem_description: trimmed(self.problem_description),
            urgency_level: self.urgency_level.unwrap_or_default(),
        };
        (self.service_id, fields)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub vehicle_info: Option<VehicleInfo>,
    pub contact_info: Option<ContactInfo>,
    #[validate(length(max = 1000, message = "Problem description cannot exceed 1000 characters"))]
    pub problem_description: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
}

impl From<UpdateBookingRequest> for BookingPatch {
    fn from(request: UpdateBookingRequest) -> Self {
        Self {
            scheduled_at: request.scheduled_at,
            location: request.location,
            vehicle_info: request.vehicle_info,
            contact_info: request.contact_info,
            problem_description: trimmed(request.problem_description),
            urgency_level: request.urgency_level,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// Se parsea en el controller para devolver `VALIDATION_ERROR` con los válidos
    pub status: String,
    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,
    pub mechanic_id: Option<Uuid>,
    pub actual_cost: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    #[validate(length(max = 480, message = "Reason cannot exceed 480 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteRequest {
    pub message: String,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingBookingsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub duration_display: String,
}

impl From<CatalogService> for ServiceSummary {
    fn from(service: CatalogService) -> Self {
        Self {
            duration_display: service.duration_display(),
            id: service.id,
            title: service.title,
            category: service.category,
            price: service.price,
            duration_minutes: service.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub status: BookingStatus,
    pub status_display: String,
    pub scheduled_at: DateTime<Utc>,
    pub location: Location,
    pub vehicle_info: VehicleInfo,
    pub contact_info: ContactInfo,
    pub problem_description: Option<String>,
    pub urgency_level: UrgencyLevel,
    pub estimated_cost: Decimal,
    pub actual_cost: Option<Decimal>,
    pub timeline: Timeline,
    pub notes: Vec<BookingNote>,
    pub rating: Option<Rating>,
    pub duration_minutes: Option<i64>,
    pub total_duration_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSummary>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl BookingResponse {
    /// `include_internal` es falso para clientes
    pub fn from_booking(booking: Booking, include_internal: bool) -> Self {
        let notes = booking
            .visible_notes(include_internal)
            .into_iter()
            .cloned()
            .collect();

        Self {
            status_display: booking.status_display().to_string(),
            duration_minutes: booking.duration_minutes(),
            total_duration_hours: booking.total_duration_hours(),
            notes,
            id: booking.id,
            customer_id: booking.customer_id,
            service_id: booking.service_id,
            mechanic_id: booking.mechanic_id,
            status: booking.status,
            scheduled_at: booking.scheduled_at,
            location: booking.location,
            vehicle_info: booking.vehicle_info,
            contact_info: booking.contact_info,
            problem_description: booking.problem_description,
            urgency_level: booking.urgency_level,
            estimated_cost: booking.estimated_cost,
            actual_cost: booking.actual_cost,
            timeline: booking.timeline,
            rating: booking.rating,
            service: None,
            version: booking.version,
            updated_at: booking.updated_at,
        }
    }

    pub fn with_service(mut self, service: Option<CatalogService>) -> Self {
        self.service = service.map(ServiceSummary::from);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_bookings: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: u32,
}

impl From<&PagedBookings> for PaginationMeta {
    fn from(paged: &PagedBookings) -> Self {
        Self {
            current_page: paged.page.page,
            total_pages: paged.total_pages(),
            total_bookings: paged.total,
            has_next_page: paged.has_next_page(),
            has_prev_page: paged.has_prev_page(),
            limit: paged.page.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct PendingBookingsResponse {
    pub bookings: Vec<BookingResponse>,
    pub count: usize,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::fixtures::pending_booking;

    #[test]
    fn test_response_filters_internal_notes_and_derives_fields() {
        let mut booking = pending_booking();
        for (message, is_internal) in [("visible", false), ("staff only", true)] {
            booking.notes.push(BookingNote {
                author_id: Uuid::new_v4(),
                message: message.to_string(),
                timestamp: Utc::now(),
                is_internal,
            });
        }

        let customer = serde_json::to_value(BookingResponse::from_booking(booking.clone(), false))
            .unwrap();
        assert_eq!(customer["notes"].as_array().unwrap().len(), 1);
        assert_eq!(customer["statusDisplay"], "Pending Assignment");
        assert_eq!(customer["status"], "pending");
        assert!(customer["durationMinutes"].is_null());
        assert!(customer.get("service").is_none());

        let staff = BookingResponse::from_booking(booking, true);
        assert_eq!(staff.notes.len(), 2);
    }

    #[test]
    fn test_create_request_defaults() {
        let body = serde_json::json!({
            "serviceId": Uuid::new_v4(),
            "scheduledAt": "2030-01-01T10:00:00Z",
            "location": { "address": "1 Main St", "city": "Pune", "state": "MH" },
            "contactInfo": { "phone": "+91 98765 43210" },
            "problemDescription": "  Engine won't start  "
        });
        let request: CreateBookingRequest = serde_json::from_value(body).unwrap();
        let (_, fields) = request.into_fields();

        assert_eq!(fields.urgency_level, UrgencyLevel::Medium);
        assert_eq!(fields.problem_description.as_deref(), Some("Engine won't start"));
        assert_eq!(fields.vehicle_info, VehicleInfo::default());
    }
}
