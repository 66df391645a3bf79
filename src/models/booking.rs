//! Modelo de Booking
//!
//! Este módulo contiene la entidad Booking, sus sub-registros (ubicación,
//! vehículo, contacto, timeline, notas, rating) y los campos derivados que
//! se calculan en lectura en lugar de persistirse.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::AppError;

/// Estado del booking en su ciclo de vida
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no-show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Etiqueta legible para el cliente
    pub fn display_label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending Assignment",
            BookingStatus::Accepted => "Mechanic Assigned",
            BookingStatus::InProgress => "Service in Progress",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::NoShow => "No Show",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = BookingStatus::ALL.iter().map(|s| s.as_str()).collect();
                AppError::Validation(format!(
                    "Invalid status '{}'. Valid statuses: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Nivel de urgencia - solo se usa para ordenar la cola sin asignar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Emergency => "emergency",
        }
    }

    /// Rango numérico (mayor = más urgente), usado también en SQL
    pub fn rank(&self) -> i16 {
        match self {
            UrgencyLevel::Low => 0,
            UrgencyLevel::Medium => 1,
            UrgencyLevel::High => 2,
            UrgencyLevel::Emergency => 3,
        }
    }
}

impl FromStr for UrgencyLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(UrgencyLevel::Low),
            "medium" => Ok(UrgencyLevel::Medium),
            "high" => Ok(UrgencyLevel::High),
            "emergency" => Ok(UrgencyLevel::Emergency),
            other => Err(AppError::Validation(format!("Invalid urgency level '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Car,
    Motorcycle,
    Truck,
    Ev,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreferredContact {
    #[default]
    Phone,
    Whatsapp,
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Ubicación del servicio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub vehicle_type: VehicleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub phone: String,
    #[serde(default)]
    pub alternate_phone: Option<String>,
    #[serde(default)]
    pub preferred_contact: PreferredContact,
}

/// Primeras marcas de tiempo de cada hito del ciclo de vida
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Timeline {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    /// Marca el hito del estado alcanzado solo si no estaba marcado.
    /// Devuelve `true` si se escribió una marca nueva.
    pub fn stamp(&mut self, status: BookingStatus, now: DateTime<Utc>) -> bool {
        let slot = match status {
            BookingStatus::Accepted => &mut self.accepted_at,
            BookingStatus::InProgress => &mut self.started_at,
            BookingStatus::Completed => &mut self.completed_at,
            BookingStatus::Cancelled => &mut self.cancelled_at,
            BookingStatus::Pending | BookingStatus::NoShow => return false,
        };

        if slot.is_some() {
            return false;
        }
        *slot = Some(now);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingNote {
    pub author_id: Uuid,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub score: i16,
    pub feedback: Option<String>,
    pub rated_at: DateTime<Utc>,
}

/// Ventana temporal inclusiva; un extremo ausente no limita
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| at >= start)
            && self.end_date.map_or(true, |end| at <= end)
    }
}

/// Campos que el cliente aporta al crear un booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub scheduled_at: DateTime<Utc>,
    pub location: Location,
    pub vehicle_info: VehicleInfo,
    pub contact_info: ContactInfo,
    pub problem_description: Option<String>,
    pub urgency_level: UrgencyLevel,
}

/// Edición parcial de un booking pendiente
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub vehicle_info: Option<VehicleInfo>,
    pub contact_info: Option<ContactInfo>,
    pub problem_description: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.scheduled_at.is_none()
            && self.location.is_none()
            && self.vehicle_info.is_none()
            && self.contact_info.is_none()
            && self.problem_description.is_none()
            && self.urgency_level.is_none()
    }

    pub fn apply_to(self, booking: &mut Booking) {
        if let Some(scheduled_at) = self.scheduled_at {
            booking.scheduled_at = scheduled_at;
        }
        if let Some(location) = self.location {
            booking.location = location;
        }
        if let Some(vehicle_info) = self.vehicle_info {
            booking.vehicle_info = vehicle_info;
        }
        if let Some(contact_info) = self.contact_info {
            booking.contact_info = contact_info;
        }
        if let Some(problem_description) = self.problem_description {
            booking.problem_description = Some(problem_description);
        }
        if let Some(urgency_level) = self.urgency_level {
            booking.urgency_level = urgency_level;
        }
    }
}

/// Booking principal
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub mechanic_id: Option<Uuid>,
    pub status: BookingStatus,
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
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        customer_id: Uuid,
        service_id: Uuid,
        fields: NewBooking,
        estimated_cost: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            service_id,
            mechanic_id: None,
            status: BookingStatus::Pending,
            scheduled_at: fields.scheduled_at,
            location: fields.location,
            vehicle_info: fields.vehicle_info,
            contact_info: fields.contact_info,
            problem_description: fields.problem_description,
            urgency_level: fields.urgency_level,
            estimated_cost,
            actual_cost: None,
            timeline: Timeline::new(now),
            notes: Vec::new(),
            rating: None,
            version: 1,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id
    }

    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.mechanic_id == Some(user_id)
    }

    /// Duración del servicio en minutos (inicio -> fin)
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.timeline.started_at, self.timeline.completed_at) {
            (Some(started), Some(completed)) => {
                let seconds = (completed - started).num_seconds() as f64;
                Some((seconds / 60.0).round() as i64)
            }
            _ => None,
        }
    }

    /// Duración total en horas (creación -> fin)
    pub fn total_duration_hours(&self) -> Option<i64> {
        self.timeline.completed_at.map(|completed| {
            let seconds = (completed - self.timeline.created_at).num_seconds() as f64;
            (seconds / 3600.0).round() as i64
        })
    }

    pub fn status_display(&self) -> &'static str {
        self.status.display_label()
    }

    /// Notas visibles para el lector; las internas se ocultan a los clientes
    pub fn visible_notes(&self, include_internal: bool) -> Vec<&BookingNote> {
        self.notes
            .iter()
            .filter(|note| include_internal || !note.is_internal)
            .collect()
    }
}
