//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos. El ledger las invoca explícitamente antes de
//! persistir cualquier booking.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use validator::ValidationError;

use crate::models::booking::{BookingPatch, ContactInfo, DateRange, Location, NewBooking};
use crate::utils::errors::AppError;

pub const MAX_ADDRESS_LENGTH: usize = 500;
pub const MAX_PROBLEM_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_NOTE_LENGTH: usize = 500;

lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[\d\s\-()]{10,}$").unwrap();
}

fn error_with(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

/// Convierte un error de campo en el error de la aplicación
pub fn field_error(field: &str, error: ValidationError) -> AppError {
    let message = error
        .message
        .map(|m| m.into_owned())
        .unwrap_or_else(|| error.code.to_string());
    AppError::Validation(format!("{}: {}", field, message))
}

/// Validar y convertir string a fecha/hora (RFC3339 o YYYY-MM-DD)
pub fn validate_datetime(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            let mut error = error_with(
                "datetime",
                format!("'{}' is not a valid RFC3339 timestamp or YYYY-MM-DD date", value),
            );
            error.add_param("value".into(), &value.to_string());
            error
        })
}

/// Parsea `startDate`/`endDate`. Una fecha `YYYY-MM-DD` como fin cubre el día completo.
pub fn parse_date_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, AppError> {
    let start_date = start
        .filter(|s| !s.trim().is_empty())
        .map(|s| validate_datetime(s.trim()).map_err(|e| field_error("startDate", e)))
        .transpose()?;

    let end_date = end
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let s = s.trim();
            validate_datetime(s)
                .map(|dt| {
                    if DateTime::parse_from_rfc3339(s).is_ok() {
                        dt
                    } else {
                        dt + Duration::days(1) - Duration::milliseconds(1)
                    }
                })
                .map_err(|e| field_error("endDate", e))
        })
        .transpose()?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(AppError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }
    }

    Ok(DateRange { start_date, end_date })
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error_with("not_empty", "must not be empty".to_string()));
    }
    Ok(())
}

/// Validar longitud máxima
pub fn validate_max_length(value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        let mut error = error_with("length", format!("cannot exceed {} characters", max));
        error.add_param("max".into(), &max);
        error.add_param("actual".into(), &len);
        return Err(error);
    }
    Ok(())
}

/// Validar formato de teléfono
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if !PHONE_REGEX.is_match(value) {
        let mut error = error_with("phone", "please enter a valid phone number".to_string());
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de email
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if !value.contains('@') || !value.contains('.') {
        let mut error = error_with("email", "please enter a valid email address".to_string());
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de coordenadas GPS
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&lat) {
        let mut error = error_with("latitude", "latitude must be between -90 and 90".to_string());
        error.add_param("value".into(), &lat);
        return Err(error);
    }

    if !(-180.0..=180.0).contains(&lng) {
        let mut error =
            error_with("longitude", "longitude must be between -180 and 180".to_string());
        error.add_param("value".into(), &lng);
        return Err(error);
    }

    Ok(())
}

/// Validar que un valor sea no negativo
pub fn validate_non_negative<T: PartialOrd + std::fmt::Display + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value < T::zero() {
        let mut error = error_with("non_negative", "cannot be negative".to_string());
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Validar que la fecha programada sea estrictamente futura
pub fn validate_in_future(
    value: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if value <= now {
        let mut error = error_with("future", "scheduled time must be in the future".to_string());
        error.add_param("value".into(), &value.to_rfc3339());
        return Err(error);
    }
    Ok(())
}

pub fn validate_location(location: &Location) -> Result<(), AppError> {
    validate_not_empty(&location.address).map_err(|e| field_error("location.address", e))?;
    validate_max_length(&location.address, MAX_ADDRESS_LENGTH)
        .map_err(|e| field_error("location.address", e))?;
    validate_not_empty(&location.city).map_err(|e| field_error("location.city", e))?;
    validate_not_empty(&location.state).map_err(|e| field_error("location.state", e))?;

    if let Some(coordinates) = location.coordinates {
        validate_coordinates(coordinates.lat, coordinates.lng)
            .map_err(|e| field_error("location.coordinates", e))?;
    }
    Ok(())
}

pub fn validate_contact_info(contact: &ContactInfo) -> Result<(), AppError> {
    validate_not_empty(&contact.phone).map_err(|e| field_error("contactInfo.phone", e))?;
    validate_phone(&contact.phone).map_err(|e| field_error("contactInfo.phone", e))?;

    if let Some(alternate) = contact.alternate_phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(alternate).map_err(|e| field_error("contactInfo.alternatePhone", e))?;
    }
    Ok(())
}

fn validate_problem_description(description: Option<&str>) -> Result<(), AppError> {
    if let Some(description) = description {
        validate_max_length(description, MAX_PROBLEM_DESCRIPTION_LENGTH)
            .map_err(|e| field_error("problemDescription", e))?;
    }
    Ok(())
}

/// Valida los campos de un booking nuevo antes de persistirlo
pub fn validate_new_booking(fields: &NewBooking, now: DateTime<Utc>) -> Result<(), AppError> {
    validate_in_future(fields.scheduled_at, now).map_err(|e| field_error("scheduledAt", e))?;
    validate_location(&fields.location)?;
    validate_contact_info(&fields.contact_info)?;
    validate_problem_description(fields.problem_description.as_deref())
}

/// Valida una edición parcial de un booking pendiente
pub fn validate_patch(patch: &BookingPatch, now: DateTime<Utc>) -> Result<(), AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation(
            "No valid fields to update. Allowed fields: scheduledAt, location, vehicleInfo, \
             contactInfo, problemDescription, urgencyLevel"
                .to_string(),
        ));
    }
    if let Some(scheduled_at) = patch.scheduled_at {
        validate_in_future(scheduled_at, now).map_err(|e| field_error("scheduledAt", e))?;
    }
    if let Some(location) = &patch.location {
        validate_location(location)?;
    }
    if let Some(contact) = &patch.contact_info {
        validate_contact_info(contact)?;
    }
    validate_problem_description(patch.problem_description.as_deref())
}

/// Valida y normaliza el mensaje de una nota
pub fn normalize_note_message(message: &str) -> Result<String, AppError> {
    let trimmed = message.trim();
    validate_not_empty(trimmed).map_err(|_| {
        AppError::Validation("Note message is required".to_string())
    })?;
    validate_max_length(trimmed, MAX_NOTE_LENGTH).map_err(|e| field_error("message", e))?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::fixtures::sample_fields;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_date_range() {
        let range = parse_date_range(Some("2025-03-01"), Some("2025-03-31")).unwrap();
        assert_eq!(
            range.start_date.unwrap().to_rfc3339(),
            "2025-03-01T00:00:00+00:00"
        );
        assert_eq!(
            range.end_date.unwrap().to_rfc3339(),
            "2025-03-31T23:59:59.999+00:00"
        );

        let open = parse_date_range(None, Some("")).unwrap();
        assert_eq!(open, DateRange::default());
    }

    #[test]
    fn test_parse_date_range_rejects_bad_input() {
        assert!(parse_date_range(Some("March"), None).is_err());
        let err = parse_date_range(Some("2025-04-01"), Some("2025-03-01")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validate_datetime() {
        assert!(validate_datetime("2025-03-01T10:00:00Z").is_ok());
        assert!(validate_datetime("2025-03-01").is_ok());
        assert!(validate_datetime("2025/03/01").is_err());
        assert!(validate_datetime("yesterday").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("(080) 2345-6789").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me maybe").is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(12.97, 77.59).is_ok());
        assert!(validate_coordinates(91.0, 77.59).is_err());
        assert!(validate_coordinates(12.97, -181.0).is_err());
    }

    #[test]
    fn test_validate_non_negative_decimal() {
        assert!(validate_non_negative(Decimal::ZERO).is_ok());
        assert!(validate_non_negative(Decimal::new(1500, 2)).is_ok());
        assert!(validate_non_negative(Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_new_booking_in_past_is_rejected() {
        let now = Utc::now();
        let fields = sample_fields(now - Duration::hours(1));
        let err = validate_new_booking(&fields, now).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("scheduledAt")));
    }

    #[test]
    fn test_new_booking_requires_location_parts() {
        let now = Utc::now();
        let mut fields = sample_fields(now + Duration::hours(1));
        fields.location.city = "  ".to_string();
        assert!(validate_new_booking(&fields, now).is_err());
    }

    #[test]
    fn test_normalize_note_message() {
        assert_eq!(normalize_note_message("  on my way  ").unwrap(), "on my way");
        assert!(normalize_note_message("   ").is_err());
        assert!(normalize_note_message(&"a".repeat(MAX_NOTE_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        assert!(validate_patch(&BookingPatch::default(), Utc::now()).is_err());
    }
}
