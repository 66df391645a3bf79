//! Modelo de Service (catálogo)
//!
//! Una entrada del catálogo que un booking referencia al crearse.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogService {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CatalogService {
    /// Duración legible: "45 mins", "1 hour", "2 hours", "1h 30m"
    pub fn duration_display(&self) -> String {
        let hours = self.duration_minutes / 60;
        let minutes = self.duration_minutes % 60;

        match (hours, minutes) {
            (0, m) => format!("{} mins", m),
            (1, 0) => "1 hour".to_string(),
            (h, 0) => format!("{} hours", h),
            (h, m) => format!("{}h {}m", h, m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(duration_minutes: i32) -> CatalogService {
        CatalogService {
            id: Uuid::new_v4(),
            title: "Battery jump start".to_string(),
            category: "roadside-assistance".to_string(),
            price: Decimal::new(29900, 2),
            duration_minutes,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(service(45).duration_display(), "45 mins");
        assert_eq!(service(60).duration_display(), "1 hour");
        assert_eq!(service(120).duration_display(), "2 hours");
        assert_eq!(service(90).duration_display(), "1h 30m");
    }
}
