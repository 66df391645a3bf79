//! Estadísticas de bookings
//!
//! Agregación de solo lectura sobre el ledger: conteo, ingresos y rating
//! medio por estado, más un resumen general.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::StatsCache;
use crate::models::booking::{BookingStatus, DateRange};
use crate::models::user::Identity;
use crate::repositories::booking_repository::{BookingStore, StatusAggregate};
use crate::repositories::with_storage_timeout;
use crate::services::authorization_service::{AuthorizationService, BookingOperation};
use crate::utils::errors::AppResult;
use crate::utils::validation::parse_date_range;

const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStats {
    pub status: BookingStatus,
    pub count: i64,
    pub total_revenue: Decimal,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub completed_bookings: i64,
    pub recent_bookings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub overview: StatsOverview,
    pub status_breakdown: Vec<StatusStats>,
    pub date_range: DateRange,
    pub generated_at: DateTime<Utc>,
}

fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn count_of(aggregates: &[StatusAggregate], status: BookingStatus) -> i64 {
    aggregates
        .iter()
        .find(|a| a.status == status)
        .map_or(0, |a| a.count)
}

/// Arma el informe a partir de los agregados del rango y los de la ventana reciente
pub fn build_report(
    range: DateRange,
    aggregates: &[StatusAggregate],
    recent: &[StatusAggregate],
    generated_at: DateTime<Utc>,
) -> StatsReport {
    let status_breakdown = BookingStatus::ALL
        .iter()
        .filter_map(|status| aggregates.iter().find(|a| a.status == *status))
        .map(|a| StatusStats {
            status: a.status,
            count: a.count,
            total_revenue: a.total_revenue.round_dp(2),
            avg_rating: a.avg_rating.map(round_rating),
        })
        .collect();

    StatsReport {
        overview: StatsOverview {
            total_bookings: aggregates.iter().map(|a| a.count).sum(),
            pending_bookings: count_of(aggregates, BookingStatus::Pending),
            completed_bookings: count_of(aggregates, BookingStatus::Completed),
            recent_bookings: recent.iter().map(|a| a.count).sum(),
        },
        status_breakdown,
        date_range: range,
        generated_at,
    }
}

#[derive(Clone)]
pub struct BookingStatsService {
    bookings: Arc<dyn BookingStore>,
    cache: Option<StatsCache>,
    gate: AuthorizationService,
    timeout: std::time::Duration,
}

impl BookingStatsService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        cache: Option<StatsCache>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            bookings,
            cache,
            gate: AuthorizationService::new(),
            timeout,
        }
    }

    /// Informe para administradores; las fechas se validan antes de consultar
    pub async fn generate(
        &self,
        identity: &Identity,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> AppResult<StatsReport> {
        self.gate
            .authorize(identity, BookingOperation::ViewStats, None)?;
        let range = parse_date_range(start_date, end_date)?;

        if let Some(cache) = &self.cache {
            if let Some(report) = cache.get(&range).await {
                debug!("📊 Informe de estadísticas servido desde cache");
                return Ok(report);
            }
        }

        let now = Utc::now();
        let recent_start = now - Duration::days(RECENT_WINDOW_DAYS);
        let recent_range = DateRange {
            start_date: Some(range.start_date.map_or(recent_start, |s| s.max(recent_start))),
            end_date: range.end_date,
        };

        let aggregates = with_storage_timeout(
            self.timeout,
            "aggregate bookings",
            self.bookings.aggregate_by_status(&range),
        )
        .await?;
        let recent = with_storage_timeout(
            self.timeout,
            "aggregate recent bookings",
            self.bookings.aggregate_by_status(&recent_range),
        )
        .await?;

        let report = build_report(range, &aggregates, &recent, now);
        info!(
            "📊 Informe generado: {} bookings en {} estados",
            report.overview.total_bookings,
            report.status_breakdown.len()
        );

        if let Some(cache) = &self.cache {
            cache.put(&range, &report).await;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(status: BookingStatus, count: i64, revenue: Decimal, avg: Option<f64>) -> StatusAggregate {
        StatusAggregate {
            status,
            count,
            total_revenue: revenue,
            avg_rating: avg,
        }
    }

    #[test]
    fn test_build_report_rounds_and_orders() {
        let aggregates = vec![
            aggregate(BookingStatus::Completed, 3, Decimal::new(1234567, 4), Some(4.666)),
            aggregate(BookingStatus::Pending, 2, Decimal::ZERO, None),
        ];
        let recent = vec![aggregate(BookingStatus::Pending, 1, Decimal::ZERO, None)];

        let report = build_report(DateRange::default(), &aggregates, &recent, Utc::now());

        assert_eq!(report.overview.total_bookings, 5);
        assert_eq!(report.overview.pending_bookings, 2);
        assert_eq!(report.overview.completed_bookings, 3);
        assert_eq!(report.overview.recent_bookings, 1);

        assert_eq!(report.status_breakdown[0].status, BookingStatus::Pending);
        assert_eq!(report.status_breakdown[0].avg_rating, None);
        let completed = &report.status_breakdown[1];
        assert_eq!(completed.total_revenue, Decimal::new(12346, 2));
        assert_eq!(completed.avg_rating, Some(4.7));
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(DateRange::default(), &[], &[], Utc::now());
        assert_eq!(report.overview.total_bookings, 0);
        assert!(report.status_breakdown.is_empty());
    }
}
