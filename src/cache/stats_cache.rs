//! Cache del informe de estadísticas
//!
//! El informe puede quedar desfasado hasta un TTL. Los fallos de Redis se
//! registran y el servicio vuelve a consultar el store.

use tracing::warn;

use super::redis_client::RedisClient;
use crate::models::booking::DateRange;
use crate::services::booking_stats_service::StatsReport;

#[derive(Clone)]
pub struct StatsCache {
    redis: RedisClient,
}

impl StatsCache {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    fn key(&self, range: &DateRange) -> String {
        self.redis.make_key("booking_stats", &range_identifier(range))
    }

    pub async fn get(&self, range: &DateRange) -> Option<StatsReport> {
        match self.redis.get(&self.key(range)).await {
            Ok(report) => report,
            Err(e) => {
                warn!("⚠️ Informe en cache ilegible: {}", e);
                None
            }
        }
    }

    pub async fn put(&self, range: &DateRange, report: &StatsReport) {
        let ttl = self.redis.default_ttl();
        if let Err(e) = self.redis.set(&self.key(range), report, ttl).await {
            warn!("⚠️ No se pudo cachear el informe: {}", e);
        }
    }
}

pub(crate) fn range_identifier(range: &DateRange) -> String {
    let bound = |value: Option<chrono::DateTime<chrono::Utc>>| {
        value.map_or_else(|| "open".to_string(), |v| v.timestamp_millis().to_string())
    };
    format!("{}:{}", bound(range.start_date), bound(range.end_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_range_identifier() {
        assert_eq!(range_identifier(&DateRange::default()), "open:open");

        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let range = DateRange {
            start_date: Some(start),
            end_date: None,
        };
        assert_eq!(range_identifier(&range), "1735689600000:open");
    }
}
