//! Store de bookings sobre PostgreSQL
//!
//! Sub-registros en columnas JSONB, timeline en columnas propias y notas en
//! `booking_notes`, ordenadas por su secuencia de inserción.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::booking_repository::{
    BookingFilter, BookingPage, BookingScope, BookingStore, ExpectedState, PageRequest,
    StatusAggregate,
};
use crate::models::booking::{
    Booking, BookingNote, BookingStatus, ContactInfo, DateRange, Location, Rating, Timeline,
    VehicleInfo,
};
use crate::utils::errors::{AppError, AppResult};

const BOOKING_COLUMNS: &str = r#"
    id, customer_id, service_id, mechanic_id, status, scheduled_at,
    location, vehicle_info, contact_info, problem_description, urgency_level,
    estimated_cost, actual_cost, created_at, accepted_at, started_at,
    completed_at, cancelled_at, rating_score, rating_feedback, rated_at,
    version, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    service_id: Uuid,
    mechanic_id: Option<Uuid>,
    status: String,
    scheduled_at: DateTime<Utc>,
    location: Json<Location>,
    vehicle_info: Json<VehicleInfo>,
    contact_info: Json<ContactInfo>,
    problem_description: Option<String>,
    urgency_level: String,
    estimated_cost: Decimal,
    actual_cost: Option<Decimal>,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    rating_score: Option<i16>,
    rating_feedback: Option<String>,
    rated_at: Option<DateTime<Utc>>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self, notes: Vec<BookingNote>) -> AppResult<Booking> {
        let status = self
            .status
            .parse()
            .map_err(|_| AppError::Internal(format!("Unknown stored status '{}'", self.status)))?;
        let urgency_level = self.urgency_level.parse().map_err(|_| {
            AppError::Internal(format!("Unknown stored urgency '{}'", self.urgency_level))
        })?;

        let rating = match (self.rating_score, self.rated_at) {
            (Some(score), Some(rated_at)) => Some(Rating {
                score,
                feedback: self.rating_feedback,
                rated_at,
            }),
            _ => None,
        };

        Ok(Booking {
            id: self.id,
            customer_id: self.customer_id,
            service_id: self.service_id,
            mechanic_id: self.mechanic_id,
            status,
            scheduled_at: self.scheduled_at,
            location: self.location.0,
            vehicle_info: self.vehicle_info.0,
            contact_info: self.contact_info.0,
            problem_description: self.problem_description,
            urgency_level,
            estimated_cost: self.estimated_cost,
            actual_cost: self.actual_cost,
            timeline: Timeline {
                created_at: self.created_at,
                accepted_at: self.accepted_at,
                started_at: self.started_at,
                completed_at: self.completed_at,
                cancelled_at: self.cancelled_at,
            },
            notes,
            rating,
            version: self.version,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    booking_id: Uuid,
    author_id: Uuid,
    message: String,
    is_internal: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct AggregateRow {
    status: String,
    count: i64,
    total_revenue: Decimal,
    avg_rating: Option<f64>,
}

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Carga las notas de varios bookings en una sola consulta
    async fn load_notes(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<BookingNote>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT booking_id, author_id, message, is_internal, created_at
            FROM booking_notes
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, seq
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut notes: HashMap<Uuid, Vec<BookingNote>> = HashMap::new();
        for row in rows {
            notes.entry(row.booking_id).or_default().push(BookingNote {
                author_id: row.author_id,
                message: row.message,
                timestamp: row.created_at,
                is_internal: row.is_internal,
            });
        }
        Ok(notes)
    }

    async fn hydrate(&self, rows: Vec<BookingRow>) -> AppResult<Vec<Booking>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut notes = self.load_notes(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let booking_notes = notes.remove(&row.id).unwrap_or_default();
                row.into_booking(booking_notes)
            })
            .collect()
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    builder.push(" WHERE TRUE");

    match filter.scope {
        BookingScope::All => {}
        BookingScope::Customer(id) => {
            builder.push(" AND customer_id = ").push_bind(id);
        }
        BookingScope::Mechanic(id) => {
            builder.push(" AND mechanic_id = ").push_bind(id);
        }
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(start) = filter.scheduled.start_date {
        builder.push(" AND scheduled_at >= ").push_bind(start);
    }
    if let Some(end) = filter.scheduled.end_date {
        builder.push(" AND scheduled_at <= ").push_bind(end);
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, customer_id, service_id, mechanic_id, status, scheduled_at,
                location, vehicle_info, contact_info, problem_description,
                urgency_level, urgency_rank, estimated_cost, actual_cost,
                created_at, version, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(booking.id)
        .bind(booking.customer_id)
        .bind(booking.service_id)
        .bind(booking.mechanic_id)
        .bind(booking.status.as_str())
        .bind(booking.scheduled_at)
        .bind(Json(&booking.location))
        .bind(Json(&booking.vehicle_info))
        .bind(Json(&booking.contact_info))
        .bind(&booking.problem_description)
        .bind(booking.urgency_level.as_str())
        .bind(booking.urgency_level.rank())
        .bind(booking.estimated_cost)
        .bind(booking.actual_cost)
        .bind(booking.timeline.created_at)
        .bind(booking.version)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn apply_transition(
        &self,
        expected: ExpectedState,
        updated: &Booking,
        note: Option<&BookingNote>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $4,
                mechanic_id = $5,
                actual_cost = $6,
                accepted_at = COALESCE(accepted_at, $7),
                started_at = COALESCE(started_at, $8),
                completed_at = COALESCE(completed_at, $9),
                cancelled_at = COALESCE(cancelled_at, $10),
                version = version + 1,
                updated_at = $11
            WHERE id = $1
              AND status = $2
              AND mechanic_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(updated.id)
        .bind(expected.status.as_str())
        .bind(expected.mechanic_id)
        .bind(updated.status.as_str())
        .bind(updated.mechanic_id)
        .bind(updated.actual_cost)
        .bind(updated.timeline.accepted_at)
        .bind(updated.timeline.started_at)
        .bind(updated.timeline.completed_at)
        .bind(updated.timeline.cancelled_at)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        // CAS perdido: el rollback ocurre al soltar la transacción
        if result.rows_affected() != 1 {
            return Ok(false);
        }

        if let Some(note) = note {
            sqlx::query(
                r#"
                INSERT INTO booking_notes (booking_id, author_id, message, is_internal, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(updated.id)
            .bind(note.author_id)
            .bind(&note.message)
            .bind(note.is_internal)
            .bind(note.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn update_fields(&self, updated: &Booking, expected_version: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET scheduled_at = $3,
                location = $4,
                vehicle_info = $5,
                contact_info = $6,
                problem_description = $7,
                urgency_level = $8,
                urgency_rank = $9,
                version = version + 1,
                updated_at = $10
            WHERE id = $1
              AND version = $2
              AND status = 'pending'
            "#,
        )
        .bind(updated.id)
        .bind(expected_version)
        .bind(updated.scheduled_at)
        .bind(Json(&updated.location))
        .bind(Json(&updated.vehicle_info))
        .bind(Json(&updated.contact_info))
        .bind(&updated.problem_description)
        .bind(updated.urgency_level.as_str())
        .bind(updated.urgency_level.rank())
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn append_note(&self, booking_id: Uuid, note: &BookingNote) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO booking_notes (booking_id, author_id, message, is_internal, created_at)
            SELECT $1, $2::uuid, $3::text, $4::boolean, $5::timestamptz
            WHERE EXISTS (SELECT 1 FROM bookings WHERE id = $1)
            "#,
        )
        .bind(booking_id)
        .bind(note.author_id)
        .bind(&note.message)
        .bind(note.is_internal)
        .bind(note.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> AppResult<BookingPage> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filter(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM bookings", BOOKING_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = select
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(BookingPage {
            bookings: self.hydrate(rows).await?,
            total: total.max(0) as u64,
        })
    }

    async fn list_unassigned(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {}
            FROM bookings
            WHERE status = 'pending'
              AND mechanic_id IS NULL
              AND scheduled_at > $1
            ORDER BY urgency_rank DESC, scheduled_at ASC
            LIMIT $2
            "#,
            BOOKING_COLUMNS
        ))
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn aggregate_by_status(&self, created: &DateRange) -> AppResult<Vec<StatusAggregate>> {
        let rows = sqlx::query_as::<_, AggregateRow>(
            r#"
            SELECT status,
                   COUNT(*) AS count,
                   COALESCE(SUM(actual_cost), 0) AS total_revenue,
                   AVG(rating_score)::float8 AS avg_rating
            FROM bookings
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
            GROUP BY status
            "#,
        )
        .bind(created.start_date)
        .bind(created.end_date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status: BookingStatus = row.status.parse().map_err(|_| {
                    AppError::Internal(format!("Unknown stored status '{}'", row.status))
                })?;
                Ok(StatusAggregate {
                    status,
                    count: row.count,
                    total_revenue: row.total_revenue,
                    avg_rating: row.avg_rating,
                })
            })
            .collect()
    }
}
