//! Store de bookings en memoria
//!
//! Cada comprobación y escritura ocurre bajo un único guard del mutex,
//! así que las transiciones concurrentes se serializan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::booking_repository::{
    BookingFilter, BookingPage, BookingStore, ExpectedState, PageRequest, StatusAggregate,
};
use crate::models::booking::{Booking, BookingNote, BookingStatus, DateRange, Timeline};
use crate::utils::errors::{AppError, AppResult};

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> AppResult<()> {
        let mut bookings = self.bookings.lock().await;
        if bookings.contains_key(&booking.id) {
            return Err(AppError::Conflict(format!(
                "Booking with id '{}' already exists",
                booking.id
            )));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.bookings.lock().await.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        expected: ExpectedState,
        updated: &Booking,
        note: Option<&BookingNote>,
    ) -> AppResult<bool> {
        let mut bookings = self.bookings.lock().await;
        let Some(current) = bookings.get_mut(&updated.id) else {
            return Ok(false);
        };

        if ExpectedState::from(&*current) != expected {
            return Ok(false);
        }

        current.status = updated.status;
        current.mechanic_id = updated.mechanic_id;
        current.actual_cost = updated.actual_cost;
        for status in BookingStatus::ALL {
            if let Some(at) = stamp_of(&updated.timeline, status) {
                current.timeline.stamp(status, at);
            }
        }
        if let Some(note) = note {
            current.notes.push(note.clone());
        }
        current.version += 1;
        current.updated_at = updated.updated_at;
        Ok(true)
    }

    async fn update_fields(&self, updated: &Booking, expected_version: i64) -> AppResult<bool> {
        let mut bookings = self.bookings.lock().await;
        let Some(current) = bookings.get_mut(&updated.id) else {
            return Ok(false);
        };

        if current.status != BookingStatus::Pending || current.version != expected_version {
            return Ok(false);
        }

        current.scheduled_at = updated.scheduled_at;
        current.location = updated.location.clone();
        current.vehicle_info = updated.vehicle_info.clone();
        current.contact_info = updated.contact_info.clone();
        current.problem_description = updated.problem_description.clone();
        current.urgency_level = updated.urgency_level;
        current.version += 1;
        current.updated_at = updated.updated_at;
        Ok(true)
    }

    async fn append_note(&self, booking_id: Uuid, note: &BookingNote) -> AppResult<bool> {
        let mut bookings = self.bookings.lock().await;
        match bookings.get_mut(&booking_id) {
            Some(booking) => {
                booking.notes.push(note.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, filter: &BookingFilter, page: PageRequest) -> AppResult<BookingPage> {
        let bookings = self.bookings.lock().await;
        let mut matching: Vec<&Booking> = bookings.values().filter(|b| filter.matches(b)).collect();
        matching.sort_by(|a, b| {
            b.timeline
                .created_at
                .cmp(&a.timeline.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let bookings = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(BookingPage { bookings, total })
    }

    async fn list_unassigned(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Booking>> {
        let bookings = self.bookings.lock().await;
        let mut queue: Vec<&Booking> = bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Pending && b.mechanic_id.is_none() && b.scheduled_at > now
            })
            .collect();
        queue.sort_by(|a, b| {
            b.urgency_level
                .cmp(&a.urgency_level)
                .then_with(|| a.scheduled_at.cmp(&b.scheduled_at))
        });

        Ok(queue.into_iter().take(limit as usize).cloned().collect())
    }

    async fn aggregate_by_status(&self, created: &DateRange) -> AppResult<Vec<StatusAggregate>> {
        let bookings = self.bookings.lock().await;
        let mut aggregates = Vec::new();

        for status in BookingStatus::ALL {
            let group: Vec<&Booking> = bookings
                .values()
                .filter(|b| b.status == status && created.contains(b.timeline.created_at))
                .collect();
            if group.is_empty() {
                continue;
            }

            let total_revenue = group
                .iter()
                .filter_map(|b| b.actual_cost)
                .fold(Decimal::ZERO, |acc, cost| acc + cost);
            let scores: Vec<f64> = group
                .iter()
                .filter_map(|b| b.rating.as_ref().map(|r| f64::from(r.score)))
                .collect();
            let avg_rating = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };

            aggregates.push(StatusAggregate {
                status,
                count: group.len() as i64,
                total_revenue,
                avg_rating,
            });
        }

        Ok(aggregates)
    }
}

fn stamp_of(timeline: &Timeline, status: BookingStatus) -> Option<DateTime<Utc>> {
    match status {
        BookingStatus::Accepted => timeline.accepted_at,
        BookingStatus::InProgress => timeline.started_at,
        BookingStatus::Completed => timeline.completed_at,
        BookingStatus::Cancelled => timeline.cancelled_at,
        BookingStatus::Pending | BookingStatus::NoShow => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::fixtures::pending_booking;
    use crate::models::booking::UrgencyLevel;
    use chrono::Duration;

    #[tokio::test]
    async fn test_transition_is_rejected_when_state_moved() {
        let store = InMemoryBookingStore::new();
        let booking = pending_booking();
        store.insert(&booking).await.unwrap();
        let observed = ExpectedState::from(&booking);

        let mut first = booking.clone();
        first.status = BookingStatus::Accepted;
        first.mechanic_id = Some(Uuid::new_v4());
        assert!(store.apply_transition(observed, &first, None).await.unwrap());

        let mut second = booking.clone();
        second.status = BookingStatus::Accepted;
        second.mechanic_id = Some(Uuid::new_v4());
        let note = BookingNote {
            author_id: Uuid::new_v4(),
            message: "On my way".to_string(),
            timestamp: Utc::now(),
            is_internal: false,
        };
        assert!(!store.apply_transition(observed, &second, Some(&note)).await.unwrap());

        let stored = store.find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.mechanic_id, first.mechanic_id);
        assert_eq!(stored.version, booking.version + 1);
        assert!(stored.notes.is_empty());
    }

    #[tokio::test]
    async fn test_transition_note_is_written_with_the_status() {
        let store = InMemoryBookingStore::new();
        let booking = pending_booking();
        store.insert(&booking).await.unwrap();

        let mut accepted = booking.clone();
        accepted.status = BookingStatus::Accepted;
        accepted.mechanic_id = Some(Uuid::new_v4());
        let note = BookingNote {
            author_id: accepted.mechanic_id.unwrap(),
            message: "Arriving in 20 minutes".to_string(),
            timestamp: Utc::now(),
            is_internal: false,
        };
        let applied = store
            .apply_transition(ExpectedState::from(&booking), &accepted, Some(&note))
            .await
            .unwrap();
        assert!(applied);

        let stored = store.find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Accepted);
        assert_eq!(stored.notes, vec![note]);
    }

    #[tokio::test]
    async fn test_unassigned_queue_excludes_bookings_scheduled_now() {
        let store = InMemoryBookingStore::new();
        let now = Utc::now();
        let mut due_now = pending_booking();
        due_now.scheduled_at = now;
        let mut later = pending_booking();
        later.scheduled_at = now + Duration::hours(1);
        store.insert(&due_now).await.unwrap();
        store.insert(&later).await.unwrap();

        let queue = store.list_unassigned(now, 10).await.unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![later.id]);
    }

    #[tokio::test]
    async fn test_update_fields_checks_version() {
        let store = InMemoryBookingStore::new();
        let booking = pending_booking();
        store.insert(&booking).await.unwrap();

        let mut edited = booking.clone();
        edited.urgency_level = UrgencyLevel::High;
        assert!(store.update_fields(&edited, booking.version).await.unwrap());
        assert!(!store.update_fields(&edited, booking.version).await.unwrap());
    }

    #[tokio::test]
    async fn test_unassigned_queue_skips_past_and_assigned() {
        let store = InMemoryBookingStore::new();
        let now = Utc::now();

        let mut past = pending_booking();
        past.scheduled_at = now - Duration::hours(1);
        let mut assigned = pending_booking();
        assigned.mechanic_id = Some(Uuid::new_v4());
        let open = pending_booking();

        for booking in [&past, &assigned, &open] {
            store.insert(booking).await.unwrap();
        }

        let queue = store.list_unassigned(now, 20).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, open.id);
    }
}
