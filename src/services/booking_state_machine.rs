//! Máquina de estados del booking
//!
//! Única autoridad para cambiar `status` y para el efecto secundario de
//! asignar mecánico. Es pura: planifica el booking resultante y el store lo
//! escribe con un compare-and-set.
//!
//! ```text
//! pending      -> accepted, cancelled
//! accepted     -> in-progress, cancelled, no-show
//! in-progress  -> completed, cancelled
//! completed, cancelled, no-show -> (terminal)
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::user::{Identity, UserRole};
use crate::utils::errors::AppError;
use crate::utils::validation::{field_error, validate_non_negative};

/// Estados alcanzables desde `from`
pub fn allowed_targets(from: BookingStatus) -> &'static [BookingStatus] {
    use BookingStatus::*;

    match from {
        Pending => &[Accepted, Cancelled],
        Accepted => &[InProgress, Cancelled, NoShow],
        InProgress => &[Completed, Cancelled],
        Completed | Cancelled | NoShow => &[],
    }
}

pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Petición de cambio de estado
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub to: BookingStatus,
    pub actor: Identity,
    /// Mecánico que un administrador asigna al aceptar
    pub assign_mechanic: Option<Uuid>,
    /// Coste final, solo al completar
    pub actual_cost: Option<Decimal>,
}

impl TransitionRequest {
    pub fn new(to: BookingStatus, actor: Identity) -> Self {
        Self {
            to,
            actor,
            assign_mechanic: None,
            actual_cost: None,
        }
    }
}

/// Planifica la transición sin tocar `booking`.
///
/// Devuelve el booking tal como debe quedar: estado, asignación, hito del
/// timeline y coste aplicados juntos.
pub fn plan_transition(
    booking: &Booking,
    request: &TransitionRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let from = booking.status;
    let to = request.to;

    if !can_transition(from, to) {
        return Err(AppError::InvalidTransition { from, to });
    }

    if let Some(cost) = request.actual_cost {
        if to != BookingStatus::Completed {
            return Err(AppError::Validation(
                "actualCost can only be set when completing a booking".to_string(),
            ));
        }
        validate_non_negative(cost).map_err(|e| field_error("actualCost", e))?;
    }

    if request.assign_mechanic.is_some() && to != BookingStatus::Accepted {
        return Err(AppError::Validation(
            "mechanicId can only be set when accepting a booking".to_string(),
        ));
    }

    let mut updated = booking.clone();

    if to == BookingStatus::Accepted {
        let assignee = match request.actor.role {
            UserRole::Mechanic => Some(request.actor.user_id),
            UserRole::Admin => request.assign_mechanic,
            UserRole::Customer => None,
        };

        if let (Some(current), Some(assignee)) = (booking.mechanic_id, assignee) {
            if current != assignee {
                return Err(AppError::InvalidTransition { from, to });
            }
        }
        updated.mechanic_id = assignee.or(booking.mechanic_id);
    }

    if request.actual_cost.is_some() {
        updated.actual_cost = request.actual_cost;
    }
    updated.status = to;
    updated.timeline.stamp(to, now);
    updated.version = booking.version + 1;
    updated.updated_at = now;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::fixtures::pending_booking;

    fn advance(booking: &Booking, to: BookingStatus, actor: Identity) -> Booking {
        plan_transition(booking, &TransitionRequest::new(to, actor), Utc::now()).unwrap()
    }

    #[test]
    fn test_no_status_has_an_edge_to_itself() {
        for status in BookingStatus::ALL {
            assert!(!can_transition(status, status), "{} -> {}", status, status);
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        for status in BookingStatus::ALL {
            assert_eq!(status.is_terminal(), allowed_targets(status).is_empty());
        }
    }

    #[test]
    fn test_edge_table() {
        use BookingStatus::*;
        assert!(can_transition(Pending, Accepted));
        assert!(can_transition(Pending, Cancelled));
        assert!(!can_transition(Pending, InProgress));
        assert!(can_transition(Accepted, NoShow));
        assert!(!can_transition(Accepted, Completed));
        assert!(can_transition(InProgress, Completed));
        assert!(!can_transition(InProgress, NoShow));
        assert!(!can_transition(Completed, Cancelled));
    }

    #[test]
    fn test_invalid_edge_leaves_booking_untouched() {
        let booking = pending_booking();
        let snapshot = booking.clone();
        let admin = Identity::admin(Uuid::new_v4());

        for _ in 0..3 {
            let err = plan_transition(
                &booking,
                &TransitionRequest::new(BookingStatus::Completed, admin),
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidTransition {
                    from: BookingStatus::Pending,
                    to: BookingStatus::Completed
                }
            ));
        }
        assert_eq!(booking, snapshot);
    }

    #[test]
    fn test_mechanic_accept_assigns_self_and_stamps() {
        let booking = pending_booking();
        let mechanic = Identity::mechanic(Uuid::new_v4());

        let accepted = advance(&booking, BookingStatus::Accepted, mechanic);

        assert_eq!(accepted.status, BookingStatus::Accepted);
        assert_eq!(accepted.mechanic_id, Some(mechanic.user_id));
        assert!(accepted.timeline.accepted_at.is_some());
        assert_eq!(accepted.version, booking.version + 1);
    }

    #[test]
    fn test_accept_with_conflicting_assignment_is_rejected() {
        let mut booking = pending_booking();
        booking.mechanic_id = Some(Uuid::new_v4());

        let err = plan_transition(
            &booking,
            &TransitionRequest::new(BookingStatus::Accepted, Identity::mechanic(Uuid::new_v4())),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn test_admin_accept_can_name_mechanic() {
        let booking = pending_booking();
        let mechanic_id = Uuid::new_v4();
        let request = TransitionRequest {
            assign_mechanic: Some(mechanic_id),
            ..TransitionRequest::new(BookingStatus::Accepted, Identity::admin(Uuid::new_v4()))
        };

        let accepted = plan_transition(&booking, &request, Utc::now()).unwrap();
        assert_eq!(accepted.mechanic_id, Some(mechanic_id));
    }

    #[test]
    fn test_named_mechanic_only_on_accept() {
        let booking = pending_booking();
        let request = TransitionRequest {
            assign_mechanic: Some(Uuid::new_v4()),
            ..TransitionRequest::new(BookingStatus::Cancelled, Identity::admin(Uuid::new_v4()))
        };

        assert!(matches!(
            plan_transition(&booking, &request, Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_timeline_stamps_are_never_overwritten() {
        let booking = pending_booking();
        let mechanic = Identity::mechanic(Uuid::new_v4());
        let accepted = advance(&booking, BookingStatus::Accepted, mechanic);
        let accepted_at = accepted.timeline.accepted_at;

        let started = advance(&accepted, BookingStatus::InProgress, mechanic);
        let completed = advance(&started, BookingStatus::Completed, mechanic);

        assert_eq!(completed.timeline.accepted_at, accepted_at);
        assert!(completed.timeline.started_at.is_some());
        assert!(completed.timeline.completed_at.is_some());
        assert!(completed.timeline.cancelled_at.is_none());
    }

    #[test]
    fn test_actual_cost_only_on_completion() {
        let booking = pending_booking();
        let mechanic = Identity::mechanic(Uuid::new_v4());
        let request = TransitionRequest {
            actual_cost: Some(Decimal::new(1000, 2)),
            ..TransitionRequest::new(BookingStatus::Accepted, mechanic)
        };
        assert!(matches!(
            plan_transition(&booking, &request, Utc::now()),
            Err(AppError::Validation(_))
        ));

        let started = advance(
            &advance(&booking, BookingStatus::Accepted, mechanic),
            BookingStatus::InProgress,
            mechanic,
        );
        let negative = TransitionRequest {
            actual_cost: Some(Decimal::new(-5, 0)),
            ..TransitionRequest::new(BookingStatus::Completed, mechanic)
        };
        assert!(plan_transition(&started, &negative, Utc::now()).is_err());

        let completing = TransitionRequest {
            actual_cost: Some(Decimal::new(64950, 2)),
            ..TransitionRequest::new(BookingStatus::Completed, mechanic)
        };
        let completed = plan_transition(&started, &completing, Utc::now()).unwrap();
        assert_eq!(completed.actual_cost, Some(Decimal::new(64950, 2)));
    }

    #[test]
    fn test_no_show_has_no_timeline_stamp() {
        let mechanic = Identity::mechanic(Uuid::new_v4());
        let accepted = advance(&pending_booking(), BookingStatus::Accepted, mechanic);
        let no_show = advance(&accepted, BookingStatus::NoShow, mechanic);

        assert_eq!(no_show.status, BookingStatus::NoShow);
        assert_eq!(no_show.timeline.completed_at, None);
        assert_eq!(no_show.timeline.cancelled_at, None);
    }
}
