//! Servicio de autorización
//!
//! Tabla única de decisiones para `(identidad, operación, booking)`. Se
//! consulta antes de la máquina de estados; la primera regla que aplica decide.

use crate::models::booking::{Booking, BookingStatus};
use crate::models::user::{Identity, UserRole};
use crate::utils::errors::{forbidden_error, AppError};

/// Operaciones sobre bookings sujetas a autorización
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOperation {
    Create,
    View,
    EditFields,
    ChangeStatus(BookingStatus),
    AppendNote,
    ViewUnassigned,
    ViewStats,
}

impl BookingOperation {
    fn describe(&self) -> String {
        match self {
            BookingOperation::Create => "create booking".to_string(),
            BookingOperation::View => "view booking".to_string(),
            BookingOperation::EditFields => "edit booking".to_string(),
            BookingOperation::ChangeStatus(to) => format!("change booking status to {}", to),
            BookingOperation::AppendNote => "add note".to_string(),
            BookingOperation::ViewUnassigned => "view unassigned bookings".to_string(),
            BookingOperation::ViewStats => "view booking statistics".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationService;

impl AuthorizationService {
    pub fn new() -> Self {
        Self
    }

    /// Decide si la operación está permitida.
    ///
    /// `booking` es `None` solo para operaciones que no apuntan a un booking
    /// concreto (crear, cola sin asignar, estadísticas).
    pub fn authorize(
        &self,
        identity: &Identity,
        operation: BookingOperation,
        booking: Option<&Booking>,
    ) -> Result<(), AppError> {
        use BookingOperation::*;

        let owner = booking.map_or(false, |b| b.is_owned_by(identity.user_id));
        let assigned = booking.map_or(false, |b| b.is_assigned_to(identity.user_id));
        let deny = |reason: &str| Err(forbidden_error(&operation.describe(), reason));

        match (identity.role, operation) {
            (UserRole::Admin, _) => Ok(()),

            // Cualquier mecánico puede intentar aceptar; el store decide quién gana
            (UserRole::Mechanic, ChangeStatus(BookingStatus::Accepted)) => Ok(()),
            (UserRole::Mechanic, ChangeStatus(_)) => {
                if assigned {
                    Ok(())
                } else {
                    deny("you are not assigned to this booking")
                }
            }

            (UserRole::Customer, Create) => Ok(()),
            (UserRole::Customer, EditFields) => match booking {
                Some(b) if owner && b.status == BookingStatus::Pending => Ok(()),
                Some(_) if owner => deny("only pending bookings can be edited"),
                _ => deny("you do not own this booking"),
            },
            (UserRole::Customer, ChangeStatus(BookingStatus::Cancelled)) => {
                if owner {
                    Ok(())
                } else {
                    deny("you do not own this booking")
                }
            }

            (_, AppendNote) | (_, View) => {
                if owner || assigned {
                    Ok(())
                } else {
                    deny("you are not a participant of this booking")
                }
            }

            (UserRole::Mechanic, ViewUnassigned) => Ok(()),

            _ => deny("insufficient role"),
        }
    }

    /// Los clientes no pueden escribir notas internas: se degradan a públicas
    pub fn effective_internal_flag(&self, identity: &Identity, requested: bool) -> bool {
        requested && identity.role.is_staff()
    }

    /// Los clientes nunca ven notas internas
    pub fn can_see_internal_notes(&self, identity: &Identity) -> bool {
        identity.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::fixtures::pending_booking;
    use uuid::Uuid;

    fn gate() -> AuthorizationService {
        AuthorizationService::new()
    }

    #[test]
    fn test_admin_can_do_everything() {
        let admin = Identity::admin(Uuid::new_v4());
        let booking = pending_booking();
        for op in [
            BookingOperation::View,
            BookingOperation::EditFields,
            BookingOperation::ChangeStatus(BookingStatus::Cancelled),
            BookingOperation::AppendNote,
            BookingOperation::ViewStats,
        ] {
            assert!(gate().authorize(&admin, op, Some(&booking)).is_ok());
        }
    }

    #[test]
    fn test_customer_edit_requires_owner_and_pending() {
        let mut booking = pending_booking();
        let owner = Identity::customer(booking.customer_id);
        let stranger = Identity::customer(Uuid::new_v4());

        assert!(gate().authorize(&owner, BookingOperation::EditFields, Some(&booking)).is_ok());
        assert!(gate().authorize(&stranger, BookingOperation::EditFields, Some(&booking)).is_err());

        booking.status = BookingStatus::Accepted;
        let err = gate()
            .authorize(&owner, BookingOperation::EditFields, Some(&booking))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_unassigned_mechanic_cannot_progress_booking() {
        let mut booking = pending_booking();
        booking.status = BookingStatus::InProgress;
        booking.mechanic_id = Some(Uuid::new_v4());
        let other = Identity::mechanic(Uuid::new_v4());

        let err = gate()
            .authorize(
                &other,
                BookingOperation::ChangeStatus(BookingStatus::Completed),
                Some(&booking),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let assigned = Identity::mechanic(booking.mechanic_id.unwrap());
        assert!(gate()
            .authorize(
                &assigned,
                BookingOperation::ChangeStatus(BookingStatus::Completed),
                Some(&booking)
            )
            .is_ok());
    }

    #[test]
    fn test_any_mechanic_may_attempt_accept() {
        let booking = pending_booking();
        let mechanic = Identity::mechanic(Uuid::new_v4());
        assert!(gate()
            .authorize(
                &mechanic,
                BookingOperation::ChangeStatus(BookingStatus::Accepted),
                Some(&booking)
            )
            .is_ok());
    }

    #[test]
    fn test_customer_may_only_cancel_own_booking() {
        let booking = pending_booking();
        let owner = Identity::customer(booking.customer_id);
        let cancel = BookingOperation::ChangeStatus(BookingStatus::Cancelled);

        assert!(gate().authorize(&owner, cancel, Some(&booking)).is_ok());
        assert!(gate()
            .authorize(&Identity::customer(Uuid::new_v4()), cancel, Some(&booking))
            .is_err());
        assert!(gate()
            .authorize(
                &owner,
                BookingOperation::ChangeStatus(BookingStatus::Accepted),
                Some(&booking)
            )
            .is_err());
    }

    #[test]
    fn test_notes_and_views_require_participation() {
        let mut booking = pending_booking();
        let mechanic_id = Uuid::new_v4();
        booking.mechanic_id = Some(mechanic_id);

        for op in [BookingOperation::AppendNote, BookingOperation::View] {
            assert!(gate()
                .authorize(&Identity::customer(booking.customer_id), op, Some(&booking))
                .is_ok());
            assert!(gate()
                .authorize(&Identity::mechanic(mechanic_id), op, Some(&booking))
                .is_ok());
            assert!(gate()
                .authorize(&Identity::mechanic(Uuid::new_v4()), op, Some(&booking))
                .is_err());
        }
    }

    #[test]
    fn test_role_only_operations() {
        let mechanic = Identity::mechanic(Uuid::new_v4());
        let customer = Identity::customer(Uuid::new_v4());

        assert!(gate().authorize(&mechanic, BookingOperation::ViewUnassigned, None).is_ok());
        assert!(gate().authorize(&customer, BookingOperation::ViewUnassigned, None).is_err());
        assert!(gate().authorize(&mechanic, BookingOperation::ViewStats, None).is_err());
        assert!(gate().authorize(&mechanic, BookingOperation::Create, None).is_err());
        assert!(gate().authorize(&customer, BookingOperation::Create, None).is_ok());
    }

    #[test]
    fn test_internal_flag_downgraded_for_customers() {
        let customer = Identity::customer(Uuid::new_v4());
        let mechanic = Identity::mechanic(Uuid::new_v4());

        assert!(!gate().effective_internal_flag(&customer, true));
        assert!(gate().effective_internal_flag(&mechanic, true));
        assert!(!gate().effective_internal_flag(&mechanic, false));
    }
}
