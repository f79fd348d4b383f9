//! Booking status guards.
//!
//! ```text
//! create ──► Pending ──assign──► Confirmed ──update_status──► Completed
//!               │                    │
//!               └──────cancel────────┴──────► Cancelled
//! ```

use crate::model::{Booking, BookingStatus};

use super::EngineError;

/// Only Pending bookings take a lineup.
pub(crate) fn check_assignable(booking: &Booking) -> Result<(), EngineError> {
    match booking.status {
        BookingStatus::Pending => Ok(()),
        BookingStatus::Confirmed => Err(EngineError::AlreadyAssigned(booking.id)),
        from => Err(EngineError::IllegalTransition {
            id: booking.id,
            from,
            to: BookingStatus::Confirmed,
        }),
    }
}

pub(crate) fn check_cancellable(booking: &Booking) -> Result<(), EngineError> {
    match booking.status {
        BookingStatus::Completed => Err(EngineError::AlreadyCompleted(booking.id)),
        BookingStatus::Cancelled => Err(EngineError::AlreadyCancelled(booking.id)),
        BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
    }
}

/// Direct status updates only cover Confirmed → Completed. Confirmation goes
/// through assignment and cancellation through `cancel_booking`.
pub(crate) fn check_status_update(booking: &Booking, to: BookingStatus) -> Result<(), EngineError> {
    match (booking.status, to) {
        (BookingStatus::Confirmed, BookingStatus::Completed) => Ok(()),
        (from, to) => Err(EngineError::IllegalTransition {
            id: booking.id,
            from,
            to,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, Span};
    use ulid::Ulid;

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: Ulid::new(),
            band_id: Ulid::new(),
            client_id: Ulid::new(),
            span: Span::new(0, 1),
            location: Location {
                city: "Memphis".into(),
                state: "TN".into(),
            },
            lineup: Vec::new(),
            status,
        }
    }

    #[test]
    fn assign_only_from_pending() {
        assert!(check_assignable(&booking(BookingStatus::Pending)).is_ok());
        assert!(matches!(
            check_assignable(&booking(BookingStatus::Confirmed)),
            Err(EngineError::AlreadyAssigned(_))
        ));
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(matches!(
                check_assignable(&booking(status)),
                Err(EngineError::IllegalTransition { to: BookingStatus::Confirmed, .. })
            ));
        }
    }

    #[test]
    fn cancel_rules() {
        assert!(check_cancellable(&booking(BookingStatus::Pending)).is_ok());
        assert!(check_cancellable(&booking(BookingStatus::Confirmed)).is_ok());
        assert!(matches!(
            check_cancellable(&booking(BookingStatus::Completed)),
            Err(EngineError::AlreadyCompleted(_))
        ));
        assert!(matches!(
            check_cancellable(&booking(BookingStatus::Cancelled)),
            Err(EngineError::AlreadyCancelled(_))
        ));
    }

    #[test]
    fn status_update_matrix() {
        let all = [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ];
        for from in all {
            for to in all {
                let allowed = check_status_update(&booking(from), to).is_ok();
                let expected = from == BookingStatus::Confirmed && to == BookingStatus::Completed;
                assert_eq!(allowed, expected, "{from} -> {to}");
            }
        }
    }
}
