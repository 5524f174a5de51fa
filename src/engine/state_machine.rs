use crate::error::AppError;
use crate::models::order::OrderStatus;

/// Legal status transitions.
///
/// `ready` and `driver_assigned` are mutually reachable: depending on how
/// fast a driver is found, an order can be assigned before the restaurant
/// marks it ready or after. Every non-terminal state can be cancelled.
pub fn is_legal(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    if to == Cancelled {
        return !from.is_terminal();
    }

    matches!(
        (from, to),
        (Pending, Accepted)
            | (Pending, Rejected)
            | (Accepted, Ready)
            | (Accepted, DriverAssigned)
            | (Ready, DriverAssigned)
            | (Ready, PickedUp)
            | (DriverAssigned, Ready)
            | (DriverAssigned, PickedUp)
            | (PickedUp, Delivered)
    )
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if is_legal(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_transition, is_legal};
    use crate::error::AppError;
    use crate::models::order::OrderStatus;

    const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Ready,
        OrderStatus::DriverAssigned,
        OrderStatus::PickedUp,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    #[test]
    fn happy_path_assign_before_ready() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::DriverAssigned,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
        ];
        for window in path.windows(2) {
            assert!(is_legal(window[0], window[1]), "{} -> {}", window[0], window[1]);
        }
    }

    #[test]
    fn happy_path_ready_before_assign() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Ready,
            OrderStatus::DriverAssigned,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
        ];
        for window in path.windows(2) {
            assert!(is_legal(window[0], window[1]), "{} -> {}", window[0], window[1]);
        }
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for from in [
            OrderStatus::Rejected,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            for to in ALL {
                let result = ensure_transition(from, to);
                assert!(
                    matches!(result, Err(AppError::InvalidTransition { .. })),
                    "{from} -> {to} should be illegal"
                );
            }
        }
    }

    #[test]
    fn every_live_state_can_cancel() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Ready,
            OrderStatus::DriverAssigned,
            OrderStatus::PickedUp,
        ] {
            assert!(is_legal(from, OrderStatus::Cancelled));
        }
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!is_legal(OrderStatus::Pending, OrderStatus::Ready));
        assert!(!is_legal(OrderStatus::Pending, OrderStatus::Delivered));
        assert!(!is_legal(OrderStatus::Accepted, OrderStatus::PickedUp));
        assert!(!is_legal(OrderStatus::Ready, OrderStatus::Delivered));
    }

    #[test]
    fn backwards_transitions_are_illegal() {
        assert!(!is_legal(OrderStatus::Accepted, OrderStatus::Pending));
        assert!(!is_legal(OrderStatus::PickedUp, OrderStatus::Ready));
        assert!(!is_legal(OrderStatus::PickedUp, OrderStatus::DriverAssigned));
    }
}
