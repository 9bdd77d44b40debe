pub mod eta;
pub mod expiry;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

/// Seconds a pending order waits for a business response before the system
/// cancels it.
pub const PENDING_TIMEOUT_SECS: i64 = 180;

/// Courier share of an order's total, credited on delivery.
pub const COMMISSION_RATE: f64 = 0.15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{trigger} is not allowed while the order is {from:?}")]
    InvalidTransition {
        from: OrderStatus,
        trigger: &'static str,
    },

    #[error("order is already assigned to a courier")]
    AlreadyAssigned,

    #[error("order is not ready for pickup")]
    NotReady,

    #[error("order is in a terminal state")]
    TerminalState,
}

fn guard_not_terminal(order: &Order) -> Result<(), LifecycleError> {
    if order.status.is_terminal() {
        Err(LifecycleError::TerminalState)
    } else {
        Ok(())
    }
}

/// Business accepts a pending order.
pub fn accept(order: &mut Order, now: DateTime<Utc>) -> Result<(), LifecycleError> {
    respond(order, now, OrderStatus::Accepted, "accept")
}

/// Business rejects a pending order.
pub fn reject(order: &mut Order, now: DateTime<Utc>) -> Result<(), LifecycleError> {
    respond(order, now, OrderStatus::Cancelled, "reject")
}

fn respond(
    order: &mut Order,
    now: DateTime<Utc>,
    to: OrderStatus,
    trigger: &'static str,
) -> Result<(), LifecycleError> {
    guard_not_terminal(order)?;
    if order.status != OrderStatus::Pending {
        return Err(LifecycleError::InvalidTransition {
            from: order.status,
            trigger,
        });
    }

    // A response arriving after the countdown ran out applies the timeout
    // first; the order is cancelled and the response is rejected.
    if expiry::expire(order, now) {
        return Err(LifecycleError::TerminalState);
    }

    order.status = to;
    Ok(())
}

/// Stores the preparation time. Only legal while the order is accepted and no
/// preparation time has been captured yet; the value is immutable afterwards.
pub fn set_preparation_time(order: &mut Order, minutes: u32) -> Result<(), LifecycleError> {
    guard_not_terminal(order)?;
    if order.status != OrderStatus::Accepted
        || order.preparation_time.is_some()
        || minutes == 0
    {
        return Err(LifecycleError::InvalidTransition {
            from: order.status,
            trigger: "set_preparation_time",
        });
    }

    order.preparation_time = Some(minutes);
    Ok(())
}

/// Kitchen starts working on the order. Requires a captured preparation time.
pub fn start_preparing(order: &mut Order) -> Result<(), LifecycleError> {
    guard_not_terminal(order)?;
    if order.status != OrderStatus::Accepted || order.preparation_time.is_none() {
        return Err(LifecycleError::InvalidTransition {
            from: order.status,
            trigger: "start_preparing",
        });
    }

    order.status = OrderStatus::Preparing;
    Ok(())
}

/// Order is ready for pickup and enters the unassigned-ready pool.
pub fn mark_ready(order: &mut Order) -> Result<(), LifecycleError> {
    guard_not_terminal(order)?;
    if order.status != OrderStatus::Preparing {
        return Err(LifecycleError::InvalidTransition {
            from: order.status,
            trigger: "mark_ready",
        });
    }

    order.status = OrderStatus::Ready;
    Ok(())
}

/// Courier takes the order for delivery. First claim wins; the order leaves
/// the available pool.
pub fn claim(order: &mut Order, courier_id: Uuid) -> Result<(), LifecycleError> {
    guard_not_terminal(order)?;
    if order.delivery_person_id.is_some() {
        return Err(LifecycleError::AlreadyAssigned);
    }
    if order.status != OrderStatus::Ready {
        return Err(LifecycleError::NotReady);
    }

    order.status = OrderStatus::Delivering;
    order.delivery_person_id = Some(courier_id);
    Ok(())
}

/// Courier hands the order to the client. Returns the commission to credit.
pub fn complete(order: &mut Order) -> Result<f64, LifecycleError> {
    guard_not_terminal(order)?;
    if order.status != OrderStatus::Delivering || order.delivery_person_id.is_none() {
        return Err(LifecycleError::InvalidTransition {
            from: order.status,
            trigger: "complete",
        });
    }

    order.status = OrderStatus::Delivered;
    Ok(order.total_price * COMMISSION_RATE)
}

/// Manual cancellation from any non-terminal state. Distinct from the
/// pending-timeout path in [`expiry`].
pub fn cancel(order: &mut Order) -> Result<(), LifecycleError> {
    guard_not_terminal(order)?;
    order.status = OrderStatus::Cancelled;
    Ok(())
}

/// Records the client's stars for business and courier. Only delivered orders
/// can be rated, at most once.
pub fn rate(
    order: &mut Order,
    client_rating: Option<u8>,
    delivery_rating: Option<u8>,
) -> Result<(), LifecycleError> {
    if order.status != OrderStatus::Delivered
        || order.client_rating.is_some()
        || order.delivery_rating.is_some()
    {
        return Err(LifecycleError::InvalidTransition {
            from: order.status,
            trigger: "rate",
        });
    }

    order.client_rating = client_rating;
    order.delivery_rating = delivery_rating;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::courier::GeoPoint;
    use crate::models::order::{DeliveryAddress, Order, OrderItem, OrderStatus};

    fn order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::from_u128(1),
            status,
            client_id: Uuid::from_u128(2),
            business_id: Uuid::from_u128(3),
            delivery_person_id: None,
            items: vec![OrderItem {
                name: "Torta de milanesa".to_string(),
                price: 80.0,
                quantity: 1,
            }],
            total_price: 100.0,
            delivery_address: DeliveryAddress {
                full_address: "Av. Reforma 222".to_string(),
                coordinates: GeoPoint {
                    lat: 19.4326,
                    lng: -99.1332,
                },
            },
            special_notes: None,
            preparation_time: None,
            client_rating: None,
            delivery_rating: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn happy_path_walks_the_full_graph() {
        let now = Utc::now();
        let mut o = order(OrderStatus::Pending);
        let courier = Uuid::from_u128(9);

        accept(&mut o, now).unwrap();
        assert_eq!(o.status, OrderStatus::Accepted);

        set_preparation_time(&mut o, 20).unwrap();
        assert_eq!(o.preparation_time, Some(20));

        start_preparing(&mut o).unwrap();
        assert_eq!(o.status, OrderStatus::Preparing);

        mark_ready(&mut o).unwrap();
        assert_eq!(o.status, OrderStatus::Ready);

        claim(&mut o, courier).unwrap();
        assert_eq!(o.status, OrderStatus::Delivering);
        assert_eq!(o.delivery_person_id, Some(courier));

        let commission = complete(&mut o).unwrap();
        assert_eq!(o.status, OrderStatus::Delivered);
        assert!((commission - 15.0).abs() < 1e-9);
    }

    #[test]
    fn reject_cancels_a_pending_order() {
        let mut o = order(OrderStatus::Pending);
        reject(&mut o, Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::Cancelled);
    }

    #[test]
    fn accept_requires_pending() {
        for status in [
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivering,
        ] {
            let mut o = order(status);
            let err = accept(&mut o, Utc::now()).unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
            assert_eq!(o.status, status, "failed transition must not change state");
        }
    }

    #[test]
    fn accept_after_expiry_cancels_instead() {
        let mut o = order(OrderStatus::Pending);
        o.created_at = Utc::now() - Duration::seconds(181);

        let err = accept(&mut o, Utc::now()).unwrap_err();
        assert_eq!(err, LifecycleError::TerminalState);
        assert_eq!(o.status, OrderStatus::Cancelled);
    }

    #[test]
    fn preparation_time_is_set_once() {
        let mut o = order(OrderStatus::Accepted);
        set_preparation_time(&mut o, 15).unwrap();

        let err = set_preparation_time(&mut o, 25).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(o.preparation_time, Some(15));
    }

    #[test]
    fn preparation_time_must_be_positive() {
        let mut o = order(OrderStatus::Accepted);
        assert!(set_preparation_time(&mut o, 0).is_err());
        assert_eq!(o.preparation_time, None);
    }

    #[test]
    fn start_preparing_needs_a_preparation_time() {
        let mut o = order(OrderStatus::Accepted);
        let err = start_preparing(&mut o).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(o.status, OrderStatus::Accepted);
    }

    #[test]
    fn claim_rejects_non_ready_orders() {
        let mut o = order(OrderStatus::Preparing);
        assert_eq!(
            claim(&mut o, Uuid::from_u128(9)).unwrap_err(),
            LifecycleError::NotReady
        );
        assert_eq!(o.delivery_person_id, None);
    }

    #[test]
    fn second_claim_loses() {
        let mut o = order(OrderStatus::Ready);
        let first = Uuid::from_u128(7);
        let second = Uuid::from_u128(8);

        claim(&mut o, first).unwrap();
        assert_eq!(
            claim(&mut o, second).unwrap_err(),
            LifecycleError::AlreadyAssigned
        );
        assert_eq!(o.delivery_person_id, Some(first));
    }

    #[test]
    fn complete_requires_delivering() {
        let mut o = order(OrderStatus::Ready);
        let err = complete(&mut o).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(o.status, OrderStatus::Ready);
    }

    #[test]
    fn manual_cancel_overrides_any_live_state() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivering,
        ] {
            let mut o = order(status);
            cancel(&mut o).unwrap();
            assert_eq!(o.status, OrderStatus::Cancelled);
        }
    }

    #[test]
    fn terminal_orders_reject_every_trigger() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let now = Utc::now();
            let mut o = order(status);
            assert_eq!(accept(&mut o, now).unwrap_err(), LifecycleError::TerminalState);
            assert_eq!(reject(&mut o, now).unwrap_err(), LifecycleError::TerminalState);
            assert_eq!(
                set_preparation_time(&mut o, 10).unwrap_err(),
                LifecycleError::TerminalState
            );
            assert_eq!(start_preparing(&mut o).unwrap_err(), LifecycleError::TerminalState);
            assert_eq!(mark_ready(&mut o).unwrap_err(), LifecycleError::TerminalState);
            assert_eq!(
                claim(&mut o, Uuid::from_u128(9)).unwrap_err(),
                LifecycleError::TerminalState
            );
            assert_eq!(complete(&mut o).unwrap_err(), LifecycleError::TerminalState);
            assert_eq!(cancel(&mut o).unwrap_err(), LifecycleError::TerminalState);
            assert_eq!(o.status, status);
        }
    }

    #[test]
    fn rating_only_after_delivery_and_only_once() {
        let mut o = order(OrderStatus::Delivering);
        assert!(rate(&mut o, Some(5), Some(4)).is_err());

        o.status = OrderStatus::Delivered;
        rate(&mut o, Some(5), Some(4)).unwrap();
        assert_eq!(o.client_rating, Some(5));
        assert_eq!(o.delivery_rating, Some(4));

        let err = rate(&mut o, Some(1), Some(1)).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(o.client_rating, Some(5));
    }

    #[test]
    fn commission_is_fifteen_percent() {
        let mut o = order(OrderStatus::Ready);
        o.total_price = 240.0;
        claim(&mut o, Uuid::from_u128(9)).unwrap();
        let commission = complete(&mut o).unwrap();
        assert!((commission - 36.0).abs() < 1e-9);
    }
}
