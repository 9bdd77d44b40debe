use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::time::{interval, Duration};
use tracing::{debug, info};
use uuid::Uuid;

use crate::lifecycle::PENDING_TIMEOUT_SECS;
use crate::models::event::ChangeEvent;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Seconds left on the pending countdown, measured from `created_at` so a
/// reconnecting observer computes the same deadline.
pub fn remaining_seconds(order: &Order, now: DateTime<Utc>) -> i64 {
    PENDING_TIMEOUT_SECS - (now - order.created_at).num_seconds()
}

/// Applies the pending timeout. Returns true only when this call performed
/// the cancellation; a non-pending or not-yet-due order is left untouched,
/// so re-applying the check is a no-op.
pub fn expire(order: &mut Order, now: DateTime<Utc>) -> bool {
    if order.status != OrderStatus::Pending || remaining_seconds(order, now) > 0 {
        return false;
    }

    order.status = OrderStatus::Cancelled;
    true
}

/// One pass over the registry. Overdue ids are collected first, then each is
/// re-checked under its entry lock, so concurrent sweeps never double-cancel.
pub fn sweep(state: &AppState, now: DateTime<Utc>) -> usize {
    let overdue: Vec<Uuid> = state
        .orders
        .iter()
        .filter(|entry| {
            entry.value().status == OrderStatus::Pending
                && remaining_seconds(entry.value(), now) <= 0
        })
        .map(|entry| *entry.key())
        .collect();

    let mut cancelled = 0;
    for id in overdue {
        let updated = {
            let Some(mut entry) = state.orders.get_mut(&id) else {
                continue;
            };
            if !expire(entry.value_mut(), now) {
                continue;
            }
            entry.value().clone()
        };

        cancelled += 1;
        state
            .metrics
            .transitions_total
            .with_label_values(&["auto_cancel", "success"])
            .inc();
        info!(order_id = %updated.id, "pending order expired without a business response");
        state.publish(ChangeEvent::OrderChanged { order: updated });
    }

    if cancelled > 0 {
        state.refresh_pending_gauge();
    }
    cancelled
}

/// Service-side countdown enforcement: cancels overdue pending orders even
/// when no dashboard is watching them.
pub async fn run_expiry_watchdog(state: Arc<AppState>, period: Duration) {
    info!("expiry watchdog started");

    let mut ticker = interval(period);
    loop {
        ticker.tick().await;

        let start = Instant::now();
        let cancelled = sweep(&state, Utc::now());
        state
            .metrics
            .expiry_sweep_seconds
            .observe(start.elapsed().as_secs_f64());

        if cancelled > 0 {
            debug!(cancelled, "auto-cancel sweep finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{expire, remaining_seconds, sweep};
    use crate::models::courier::GeoPoint;
    use crate::models::order::{DeliveryAddress, Order, OrderItem, OrderStatus};
    use crate::state::AppState;

    fn pending_order(age_secs: i64) -> Order {
        Order {
            id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            client_id: Uuid::from_u128(1),
            business_id: Uuid::from_u128(2),
            delivery_person_id: None,
            items: vec![OrderItem {
                name: "Pozole".to_string(),
                price: 90.0,
                quantity: 1,
            }],
            total_price: 90.0,
            delivery_address: DeliveryAddress {
                full_address: "Calle 10 #5".to_string(),
                coordinates: GeoPoint {
                    lat: 19.0,
                    lng: -99.0,
                },
            },
            special_notes: None,
            preparation_time: None,
            client_rating: None,
            delivery_rating: None,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn countdown_runs_from_created_at() {
        let now = Utc::now();
        let mut order = pending_order(0);
        order.created_at = now - Duration::seconds(179);
        assert_eq!(remaining_seconds(&order, now), 1);

        order.created_at = now - Duration::seconds(181);
        assert_eq!(remaining_seconds(&order, now), -1);
    }

    #[test]
    fn fresh_order_is_not_expired() {
        let mut order = pending_order(10);
        assert!(!expire(&mut order, Utc::now()));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn overdue_order_is_cancelled_exactly_once() {
        let mut order = pending_order(200);
        let now = Utc::now();

        assert!(expire(&mut order, now));
        assert_eq!(order.status, OrderStatus::Cancelled);

        // second observation is a no-op
        assert!(!expire(&mut order, now));
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn expiry_at_the_exact_deadline() {
        let now = Utc::now();
        let mut order = pending_order(0);
        order.created_at = now - Duration::seconds(180);
        assert!(expire(&mut order, now));
    }

    #[test]
    fn non_pending_orders_never_expire() {
        for status in [
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
        ] {
            let mut order = pending_order(400);
            order.status = status;
            assert!(!expire(&mut order, Utc::now()));
            assert_eq!(order.status, status);
        }
    }

    #[test]
    fn sweep_cancels_only_overdue_pending_orders() {
        let state = AppState::new(16);
        let now = Utc::now();

        let overdue = pending_order(200);
        let fresh = pending_order(10);
        let mut accepted = pending_order(300);
        accepted.status = OrderStatus::Accepted;

        let overdue_id = overdue.id;
        let fresh_id = fresh.id;
        let accepted_id = accepted.id;
        state.orders.insert(overdue.id, overdue);
        state.orders.insert(fresh.id, fresh);
        state.orders.insert(accepted.id, accepted);

        assert_eq!(sweep(&state, now), 1);
        assert_eq!(
            state.orders.get(&overdue_id).unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(
            state.orders.get(&fresh_id).unwrap().status,
            OrderStatus::Pending
        );
        assert_eq!(
            state.orders.get(&accepted_id).unwrap().status,
            OrderStatus::Accepted
        );

        // re-running the sweep finds nothing to do
        assert_eq!(sweep(&state, now), 0);
    }
}
