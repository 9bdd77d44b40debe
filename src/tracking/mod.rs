pub mod interpolator;

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::courier::GeoPoint;
use crate::models::event::ChangeEvent;
use crate::models::order::OrderStatus;
use crate::state::AppState;

/// Cadence of the simulated position updates.
pub const TRACKING_TICK: Duration = Duration::from_secs(5);

/// Starts the tracking loop for an order that just entered `delivering` and
/// registers its abort handle so the task can be disposed deterministically.
pub fn spawn_tracking(state: Arc<AppState>, order_id: Uuid, tick: Duration) {
    let handle = tokio::spawn(run_tracking_loop(state.clone(), order_id, tick));
    if let Some(previous) = state.tracking_tasks.insert(order_id, handle.abort_handle()) {
        previous.abort();
    }
}

/// Aborts the tracking loop of an order that left `delivering`.
pub fn stop_tracking(state: &AppState, order_id: &Uuid) {
    if let Some((_, handle)) = state.tracking_tasks.remove(order_id) {
        handle.abort();
        debug!(order_id = %order_id, "tracking loop stopped");
    }
}

/// Moves the courier marker a fixed fraction of the remaining vector toward
/// the delivery address on every tick, until it arrives or the order leaves
/// `delivering`. The registry status is re-read each tick; the loop acts only
/// while its precondition still holds.
pub async fn run_tracking_loop(state: Arc<AppState>, order_id: Uuid, tick: Duration) {
    let Some(mut position) = initial_position(&state, &order_id) else {
        warn!(order_id = %order_id, "no starting location available, tracking not started");
        state.tracking_tasks.remove(&order_id);
        return;
    };

    let mut ticker = interval(tick);
    // the first interval tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let Some(order) = state.orders.get(&order_id).map(|entry| entry.value().clone()) else {
            break;
        };
        if order.status != OrderStatus::Delivering {
            break;
        }

        let target = order.delivery_address.coordinates.clone();
        let (next, arrived) = interpolator::step(&position, &target);
        position = next;

        if let Some(courier_id) = order.delivery_person_id {
            if let Some(mut courier) = state.couriers.get_mut(&courier_id) {
                courier.current_location = Some(position.clone());
                courier.updated_at = Utc::now();
            }
        }

        state.publish(ChangeEvent::TrackingPosition {
            order_id,
            position: position.clone(),
        });

        if arrived {
            debug!(order_id = %order_id, "courier marker reached the delivery address");
            break;
        }
    }

    state.tracking_tasks.remove(&order_id);
}

/// Courier's last reported position, falling back to the business location.
fn initial_position(state: &AppState, order_id: &Uuid) -> Option<GeoPoint> {
    let order = state.orders.get(order_id)?;

    let courier_location = order
        .value()
        .delivery_person_id
        .and_then(|id| state.couriers.get(&id))
        .and_then(|courier| courier.value().current_location.clone());

    courier_location.or_else(|| {
        state
            .businesses
            .get(&order.value().business_id)
            .map(|business| business.value().location.clone())
    })
}
