use serde::Serialize;
use uuid::Uuid;

use crate::models::business::Business;
use crate::models::courier::{Courier, GeoPoint};
use crate::models::message::QuickMessage;
use crate::models::order::Order;

/// Change notification fanned out to every connected dashboard over the
/// WebSocket feed. Every registry mutation publishes the updated record so
/// clients can upsert-by-id instead of refetching whole collections.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    OrderChanged { order: Order },
    BusinessChanged { business: Business },
    CourierChanged { courier: Courier },
    MessageSent { message: QuickMessage },
    TrackingPosition { order_id: Uuid, position: GeoPoint },
}
