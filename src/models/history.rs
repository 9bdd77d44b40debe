use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::{Order, OrderItem};

/// Snapshot of a terminal order moved out of the live registry by the admin
/// purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedOrder {
    pub id: Uuid,
    pub order_id: Uuid,
    pub business_id: Uuid,
    pub client_id: Uuid,
    pub total_price: f64,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

impl ArchivedOrder {
    pub fn from_order(order: &Order, archived_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            business_id: order.business_id,
            client_id: order.client_id,
            total_price: order.total_price,
            items: order.items.clone(),
            created_at: order.created_at,
            archived_at,
        }
    }
}
