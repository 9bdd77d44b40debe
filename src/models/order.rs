use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

/// Lifecycle states of an order. Statuses only move forward along the
/// transition graph in [`crate::lifecycle`]; `delivered` and `cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    Ready,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub full_address: String,
    pub coordinates: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub client_id: Uuid,
    pub business_id: Uuid,
    /// Set exactly when the order is claimed for delivery, never cleared.
    pub delivery_person_id: Option<Uuid>,
    pub items: Vec<OrderItem>,
    pub total_price: f64,
    pub delivery_address: DeliveryAddress,
    pub special_notes: Option<String>,
    /// Minutes the business needs to prepare the order. Set once, only while
    /// the order is `accepted`.
    pub preparation_time: Option<u32>,
    /// 1-5 stars for the business, set at most once after delivery.
    pub client_rating: Option<u8>,
    /// 1-5 stars for the courier, set at most once after delivery.
    pub delivery_rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn items_subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum()
    }
}
