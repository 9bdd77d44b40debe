use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

/// A restaurant or shop. `delivery_time` is the free-form base delivery time
/// shown to clients, either a range ("25-35") or a single number of minutes
/// ("30"); [`crate::lifecycle::eta`] combines it with an order's preparation
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub delivery_time: String,
    pub delivery_fee: f64,
    pub is_open: bool,
    pub rating: f64,
    pub location: GeoPoint,
    pub updated_at: DateTime<Utc>,
}
