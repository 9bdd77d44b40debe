use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A delivery person. `current_location` is the last position reported by the
/// courier (or by the tracking loop while a delivery is in progress).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub vehicle: String,
    pub is_online: bool,
    pub current_location: Option<GeoPoint>,
    pub earnings: f64,
    pub total_deliveries: u32,
    pub rating: f64,
    pub updated_at: DateTime<Utc>,
}
