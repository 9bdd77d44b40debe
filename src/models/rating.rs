use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One rating submission for a delivered order. At most one record exists per
/// order; business and courier averages are recomputed from these records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub client_id: Uuid,
    pub business_id: Uuid,
    pub delivery_person_id: Option<Uuid>,
    pub business_rating: Option<u8>,
    pub delivery_rating: Option<u8>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
