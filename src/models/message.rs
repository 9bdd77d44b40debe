use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A short note sent by the assigned courier to the client while the order is
/// out for delivery ("I'm outside", "5 minutes away", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickMessage {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
