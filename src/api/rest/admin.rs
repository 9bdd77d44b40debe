use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::auth::{Identity, Role};
use crate::error::AppError;
use crate::models::history::ArchivedOrder;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/archive-completed", post(archive_completed))
        .route("/admin/order-history", get(list_history))
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub archived: usize,
}

/// Moves every delivered or cancelled order out of the live registry into the
/// history collection.
async fn archive_completed(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<ArchiveResponse>, AppError> {
    identity.require(Role::Admin)?;

    let terminal: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().status.is_terminal())
        .map(|entry| entry.value().clone())
        .collect();

    let now = Utc::now();
    for order in &terminal {
        let record = ArchivedOrder::from_order(order, now);
        state.order_history.insert(record.id, record);
        state.orders.remove(&order.id);
    }

    if !terminal.is_empty() {
        info!(archived = terminal.len(), "completed orders archived");
    }

    Ok(Json(ArchiveResponse {
        archived: terminal.len(),
    }))
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<ArchivedOrder>>, AppError> {
    identity.require(Role::Admin)?;

    let mut records: Vec<ArchivedOrder> = state
        .order_history
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    records.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));

    Ok(Json(records))
}
