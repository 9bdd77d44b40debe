use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::external::geocode::{NullGeocoder, ReverseGeocoder};
use crate::external::storage::{InMemoryStore, ObjectStore};
use crate::models::business::Business;
use crate::models::courier::Courier;
use crate::models::event::ChangeEvent;
use crate::models::history::ArchivedOrder;
use crate::models::message::QuickMessage;
use crate::models::order::{Order, OrderStatus};
use crate::models::rating::RatingRecord;
use crate::observability::metrics::Metrics;

/// All registries are upsert-by-id; every mutation publishes a [`ChangeEvent`]
/// so connected dashboards refresh incrementally instead of refetching.
pub struct AppState {
    pub orders: DashMap<Uuid, Order>,
    pub businesses: DashMap<Uuid, Business>,
    pub couriers: DashMap<Uuid, Courier>,
    pub quick_messages: DashMap<Uuid, QuickMessage>,
    pub ratings: DashMap<Uuid, RatingRecord>,
    pub order_history: DashMap<Uuid, ArchivedOrder>,
    /// One running tracking loop per delivering order.
    pub tracking_tasks: DashMap<Uuid, AbortHandle>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub promotions: Arc<dyn ObjectStore>,
    pub events_tx: broadcast::Sender<ChangeEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            orders: DashMap::new(),
            businesses: DashMap::new(),
            couriers: DashMap::new(),
            quick_messages: DashMap::new(),
            ratings: DashMap::new(),
            order_history: DashMap::new(),
            tracking_tasks: DashMap::new(),
            geocoder: Arc::new(NullGeocoder),
            promotions: Arc::new(InMemoryStore::new()),
            events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Best-effort fan-out; nothing listens when no dashboard is connected.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn refresh_pending_gauge(&self) {
        let pending = self
            .orders
            .iter()
            .filter(|entry| entry.value().status == OrderStatus::Pending)
            .count();
        self.metrics.pending_orders.set(pending as i64);
    }
}
