use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{Identity, Role};
use crate::error::AppError;
use crate::external::geocode::resolve_address;
use crate::external::messaging;
use crate::lifecycle::{self, eta, expiry};
use crate::models::courier::GeoPoint;
use crate::models::event::ChangeEvent;
use crate::models::message::QuickMessage;
use crate::models::order::{DeliveryAddress, Order, OrderItem, OrderStatus};
use crate::models::rating::RatingRecord;
use crate::state::AppState;
use crate::tracking;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/available", get(available_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/reject", post(reject_order))
        .route("/orders/:id/preparation-time", post(set_preparation_time))
        .route("/orders/:id/start-preparing", post(start_preparing))
        .route("/orders/:id/ready", post(mark_ready))
        .route("/orders/:id/claim", post(claim_order))
        .route("/orders/:id/complete", post(complete_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/rating", post(rate_order))
        .route("/orders/:id/eta", get(order_eta))
        .route("/orders/:id/messages", post(send_message).get(list_messages))
}

#[derive(Deserialize)]
pub struct CheckoutAddress {
    #[serde(default)]
    pub full_address: String,
    pub coordinates: GeoPoint,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub business_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_address: CheckoutAddress,
    pub special_notes: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub whatsapp_url: String,
}

/// Converts a client cart into a pending order. The countdown toward
/// auto-cancellation starts at `created_at`.
async fn create_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    identity.require(Role::Cliente)?;

    if payload.items.is_empty() {
        return Err(AppError::BadRequest("order has no items".to_string()));
    }
    if payload.items.iter().any(|item| item.quantity == 0) {
        return Err(AppError::BadRequest(
            "item quantities must be positive".to_string(),
        ));
    }

    let business = state
        .businesses
        .get(&payload.business_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            AppError::NotFound(format!("business {} not found", payload.business_id))
        })?;
    if !business.is_open {
        return Err(AppError::BadRequest(format!(
            "{} is not taking orders right now",
            business.name
        )));
    }

    let full_address = if payload.delivery_address.full_address.trim().is_empty() {
        resolve_address(
            state.geocoder.as_ref(),
            &payload.delivery_address.coordinates,
        )
        .await
    } else {
        payload.delivery_address.full_address
    };

    let mut order = Order {
        id: Uuid::new_v4(),
        status: OrderStatus::Pending,
        client_id: identity.user_id,
        business_id: business.id,
        delivery_person_id: None,
        items: payload.items,
        total_price: 0.0,
        delivery_address: DeliveryAddress {
            full_address,
            coordinates: payload.delivery_address.coordinates,
        },
        special_notes: payload
            .special_notes
            .filter(|notes| !notes.trim().is_empty()),
        preparation_time: None,
        client_rating: None,
        delivery_rating: None,
        created_at: Utc::now(),
    };
    order.total_price = order.items_subtotal() + business.delivery_fee;

    let message = messaging::checkout_message(&order, &business);
    let whatsapp_url = messaging::whatsapp_link(messaging::CHECKOUT_PHONE, &message);

    state.orders.insert(order.id, order.clone());
    state.refresh_pending_gauge();
    state.publish(ChangeEvent::OrderChanged {
        order: order.clone(),
    });

    info!(
        order_id = %order.id,
        business_id = %business.id,
        total = order.total_price,
        "order placed"
    );

    Ok(Json(CheckoutResponse {
        order,
        whatsapp_url,
    }))
}

#[derive(Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_seconds_left: Option<i64>,
}

fn order_view(order: Order, now: DateTime<Utc>) -> OrderView {
    let pending_seconds_left = (order.status == OrderStatus::Pending)
        .then(|| expiry::remaining_seconds(&order, now).max(0));

    OrderView {
        order,
        pending_seconds_left,
    }
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order_view(order, Utc::now())))
}

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub client_id: Option<Uuid>,
    pub business_id: Option<Uuid>,
    pub delivery_person_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
) -> Json<Vec<OrderView>> {
    let now = Utc::now();
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|order| {
            params.client_id.is_none_or(|id| order.client_id == id)
                && params.business_id.is_none_or(|id| order.business_id == id)
                && params
                    .delivery_person_id
                    .is_none_or(|id| order.delivery_person_id == Some(id))
                && params.status.is_none_or(|status| order.status == status)
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        orders
            .into_iter()
            .map(|order| order_view(order, now))
            .collect(),
    )
}

/// Pool of ready orders no courier has claimed yet.
async fn available_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|order| order.status == OrderStatus::Ready && order.delivery_person_id.is_none())
        .collect();
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Json(orders)
}

/// Runs one lifecycle trigger against the registry entry and fans out the
/// result. The closure mutates under the entry lock; concurrent triggers on
/// the same order serialize there.
fn with_order<T>(
    state: &AppState,
    id: Uuid,
    transition: &'static str,
    apply: impl FnOnce(&mut Order) -> Result<T, AppError>,
) -> Result<(T, Order), AppError> {
    let (before, result, after) = {
        let mut entry = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        let before = entry.value().status;
        let result = apply(entry.value_mut());
        (before, result, entry.value().clone())
    };

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .transitions_total
        .with_label_values(&[transition, outcome])
        .inc();

    // a rejected trigger can still have applied the pending timeout
    if result.is_ok() || after.status != before {
        state.refresh_pending_gauge();
        state.publish(ChangeEvent::OrderChanged {
            order: after.clone(),
        });
    }

    result.map(|value| (value, after))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let (_, order) = with_order(&state, id, "accept", |order| {
        lifecycle::accept(order, Utc::now()).map_err(AppError::from)
    })?;

    info!(order_id = %id, "order accepted");
    Ok(Json(order))
}

async fn reject_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let (_, order) = with_order(&state, id, "reject", |order| {
        lifecycle::reject(order, Utc::now()).map_err(AppError::from)
    })?;

    info!(order_id = %id, "order rejected");
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct PreparationTimeRequest {
    pub minutes: u32,
}

async fn set_preparation_time(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PreparationTimeRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.minutes == 0 {
        return Err(AppError::BadRequest(
            "preparation time must be a positive number of minutes".to_string(),
        ));
    }

    let (_, order) = with_order(&state, id, "set_preparation_time", |order| {
        lifecycle::set_preparation_time(order, payload.minutes).map_err(AppError::from)
    })?;

    info!(order_id = %id, minutes = payload.minutes, "preparation time captured");
    Ok(Json(order))
}

async fn start_preparing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let (_, order) = with_order(&state, id, "start_preparing", |order| {
        lifecycle::start_preparing(order).map_err(AppError::from)
    })?;

    info!(order_id = %id, "order in preparation");
    Ok(Json(order))
}

async fn mark_ready(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let (_, order) = with_order(&state, id, "mark_ready", |order| {
        lifecycle::mark_ready(order).map_err(AppError::from)
    })?;

    info!(order_id = %id, "order ready for pickup");
    Ok(Json(order))
}

/// Courier takes the order. First claim wins; the tracking loop starts here.
async fn claim_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    identity.require(Role::Repartidor)?;

    let courier = state
        .couriers
        .get(&identity.user_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("courier {} not found", identity.user_id)))?;
    if !courier.is_online {
        return Err(AppError::BadRequest(
            "courier must be online to accept deliveries".to_string(),
        ));
    }

    let (_, order) = with_order(&state, id, "claim", |order| {
        lifecycle::claim(order, courier.id).map_err(AppError::from)
    })?;

    tracking::spawn_tracking(state.clone(), id, tracking::TRACKING_TICK);

    info!(order_id = %id, courier_id = %courier.id, "order claimed for delivery");
    Ok(Json(order))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    identity.require(Role::Repartidor)?;

    {
        let entry = state
            .orders
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        if entry.value().delivery_person_id != Some(identity.user_id) {
            return Err(AppError::Forbidden(
                "only the assigned courier can complete the delivery".to_string(),
            ));
        }
    }

    let (commission, order) = with_order(&state, id, "complete", |order| {
        lifecycle::complete(order).map_err(AppError::from)
    })?;

    tracking::stop_tracking(&state, &id);

    let courier = {
        let mut courier = state
            .couriers
            .get_mut(&identity.user_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {} not found", identity.user_id)))?;
        courier.earnings += commission;
        courier.total_deliveries += 1;
        courier.updated_at = Utc::now();
        courier.clone()
    };

    state
        .metrics
        .courier_earnings
        .with_label_values(&[&courier.id.to_string()])
        .set(courier.earnings);
    state.publish(ChangeEvent::CourierChanged {
        courier: courier.clone(),
    });

    info!(order_id = %id, courier_id = %courier.id, commission, "delivery completed");
    Ok(Json(order))
}

/// Manual cancellation, distinct from the pending auto-timeout.
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let (_, order) = with_order(&state, id, "cancel", |order| {
        lifecycle::cancel(order).map_err(AppError::from)
    })?;

    tracking::stop_tracking(&state, &id);

    info!(order_id = %id, "order cancelled");
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct RateOrderRequest {
    pub business_rating: Option<u8>,
    pub delivery_rating: Option<u8>,
    pub comment: Option<String>,
}

async fn rate_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<RateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    identity.require(Role::Cliente)?;

    if payload.business_rating.is_none() && payload.delivery_rating.is_none() {
        return Err(AppError::BadRequest(
            "at least one rating is required".to_string(),
        ));
    }
    for stars in [payload.business_rating, payload.delivery_rating]
        .into_iter()
        .flatten()
    {
        if !(1..=5).contains(&stars) {
            return Err(AppError::BadRequest(
                "ratings must be between 1 and 5 stars".to_string(),
            ));
        }
    }

    {
        let entry = state
            .orders
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        if entry.value().client_id != identity.user_id {
            return Err(AppError::Forbidden(
                "only the ordering client can rate this order".to_string(),
            ));
        }
    }

    let (_, order) = with_order(&state, id, "rate", |order| {
        lifecycle::rate(order, payload.business_rating, payload.delivery_rating)
            .map_err(AppError::from)
    })?;

    let record = RatingRecord {
        id: Uuid::new_v4(),
        order_id: order.id,
        client_id: order.client_id,
        business_id: order.business_id,
        delivery_person_id: order.delivery_person_id,
        business_rating: payload.business_rating,
        delivery_rating: payload.delivery_rating,
        comment: payload.comment.filter(|comment| !comment.trim().is_empty()),
        created_at: Utc::now(),
    };
    state.ratings.insert(record.id, record);

    refresh_business_rating(&state, order.business_id);
    if let Some(courier_id) = order.delivery_person_id {
        refresh_courier_rating(&state, courier_id);
    }

    Ok(Json(order))
}

fn refresh_business_rating(state: &AppState, business_id: Uuid) {
    let stars: Vec<f64> = state
        .ratings
        .iter()
        .filter(|entry| entry.value().business_id == business_id)
        .filter_map(|entry| entry.value().business_rating)
        .map(f64::from)
        .collect();
    if stars.is_empty() {
        return;
    }

    // one decimal, matching what the dashboards display
    let average = (stars.iter().sum::<f64>() / stars.len() as f64 * 10.0).round() / 10.0;

    if let Some(mut business) = state.businesses.get_mut(&business_id) {
        business.rating = average;
        business.updated_at = Utc::now();
        let business = business.clone();
        state.publish(ChangeEvent::BusinessChanged { business });
    }
}

fn refresh_courier_rating(state: &AppState, courier_id: Uuid) {
    let stars: Vec<f64> = state
        .ratings
        .iter()
        .filter(|entry| entry.value().delivery_person_id == Some(courier_id))
        .filter_map(|entry| entry.value().delivery_rating)
        .map(f64::from)
        .collect();
    if stars.is_empty() {
        return;
    }

    let average = (stars.iter().sum::<f64>() / stars.len() as f64 * 10.0).round() / 10.0;

    if let Some(mut courier) = state.couriers.get_mut(&courier_id) {
        courier.rating = average;
        courier.updated_at = Utc::now();
        let courier = courier.clone();
        state.publish(ChangeEvent::CourierChanged { courier });
    }
}

#[derive(Serialize)]
pub struct EtaResponse {
    pub eta: String,
}

async fn order_eta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EtaResponse>, AppError> {
    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let business = state
        .businesses
        .get(&order.business_id)
        .map(|entry| entry.value().clone());

    Ok(Json(EtaResponse {
        eta: eta::estimate(Some(&order), business.as_ref()),
    }))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<QuickMessage>, AppError> {
    identity.require(Role::Repartidor)?;

    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("message cannot be empty".to_string()));
    }

    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    if order.delivery_person_id != Some(identity.user_id) {
        return Err(AppError::Forbidden(
            "only the assigned courier can message the client".to_string(),
        ));
    }
    if order.status != OrderStatus::Delivering {
        return Err(AppError::InvalidTransition(
            "messages can only be sent while the order is out for delivery".to_string(),
        ));
    }

    let message = QuickMessage {
        id: Uuid::new_v4(),
        order_id: id,
        sender_id: identity.user_id,
        recipient_id: order.client_id,
        message: payload.message.trim().to_string(),
        created_at: Utc::now(),
    };
    state.quick_messages.insert(message.id, message.clone());
    state.publish(ChangeEvent::MessageSent {
        message: message.clone(),
    });

    Ok(Json(message))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<QuickMessage>> {
    let mut messages: Vec<QuickMessage> = state
        .quick_messages
        .iter()
        .filter(|entry| entry.value().order_id == id)
        .map(|entry| entry.value().clone())
        .collect();
    messages.sort_by_key(|message| message.created_at);

    Json(messages)
}
