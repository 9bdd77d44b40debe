use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Identity, Role};
use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};
use crate::models::event::ChangeEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id", get(get_courier))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route("/couriers/:id/location", patch(update_courier_location))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub vehicle: String,
    pub location: Option<GeoPoint>,
}

/// Registers the authenticated delivery person. The courier id is the auth
/// identity, so one account owns exactly one courier profile.
async fn create_courier(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    identity.require(Role::Repartidor)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if state.couriers.contains_key(&identity.user_id) {
        return Err(AppError::Conflict(format!(
            "courier {} already registered",
            identity.user_id
        )));
    }

    let courier = Courier {
        id: identity.user_id,
        name: payload.name,
        vehicle: payload.vehicle,
        is_online: false,
        current_location: payload.location,
        earnings: 0.0,
        total_deliveries: 0,
        rating: 0.0,
        updated_at: Utc::now(),
    };

    state.couriers.insert(courier.id, courier.clone());
    state.publish(ChangeEvent::CourierChanged {
        courier: courier.clone(),
    });

    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Courier>, AppError> {
    let courier = state
        .couriers
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub is_online: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = {
        let mut courier = state
            .couriers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

        courier.is_online = payload.is_online;
        courier.updated_at = Utc::now();
        courier.clone()
    };

    state.publish(ChangeEvent::CourierChanged {
        courier: courier.clone(),
    });

    Ok(Json(courier))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = {
        let mut courier = state
            .couriers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

        courier.current_location = Some(payload.location);
        courier.updated_at = Utc::now();
        courier.clone()
    };

    state.publish(ChangeEvent::CourierChanged {
        courier: courier.clone(),
    });

    Ok(Json(courier))
}
