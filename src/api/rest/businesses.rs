use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Identity, Role};
use crate::error::AppError;
use crate::external::storage::{validate_upload, FileKind, StoredFile};
use crate::models::business::Business;
use crate::models::courier::GeoPoint;
use crate::models::event::ChangeEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/businesses", post(create_business).get(list_businesses))
        .route("/businesses/:id", get(get_business).patch(update_business))
        .route(
            "/businesses/:id/promotions",
            post(upload_promotion)
                .get(list_promotions)
                .delete(delete_promotion),
        )
}

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub delivery_time: String,
    pub delivery_fee: f64,
    pub location: GeoPoint,
}

/// Registers the authenticated business. The business id is the auth
/// identity, mirroring the one-account-one-business model of the dashboards.
async fn create_business(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<CreateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    identity.require(Role::Negocio)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.delivery_fee < 0.0 {
        return Err(AppError::BadRequest(
            "delivery fee cannot be negative".to_string(),
        ));
    }

    if state.businesses.contains_key(&identity.user_id) {
        return Err(AppError::Conflict(format!(
            "business {} already registered",
            identity.user_id
        )));
    }

    let business = Business {
        id: identity.user_id,
        name: payload.name,
        address: payload.address,
        phone: payload.phone,
        delivery_time: payload.delivery_time,
        delivery_fee: payload.delivery_fee,
        is_open: true,
        rating: 0.0,
        location: payload.location,
        updated_at: Utc::now(),
    };

    state.businesses.insert(business.id, business.clone());
    state.publish(ChangeEvent::BusinessChanged {
        business: business.clone(),
    });

    Ok(Json(business))
}

async fn list_businesses(State(state): State<Arc<AppState>>) -> Json<Vec<Business>> {
    let businesses = state
        .businesses
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(businesses)
}

async fn get_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Business>, AppError> {
    let business = state
        .businesses
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("business {id} not found")))?;

    Ok(Json(business))
}

#[derive(Deserialize)]
pub struct UpdateBusinessRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub delivery_time: Option<String>,
    pub delivery_fee: Option<f64>,
    pub is_open: Option<bool>,
    pub location: Option<GeoPoint>,
}

async fn update_business(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    if let Some(fee) = payload.delivery_fee {
        if fee < 0.0 {
            return Err(AppError::BadRequest(
                "delivery fee cannot be negative".to_string(),
            ));
        }
    }

    let business = {
        let mut business = state
            .businesses
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("business {id} not found")))?;

        if let Some(name) = payload.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("name cannot be empty".to_string()));
            }
            business.name = name;
        }
        if let Some(address) = payload.address {
            business.address = address;
        }
        if let Some(phone) = payload.phone {
            business.phone = phone;
        }
        if let Some(delivery_time) = payload.delivery_time {
            business.delivery_time = delivery_time;
        }
        if let Some(delivery_fee) = payload.delivery_fee {
            business.delivery_fee = delivery_fee;
        }
        if let Some(is_open) = payload.is_open {
            business.is_open = is_open;
        }
        if let Some(location) = payload.location {
            business.location = location;
        }
        business.updated_at = Utc::now();
        business.clone()
    };

    state.publish(ChangeEvent::BusinessChanged {
        business: business.clone(),
    });

    Ok(Json(business))
}

#[derive(Deserialize)]
pub struct UploadParams {
    pub name: String,
}

/// Stores a promotional attachment after enforcing the per-kind size caps.
async fn upload_promotion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<StoredFile>, AppError> {
    if !state.businesses.contains_key(&id) {
        return Err(AppError::NotFound(format!("business {id} not found")));
    }

    let kind = FileKind::from_file_name(&params.name).ok_or_else(|| {
        AppError::BadRequest("only image or pdf attachments are supported".to_string())
    })?;
    validate_upload(kind, body.len())?;

    let ext = params
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let path = format!("{id}/{}.{ext}", Uuid::new_v4());

    let stored = state.promotions.upload(&path, &params.name, &body).await?;
    Ok(Json(stored))
}

async fn list_promotions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StoredFile>>, AppError> {
    let files = state.promotions.list_prefix(&format!("{id}/")).await?;
    Ok(Json(files))
}

#[derive(Deserialize)]
pub struct DeletePromotionRequest {
    pub path: String,
}

async fn delete_promotion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeletePromotionRequest>,
) -> Result<StatusCode, AppError> {
    if !payload.path.starts_with(&format!("{id}/")) {
        return Err(AppError::Forbidden(
            "path does not belong to this business".to_string(),
        ));
    }

    state.promotions.delete(&payload.path).await?;
    Ok(StatusCode::NO_CONTENT)
}
