use async_trait::async_trait;

use crate::error::AppError;
use crate::models::courier::GeoPoint;

/// Reverse-geocoding lookup. The production deployment fronts a third-party
/// service; lookups are best-effort and failures degrade to a coordinate
/// label.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn display_name(&self, point: &GeoPoint) -> Result<String, AppError>;
}

/// Stand-in used when no geocoding backend is configured.
pub struct NullGeocoder;

#[async_trait]
impl ReverseGeocoder for NullGeocoder {
    async fn display_name(&self, _point: &GeoPoint) -> Result<String, AppError> {
        Err(AppError::LocationUnavailable(
            "no reverse geocoding backend configured".to_string(),
        ))
    }
}

pub fn coordinate_label(point: &GeoPoint) -> String {
    format!("Lat: {:.4}, Lng: {:.4}", point.lat, point.lng)
}

/// Resolves a display address, falling back to raw coordinates when the
/// lookup fails or returns nothing.
pub async fn resolve_address(geocoder: &dyn ReverseGeocoder, point: &GeoPoint) -> String {
    match geocoder.display_name(point).await {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => coordinate_label(point),
        Err(err) => {
            tracing::debug!(error = %err, "reverse geocoding failed, using coordinates");
            coordinate_label(point)
        }
    }
}
