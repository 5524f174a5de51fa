use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::clients::AuthToken;
use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::driver::{Availability, Driver, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(register_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
        .route("/drivers/:id/availability", patch(update_availability))
        .route("/drivers/:id/location", patch(report_location))
}

#[derive(Deserialize)]
pub struct RegisterDriverRequest {
    pub user_id: Uuid,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub availability: Availability,
}

#[derive(Deserialize)]
pub struct LocationPingRequest {
    pub location: GeoPoint,
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    _auth: AuthToken,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if !(-90.0..=90.0).contains(&payload.location.lat)
        || !(-180.0..=180.0).contains(&payload.location.lng)
    {
        return Err(AppError::BadRequest("invalid coordinates".to_string()));
    }

    let driver = state.drivers.register(payload.user_id, payload.location);
    Ok(Json(driver))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    _auth: AuthToken,
) -> Json<Vec<Driver>> {
    Json(state.drivers.all())
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    _auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(state.drivers.get(id)?))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    _auth: AuthToken,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = state.drivers.set_availability(id, payload.availability)?;
    Ok(Json(driver))
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationPingRequest>,
) -> Result<Json<Driver>, AppError> {
    let result = dispatch::report_location(&state, &auth, id, payload.location).await;
    state.metrics.record_operation("report_location", result.is_ok());
    result.map(Json)
}
