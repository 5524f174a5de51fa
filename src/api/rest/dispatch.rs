use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::post;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::clients::AuthToken;
use crate::engine::dispatch::{self, AssignmentOutcome, Decision};
use crate::error::AppError;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/:id/assign", post(assign_driver))
        .route("/orders/:id/decision", post(decide))
        .route("/orders/:id/ready", post(mark_ready))
        .route("/orders/:id/pickup", post(confirm_pickup))
        .route("/orders/:id/deliver", post(confirm_delivery))
        .route("/orders/:id/cancel", post(cancel))
        .route("/orders/:id/placed", post(announce_placed))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    let result = dispatch::assign_driver(&state, &auth, id).await;
    state.metrics.record_operation("assign_driver", result.is_ok());
    result.map(Json)
}

async fn decide(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<Order>, AppError> {
    let result = dispatch::decide(&state, &auth, id, payload.decision).await;
    state.metrics.record_operation("decide", result.is_ok());
    result.map(Json)
}

async fn mark_ready(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let result = dispatch::mark_ready(&state, &auth, id).await;
    state.metrics.record_operation("mark_ready", result.is_ok());
    result.map(Json)
}

async fn confirm_pickup(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let result = dispatch::confirm_pickup(&state, &auth, id).await;
    state.metrics.record_operation("confirm_pickup", result.is_ok());
    result.map(Json)
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let result = dispatch::confirm_delivery(&state, &auth, id).await;
    state.metrics.record_operation("confirm_delivery", result.is_ok());
    result.map(Json)
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let result = dispatch::cancel(&state, &auth, id).await;
    state.metrics.record_operation("cancel", result.is_ok());
    result.map(Json)
}

async fn announce_placed(
    State(state): State<Arc<AppState>>,
    auth: AuthToken,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let result = dispatch::announce_placed(&state, &auth, id).await;
    state.metrics.record_operation("announce_placed", result.is_ok());
    result.map(|()| Json(json!({ "message": "order placed notifications sent" })))
}
