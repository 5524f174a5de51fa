use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no drivers available")]
    NoDriverAvailable,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::NoDriverAvailable => {
                (StatusCode::NOT_FOUND, "no drivers available".to_string())
            }
            AppError::UpstreamUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "not authenticated".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
