pub mod http;
pub mod memory;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{EmailMessage, SmsMessage};
use crate::models::order::{Order, OrderStatus, Restaurant};
use crate::models::user::UserProfile;

/// Auth token forwarded on every collaborator call. Accepted either as a
/// bearer header or as the `access_token` cookie the web client sets.
#[derive(Debug, Clone)]
pub struct AuthToken(pub String);

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_parts(parts: &Parts) -> Option<Self> {
        if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
            if let Ok(raw) = value.to_str() {
                if let Some(token) = raw.strip_prefix("Bearer ") {
                    return Some(Self(token.to_string()));
                }
            }
        }

        let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == "access_token").then(|| Self(value.to_string()))
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts).ok_or(AppError::Unauthenticated)
    }
}

#[async_trait::async_trait]
pub trait OrderApi: Send + Sync {
    async fn fetch_order(&self, auth: &AuthToken, order_id: Uuid) -> Result<Order, AppError>;

    /// Persist a status change upstream. `driver_id` rides along on the
    /// `driver_assigned` transition.
    async fn update_status(
        &self,
        auth: &AuthToken,
        order_id: Uuid,
        status: OrderStatus,
        driver_id: Option<Uuid>,
    ) -> Result<Order, AppError>;
}

#[async_trait::async_trait]
pub trait RestaurantApi: Send + Sync {
    async fn fetch_restaurant(
        &self,
        auth: &AuthToken,
        restaurant_id: Uuid,
    ) -> Result<Restaurant, AppError>;
}

#[async_trait::async_trait]
pub trait UserApi: Send + Sync {
    async fn fetch_user(&self, auth: &AuthToken, user_id: Uuid) -> Result<UserProfile, AppError>;
}

#[async_trait::async_trait]
pub trait NotificationApi: Send + Sync {
    async fn send_email(&self, auth: &AuthToken, message: EmailMessage) -> Result<(), AppError>;
    async fn send_sms(&self, auth: &AuthToken, message: SmsMessage) -> Result<(), AppError>;
}

/// Bundle of collaborator clients injected into the coordinator at
/// construction time.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderApi>,
    pub restaurants: Arc<dyn RestaurantApi>,
    pub users: Arc<dyn UserApi>,
    pub notifications: Arc<dyn NotificationApi>,
}
