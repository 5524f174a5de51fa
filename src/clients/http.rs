use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::clients::{AuthToken, Collaborators, NotificationApi, OrderApi, RestaurantApi, UserApi};
use crate::config::Config;
use crate::error::AppError;
use crate::models::notification::{EmailMessage, SmsMessage};
use crate::models::order::{Order, OrderStatus, Restaurant};
use crate::models::user::UserProfile;

/// reqwest-backed collaborator clients. One shared connection pool; every
/// request is bounded by the configured timeout and carries the forwarded
/// token as both a bearer header and the `access_token` cookie, matching
/// what the collaborator services accept.
#[derive(Clone)]
pub struct HttpServiceClient {
    client: Client,
    order_base: String,
    restaurant_base: String,
    user_base: String,
    notification_base: String,
}

impl HttpServiceClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            order_base: config.order_service_url.clone(),
            restaurant_base: config.restaurant_service_url.clone(),
            user_base: config.user_service_url.clone(),
            notification_base: config.notification_service_url.clone(),
        })
    }

    pub fn collaborators(self) -> Collaborators {
        let shared = std::sync::Arc::new(self);
        Collaborators {
            orders: shared.clone(),
            restaurants: shared.clone(),
            users: shared.clone(),
            notifications: shared,
        }
    }

    fn authed(&self, builder: RequestBuilder, auth: &AuthToken) -> RequestBuilder {
        builder
            .bearer_auth(auth.as_str())
            .header("cookie", format!("access_token={}", auth.as_str()))
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, AppError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{what} not found")));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "{what}: upstream returned {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AppError::UpstreamUnavailable(format!("{what}: invalid body: {err}")))
    }

    async fn expect_success(response: Response, what: &str) -> Result<(), AppError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::UpstreamUnavailable(format!(
                "{what}: upstream returned {status}"
            )))
        }
    }

    fn transport_err(what: &str) -> impl FnOnce(reqwest::Error) -> AppError + '_ {
        move |err| AppError::UpstreamUnavailable(format!("{what}: {err}"))
    }
}

#[async_trait::async_trait]
impl OrderApi for HttpServiceClient {
    async fn fetch_order(&self, auth: &AuthToken, order_id: Uuid) -> Result<Order, AppError> {
        let url = format!("{}/orders/{order_id}", self.order_base);
        let response = self
            .authed(self.client.get(&url), auth)
            .send()
            .await
            .map_err(Self::transport_err("order service"))?;

        Self::read_json(response, "order").await
    }

    async fn update_status(
        &self,
        auth: &AuthToken,
        order_id: Uuid,
        status: OrderStatus,
        driver_id: Option<Uuid>,
    ) -> Result<Order, AppError> {
        let url = format!("{}/orders/{order_id}/status", self.order_base);
        let mut body = json!({ "status": status });
        if let Some(driver_id) = driver_id {
            body["driverId"] = json!(driver_id);
        }

        let response = self
            .authed(self.client.patch(&url), auth)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_err("order service"))?;

        Self::read_json(response, "order").await
    }
}

#[async_trait::async_trait]
impl RestaurantApi for HttpServiceClient {
    async fn fetch_restaurant(
        &self,
        auth: &AuthToken,
        restaurant_id: Uuid,
    ) -> Result<Restaurant, AppError> {
        let url = format!("{}/restaurants/{restaurant_id}", self.restaurant_base);
        let response = self
            .authed(self.client.get(&url), auth)
            .send()
            .await
            .map_err(Self::transport_err("restaurant service"))?;

        Self::read_json(response, "restaurant").await
    }
}

#[async_trait::async_trait]
impl UserApi for HttpServiceClient {
    async fn fetch_user(&self, auth: &AuthToken, user_id: Uuid) -> Result<UserProfile, AppError> {
        let url = format!("{}/users/{user_id}", self.user_base);
        let response = self
            .authed(self.client.get(&url), auth)
            .send()
            .await
            .map_err(Self::transport_err("user service"))?;

        Self::read_json(response, "user").await
    }
}

#[async_trait::async_trait]
impl NotificationApi for HttpServiceClient {
    async fn send_email(&self, auth: &AuthToken, message: EmailMessage) -> Result<(), AppError> {
        let url = format!("{}/email", self.notification_base);
        let response = self
            .authed(self.client.post(&url), auth)
            .json(&message)
            .send()
            .await
            .map_err(Self::transport_err("notification service"))?;

        Self::expect_success(response, "email notification").await
    }

    async fn send_sms(&self, auth: &AuthToken, message: SmsMessage) -> Result<(), AppError> {
        let url = format!("{}/sms", self.notification_base);
        let response = self
            .authed(self.client.post(&url), auth)
            .json(&message)
            .send()
            .await
            .map_err(Self::transport_err("notification service"))?;

        Self::expect_success(response, "sms notification").await
    }
}
