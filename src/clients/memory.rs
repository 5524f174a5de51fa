//! In-memory collaborator implementations.
//!
//! Used by the unit and integration test suites in place of the real
//! collaborator services: orders live in a map, notifications are
//! recorded instead of sent, and individual calls can be made to fail to
//! exercise the advisory-failure paths.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::clients::{AuthToken, Collaborators, NotificationApi, OrderApi, RestaurantApi, UserApi};
use crate::error::AppError;
use crate::models::notification::{EmailMessage, NotificationKind, SmsMessage};
use crate::models::order::{Order, OrderStatus, Restaurant};
use crate::models::user::UserProfile;

#[derive(Default)]
pub struct InMemoryOrders {
    orders: DashMap<Uuid, Order>,
    fail_updates: AtomicBool,
}

impl InMemoryOrders {
    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).map(|entry| entry.value().clone())
    }

    /// Make subsequent `update_status` calls fail as if the order service
    /// were unreachable.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl OrderApi for InMemoryOrders {
    async fn fetch_order(&self, _auth: &AuthToken, order_id: Uuid) -> Result<Order, AppError> {
        self.get(order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
    }

    async fn update_status(
        &self,
        _auth: &AuthToken,
        order_id: Uuid,
        status: OrderStatus,
        driver_id: Option<Uuid>,
    ) -> Result<Order, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamUnavailable(
                "order service unreachable".to_string(),
            ));
        }

        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        order.status = status;
        if driver_id.is_some() {
            order.driver_id = driver_id;
        }
        order.updated_at = Utc::now();

        Ok(order.clone())
    }
}

#[derive(Default)]
pub struct InMemoryRestaurants {
    restaurants: DashMap<Uuid, Restaurant>,
}

impl InMemoryRestaurants {
    pub fn insert(&self, restaurant: Restaurant) {
        self.restaurants.insert(restaurant.id, restaurant);
    }
}

#[async_trait::async_trait]
impl RestaurantApi for InMemoryRestaurants {
    async fn fetch_restaurant(
        &self,
        _auth: &AuthToken,
        restaurant_id: Uuid,
    ) -> Result<Restaurant, AppError> {
        self.restaurants
            .get(&restaurant_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: DashMap<Uuid, UserProfile>,
}

impl InMemoryUsers {
    pub fn insert(&self, user: UserProfile) {
        self.users.insert(user.id, user);
    }
}

#[async_trait::async_trait]
impl UserApi for InMemoryUsers {
    async fn fetch_user(&self, _auth: &AuthToken, user_id: Uuid) -> Result<UserProfile, AppError> {
        self.users
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
    }
}

/// One recorded send, either channel.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub channel: &'static str,
    pub to: String,
    pub kind: NotificationKind,
    pub order_id: Uuid,
}

#[derive(Default)]
pub struct RecordingNotifications {
    sent: Mutex<Vec<SentNotification>>,
    fail_email: AtomicBool,
    fail_sms: AtomicBool,
}

impl RecordingNotifications {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().expect("notification log poisoned").clone()
    }

    pub fn sent_of_kind(&self, kind: NotificationKind) -> Vec<SentNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }

    pub fn fail_email(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sms(&self, fail: bool) {
        self.fail_sms.store(fail, Ordering::SeqCst);
    }

    fn record(&self, entry: SentNotification) {
        self.sent.lock().expect("notification log poisoned").push(entry);
    }
}

#[async_trait::async_trait]
impl NotificationApi for RecordingNotifications {
    async fn send_email(&self, _auth: &AuthToken, message: EmailMessage) -> Result<(), AppError> {
        if self.fail_email.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamUnavailable(
                "email channel down".to_string(),
            ));
        }
        self.record(SentNotification {
            channel: "email",
            to: message.to,
            kind: message.kind,
            order_id: message.payload.order_id,
        });
        Ok(())
    }

    async fn send_sms(&self, _auth: &AuthToken, message: SmsMessage) -> Result<(), AppError> {
        if self.fail_sms.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamUnavailable("sms channel down".to_string()));
        }
        self.record(SentNotification {
            channel: "sms",
            to: message.to,
            kind: message.kind,
            order_id: message.payload.order_id,
        });
        Ok(())
    }
}

/// Everything a test needs to drive the coordinator end to end.
pub struct MemoryBackends {
    pub orders: Arc<InMemoryOrders>,
    pub restaurants: Arc<InMemoryRestaurants>,
    pub users: Arc<InMemoryUsers>,
    pub notifications: Arc<RecordingNotifications>,
}

impl MemoryBackends {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            orders: self.orders.clone(),
            restaurants: self.restaurants.clone(),
            users: self.users.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl Default for MemoryBackends {
    fn default() -> Self {
        Self {
            orders: Arc::new(InMemoryOrders::default()),
            restaurants: Arc::new(InMemoryRestaurants::default()),
            users: Arc::new(InMemoryUsers::default()),
            notifications: Arc::new(RecordingNotifications::default()),
        }
    }
}
