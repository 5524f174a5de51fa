use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type tags carried on every outbound notification so downstream
/// channels can route and template on their side as well.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderPlaced,
    DriverAssigned,
    OrderReady,
    OrderPickedUp,
    OrderDelivered,
    OrderCancelled,
    DriverNearby,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NotificationKind::OrderPlaced => "order_placed",
            NotificationKind::DriverAssigned => "driver_assigned",
            NotificationKind::OrderReady => "order_ready",
            NotificationKind::OrderPickedUp => "order_picked_up",
            NotificationKind::OrderDelivered => "order_delivered",
            NotificationKind::OrderCancelled => "order_cancelled",
            NotificationKind::DriverNearby => "driver_nearby",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub order_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
}

/// Body of `POST /notify/email` on the notification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
}

/// Body of `POST /notify/sms` on the notification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsMessage {
    pub to: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
}
