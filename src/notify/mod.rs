use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use tracing::warn;
use uuid::Uuid;

use crate::clients::{AuthToken, NotificationApi};
use crate::models::notification::{
    EmailMessage, NotificationKind, NotificationPayload, SmsMessage,
};
use crate::models::user::UserProfile;
use crate::observability::metrics::Metrics;

/// Everything the templates can mention.
#[derive(Debug, Clone)]
pub struct NotifyContext {
    pub order_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub restaurant_name: Option<String>,
    pub distance_km: Option<f64>,
}

impl NotifyContext {
    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id,
            driver_id: None,
            restaurant_name: None,
            distance_km: None,
        }
    }

    pub fn with_driver(mut self, driver_id: Uuid) -> Self {
        self.driver_id = Some(driver_id);
        self
    }

    pub fn with_restaurant(mut self, name: &str) -> Self {
        self.restaurant_name = Some(name.to_string());
        self
    }

    pub fn with_distance(mut self, km: f64) -> Self {
        self.distance_km = Some(km);
        self
    }
}

/// Fans one event out to every channel of every recipient.
///
/// All sends run concurrently and are best-effort: a recipient without a
/// phone number simply gets no SMS, and a failed send is logged and
/// counted without touching the other sends or the caller's success.
pub struct Notifier {
    client: Arc<dyn NotificationApi>,
    metrics: Metrics,
}

impl Notifier {
    pub fn new(client: Arc<dyn NotificationApi>, metrics: Metrics) -> Self {
        Self { client, metrics }
    }

    /// Returns the number of failed sends, for callers that want to
    /// surface an aggregate warning.
    pub async fn notify(
        &self,
        auth: &AuthToken,
        kind: NotificationKind,
        ctx: &NotifyContext,
        recipients: &[UserProfile],
    ) -> usize {
        let (subject, text) = compose(kind, ctx);
        let payload = NotificationPayload {
            order_id: ctx.order_id,
            driver_id: ctx.driver_id,
        };

        let mut sends: Vec<BoxFuture<'_, bool>> = Vec::new();
        for recipient in recipients {
            if let Some(email) = &recipient.email {
                let message = EmailMessage {
                    to: email.clone(),
                    subject: subject.clone(),
                    text: text.clone(),
                    kind,
                    payload: payload.clone(),
                };
                sends.push(Box::pin(self.send_email(auth, message)));
            }
            if let Some(phone) = &recipient.phone_number {
                let message = SmsMessage {
                    to: phone.clone(),
                    message: text.clone(),
                    kind,
                    payload: payload.clone(),
                };
                sends.push(Box::pin(self.send_sms(auth, message)));
            }
        }

        let results = join_all(sends).await;
        results.into_iter().filter(|ok| !ok).count()
    }

    async fn send_email(&self, auth: &AuthToken, message: EmailMessage) -> bool {
        let kind = message.kind;
        let to = message.to.clone();
        match self.client.send_email(auth, message).await {
            Ok(()) => {
                self.metrics
                    .notification_sends_total
                    .with_label_values(&["email", "success"])
                    .inc();
                true
            }
            Err(err) => {
                self.metrics
                    .notification_sends_total
                    .with_label_values(&["email", "error"])
                    .inc();
                warn!(%kind, to = %to, error = %err, "email notification failed");
                false
            }
        }
    }

    async fn send_sms(&self, auth: &AuthToken, message: SmsMessage) -> bool {
        let kind = message.kind;
        let to = message.to.clone();
        match self.client.send_sms(auth, message).await {
            Ok(()) => {
                self.metrics
                    .notification_sends_total
                    .with_label_values(&["sms", "success"])
                    .inc();
                true
            }
            Err(err) => {
                self.metrics
                    .notification_sends_total
                    .with_label_values(&["sms", "error"])
                    .inc();
                warn!(%kind, to = %to, error = %err, "sms notification failed");
                false
            }
        }
    }
}

fn compose(kind: NotificationKind, ctx: &NotifyContext) -> (String, String) {
    let order_id = ctx.order_id;
    let at_restaurant = ctx
        .restaurant_name
        .as_deref()
        .map(|name| format!(" at {name}"))
        .unwrap_or_default();

    match kind {
        NotificationKind::OrderPlaced => (
            format!("Order {order_id} Placed"),
            format!("Order {order_id}{at_restaurant} has been placed."),
        ),
        NotificationKind::DriverAssigned => (
            format!("Driver on the way for Order {order_id}"),
            format!("A driver has been assigned to order {order_id}{at_restaurant}."),
        ),
        NotificationKind::OrderReady => (
            format!("Order {order_id} Ready for Pickup"),
            format!("Order {order_id} is now ready{at_restaurant}."),
        ),
        NotificationKind::OrderPickedUp => (
            format!("Your Order {order_id} Has Been Picked Up"),
            format!("Order {order_id} has been picked up by the driver and is on its way."),
        ),
        NotificationKind::OrderDelivered => (
            format!("Order {order_id} Delivered"),
            format!("Order {order_id} has been delivered. Enjoy your meal!"),
        ),
        NotificationKind::OrderCancelled => (
            format!("Order {order_id} Cancelled"),
            format!("Order {order_id} has been cancelled."),
        ),
        NotificationKind::DriverNearby => {
            let distance = ctx
                .distance_km
                .map(|km| format!("{km:.2}km"))
                .unwrap_or_else(|| "moments".to_string());
            (
                format!("Your driver is almost there for Order {order_id}"),
                format!("Your driver is within {distance} of you. Be ready for delivery!"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use uuid::Uuid;

    use super::{Notifier, NotifyContext};
    use crate::clients::AuthToken;
    use crate::clients::memory::RecordingNotifications;
    use crate::models::notification::NotificationKind;
    use crate::models::user::UserProfile;
    use crate::observability::metrics::Metrics;

    fn user(email: Option<&str>, phone: Option<&str>) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            username: "tester".to_string(),
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
        }
    }

    fn auth() -> AuthToken {
        AuthToken("test-token".to_string())
    }

    #[tokio::test]
    async fn sends_to_every_channel_present() {
        let sink = Arc::new(RecordingNotifications::default());
        let notifier = Notifier::new(sink.clone(), Metrics::new());

        let recipients = vec![user(Some("a@example.com"), Some("+9477000000"))];
        let ctx = NotifyContext::for_order(Uuid::new_v4());
        let failures = notifier
            .notify(&auth(), NotificationKind::OrderDelivered, &ctx, &recipients)
            .await;

        assert_eq!(failures, 0);
        let sent = sink.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|n| n.channel == "email"));
        assert!(sent.iter().any(|n| n.channel == "sms"));
    }

    #[tokio::test]
    async fn missing_phone_is_skipped_silently() {
        let sink = Arc::new(RecordingNotifications::default());
        let notifier = Notifier::new(sink.clone(), Metrics::new());

        let recipients = vec![user(Some("a@example.com"), None)];
        let ctx = NotifyContext::for_order(Uuid::new_v4());
        let failures = notifier
            .notify(&auth(), NotificationKind::OrderReady, &ctx, &recipients)
            .await;

        assert_eq!(failures, 0);
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, "email");
    }

    #[tokio::test]
    async fn one_failed_channel_does_not_block_the_rest() {
        let sink = Arc::new(RecordingNotifications::default());
        sink.fail_sms(true);
        let notifier = Notifier::new(sink.clone(), Metrics::new());

        let recipients = vec![
            user(Some("a@example.com"), Some("+9477000000")),
            user(Some("b@example.com"), None),
        ];
        let ctx = NotifyContext::for_order(Uuid::new_v4());
        let failures = notifier
            .notify(&auth(), NotificationKind::DriverAssigned, &ctx, &recipients)
            .await;

        assert_eq!(failures, 1);
        let sent = sink.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|n| n.channel == "email"));
    }
}
