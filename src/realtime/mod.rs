use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::event::DispatchEvent;
use crate::models::order::OrderStatus;

/// Publish/subscribe hub for real-time tracking.
///
/// One broadcast channel per order plus a global channel carrying every
/// event (driver heartbeats included). Publishing is fire-and-forget: a
/// channel with no subscribers drops the event. The only replay offered
/// to late subscribers is the most recent status of the order they watch.
pub struct Broadcaster {
    buffer: usize,
    global: broadcast::Sender<DispatchEvent>,
    per_order: DashMap<Uuid, broadcast::Sender<DispatchEvent>>,
    status_snapshots: DashMap<Uuid, OrderStatus>,
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        let (global, _unused_rx) = broadcast::channel(buffer);
        Self {
            buffer,
            global,
            per_order: DashMap::new(),
            status_snapshots: DashMap::new(),
        }
    }

    /// Publish to the order's channel and mirror onto the global channel.
    ///
    /// Channels are created by subscription only; publishing to an order
    /// nobody watches allocates nothing. A terminal status drops the
    /// order's snapshot, so the snapshot map tracks live orders only.
    pub fn publish_order(&self, order_id: Uuid, event: DispatchEvent) {
        if let DispatchEvent::OrderStatusChanged { status, .. } = &event {
            if status.is_terminal() {
                self.status_snapshots.remove(&order_id);
            } else {
                self.status_snapshots.insert(order_id, *status);
            }
        }

        if let Some(tx) = self.per_order.get(&order_id) {
            let _ = tx.send(event.clone());
        }
        let _ = self.global.send(event);
    }

    /// Drop an order's channel and snapshot once its lifecycle is over.
    /// Subscribers drain any buffered events and then see the channel
    /// close.
    pub fn retire_order(&self, order_id: Uuid) {
        self.per_order.remove(&order_id);
        self.status_snapshots.remove(&order_id);
    }

    pub fn active_order_channels(&self) -> usize {
        self.per_order.len()
    }

    pub fn tracked_snapshots(&self) -> usize {
        self.status_snapshots.len()
    }

    /// Publish to the global channel only (driver heartbeats with no
    /// active order).
    pub fn publish_global(&self, event: DispatchEvent) {
        let _ = self.global.send(event);
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<DispatchEvent> {
        self.global.subscribe()
    }

    /// Subscribe to one order. Returns the latest known status so a late
    /// subscriber can render something before the next live event.
    pub fn subscribe_order(
        &self,
        order_id: Uuid,
    ) -> (Option<OrderStatus>, broadcast::Receiver<DispatchEvent>) {
        let receiver = self.order_channel(order_id).subscribe();
        let snapshot = self.status_snapshots.get(&order_id).map(|s| *s.value());
        (snapshot, receiver)
    }

    fn order_channel(&self, order_id: Uuid) -> broadcast::Sender<DispatchEvent> {
        self.per_order
            .entry(order_id)
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::Broadcaster;
    use crate::models::event::DispatchEvent;
    use crate::models::order::OrderStatus;

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let hub = Broadcaster::new(16);
        hub.publish_order(
            Uuid::new_v4(),
            DispatchEvent::OrderPickedUp {
                order_id: Uuid::new_v4(),
            },
        );
    }

    #[tokio::test]
    async fn order_subscriber_receives_order_events() {
        let hub = Broadcaster::new(16);
        let order_id = Uuid::new_v4();
        let (snapshot, mut rx) = hub.subscribe_order(order_id);
        assert!(snapshot.is_none());

        hub.publish_order(order_id, DispatchEvent::OrderPickedUp { order_id });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DispatchEvent::OrderPickedUp { .. }));
    }

    #[tokio::test]
    async fn global_subscriber_sees_order_events_too() {
        let hub = Broadcaster::new(16);
        let order_id = Uuid::new_v4();
        let mut rx = hub.subscribe_global();

        hub.publish_order(order_id, DispatchEvent::OrderPickedUp { order_id });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DispatchEvent::OrderPickedUp { .. }));
    }

    #[test]
    fn publishing_does_not_allocate_channels_for_unwatched_orders() {
        let hub = Broadcaster::new(16);
        for _ in 0..100 {
            let order_id = Uuid::new_v4();
            hub.publish_order(order_id, DispatchEvent::OrderPickedUp { order_id });
        }
        assert_eq!(hub.active_order_channels(), 0);
    }

    #[test]
    fn terminal_status_drops_the_snapshot() {
        let hub = Broadcaster::new(16);
        for _ in 0..100 {
            let order_id = Uuid::new_v4();
            hub.publish_order(
                order_id,
                DispatchEvent::OrderStatusChanged {
                    order_id,
                    status: OrderStatus::Ready,
                },
            );
            hub.publish_order(
                order_id,
                DispatchEvent::OrderStatusChanged {
                    order_id,
                    status: OrderStatus::Delivered,
                },
            );
        }
        assert_eq!(hub.tracked_snapshots(), 0);
        assert_eq!(hub.active_order_channels(), 0);
    }

    #[tokio::test]
    async fn retire_closes_the_channel_after_buffered_events() {
        let hub = Broadcaster::new(16);
        let order_id = Uuid::new_v4();
        let (_snapshot, mut rx) = hub.subscribe_order(order_id);

        hub.publish_order(order_id, DispatchEvent::OrderPickedUp { order_id });
        hub.retire_order(order_id);

        assert_eq!(hub.active_order_channels(), 0);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DispatchEvent::OrderPickedUp { .. }));
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn late_subscriber_gets_latest_status_snapshot() {
        let hub = Broadcaster::new(16);
        let order_id = Uuid::new_v4();

        hub.publish_order(
            order_id,
            DispatchEvent::OrderStatusChanged {
                order_id,
                status: OrderStatus::Ready,
            },
        );
        hub.publish_order(
            order_id,
            DispatchEvent::OrderStatusChanged {
                order_id,
                status: OrderStatus::PickedUp,
            },
        );

        let (snapshot, _rx) = hub.subscribe_order(order_id);
        assert_eq!(snapshot, Some(OrderStatus::PickedUp));
    }
}
