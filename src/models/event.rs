use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::GeoPoint;
use crate::models::order::OrderStatus;

/// Real-time events published to WebSocket subscribers. Tagged with the
/// event names the tracking UIs listen for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DispatchEvent {
    #[serde(rename_all = "camelCase")]
    DriverAssigned {
        order_id: Uuid,
        driver_id: Uuid,
        coordinates: GeoPoint,
    },
    #[serde(rename_all = "camelCase")]
    DriverLocationUpdate {
        order_id: Option<Uuid>,
        driver_id: Uuid,
        lat: f64,
        lng: f64,
    },
    #[serde(rename_all = "camelCase")]
    OrderStatusChanged { order_id: Uuid, status: OrderStatus },
    #[serde(rename_all = "camelCase")]
    OrderPickedUp { order_id: Uuid },
    #[serde(rename_all = "camelCase")]
    OrderDelivered { order_id: Uuid, driver_id: Uuid },
}
