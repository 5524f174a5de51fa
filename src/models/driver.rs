use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Busy,
    Offline,
}

/// A driver record owned by this service.
///
/// `availability` and `assigned_order` move in lock-step: a driver is
/// `Busy` exactly when it holds an order. All mutations go through
/// `drivers::DriverPool` so the claim/release operations can keep that
/// invariant under concurrent assignment attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub location: GeoPoint,
    pub availability: Availability,
    pub deliveries_count: u32,
    pub assigned_order: Option<Uuid>,
    pub near_alert_sent: bool,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(user_id: Uuid, location: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            location,
            availability: Availability::Available,
            deliveries_count: 0,
            assigned_order: None,
            near_alert_sent: false,
            updated_at: Utc::now(),
        }
    }
}
