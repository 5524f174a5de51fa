use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{Availability, Driver, GeoPoint};

/// In-process driver storage.
///
/// Every mutation goes through this type so that `availability` and
/// `assigned_order` stay in lock-step. The claim is a conditional update
/// under the map's entry lock: two concurrent assignment attempts against
/// the same driver serialize here, and exactly one observes `Available`.
pub struct DriverPool {
    drivers: DashMap<Uuid, Driver>,
}

impl DriverPool {
    pub fn new() -> Self {
        Self {
            drivers: DashMap::new(),
        }
    }

    pub fn register(&self, user_id: Uuid, location: GeoPoint) -> Driver {
        let driver = Driver::new(user_id, location);
        self.drivers.insert(driver.id, driver.clone());
        driver
    }

    pub fn get(&self, driver_id: Uuid) -> Result<Driver, AppError> {
        self.drivers
            .get(&driver_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))
    }

    pub fn all(&self) -> Vec<Driver> {
        self.drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Snapshot of drivers currently marked available. The snapshot is
    /// advisory only; the claim re-checks availability atomically.
    pub fn snapshot_available(&self) -> Vec<Driver> {
        self.drivers
            .iter()
            .filter(|entry| entry.value().availability == Availability::Available)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Claim `driver_id` for `order_id` only if the driver is still
    /// available. Returns false when a concurrent caller won the driver
    /// first or the driver went offline since the snapshot.
    pub fn try_claim(&self, driver_id: Uuid, order_id: Uuid) -> bool {
        match self.drivers.get_mut(&driver_id) {
            Some(mut driver) if driver.availability == Availability::Available => {
                driver.availability = Availability::Busy;
                driver.assigned_order = Some(order_id);
                driver.near_alert_sent = false;
                driver.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Release a driver after its order reached a terminal state.
    /// `completed` distinguishes a delivery from a cancellation; only
    /// completed deliveries bump the load-balancing counter.
    pub fn release(&self, driver_id: Uuid, completed: bool) -> Result<Driver, AppError> {
        let mut driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        driver.availability = Availability::Available;
        driver.assigned_order = None;
        if completed {
            driver.deliveries_count = driver.deliveries_count.saturating_add(1);
        }
        driver.updated_at = Utc::now();

        Ok(driver.clone())
    }

    pub fn record_location(&self, driver_id: Uuid, location: GeoPoint) -> Result<Driver, AppError> {
        let mut driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        driver.location = location;
        driver.updated_at = Utc::now();

        Ok(driver.clone())
    }

    /// Win-once flag for the proximity alert. Returns true for exactly one
    /// caller per claim; the flag resets on the next `try_claim`.
    pub fn mark_near_alert_sent(&self, driver_id: Uuid) -> bool {
        match self.drivers.get_mut(&driver_id) {
            Some(mut driver) if !driver.near_alert_sent => {
                driver.near_alert_sent = true;
                driver.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Manual availability override (driver going offline / coming back).
    /// Refuses to free a driver that still holds an order; that path must
    /// go through `release`.
    pub fn set_availability(
        &self,
        driver_id: Uuid,
        availability: Availability,
    ) -> Result<Driver, AppError> {
        let mut driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        if driver.assigned_order.is_some() && availability != Availability::Busy {
            return Err(AppError::BadRequest(format!(
                "driver {driver_id} still has an assigned order"
            )));
        }

        driver.availability = availability;
        driver.updated_at = Utc::now();

        Ok(driver.clone())
    }
}

impl Default for DriverPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DriverPool;
    use crate::models::driver::{Availability, GeoPoint};

    fn point() -> GeoPoint {
        GeoPoint {
            lat: 6.9271,
            lng: 79.8612,
        }
    }

    #[test]
    fn claim_marks_busy_and_stores_order() {
        let pool = DriverPool::new();
        let driver = pool.register(Uuid::new_v4(), point());
        let order_id = Uuid::new_v4();

        assert!(pool.try_claim(driver.id, order_id));

        let claimed = pool.get(driver.id).unwrap();
        assert_eq!(claimed.availability, Availability::Busy);
        assert_eq!(claimed.assigned_order, Some(order_id));
    }

    #[test]
    fn second_claim_on_same_driver_fails() {
        let pool = DriverPool::new();
        let driver = pool.register(Uuid::new_v4(), point());

        assert!(pool.try_claim(driver.id, Uuid::new_v4()));
        assert!(!pool.try_claim(driver.id, Uuid::new_v4()));
    }

    #[test]
    fn release_after_completion_bumps_counter() {
        let pool = DriverPool::new();
        let driver = pool.register(Uuid::new_v4(), point());
        pool.try_claim(driver.id, Uuid::new_v4());

        let released = pool.release(driver.id, true).unwrap();
        assert_eq!(released.availability, Availability::Available);
        assert_eq!(released.assigned_order, None);
        assert_eq!(released.deliveries_count, 1);
    }

    #[test]
    fn release_after_cancellation_keeps_counter() {
        let pool = DriverPool::new();
        let driver = pool.register(Uuid::new_v4(), point());
        pool.try_claim(driver.id, Uuid::new_v4());

        let released = pool.release(driver.id, false).unwrap();
        assert_eq!(released.deliveries_count, 0);
    }

    #[test]
    fn near_alert_flag_wins_once_per_claim() {
        let pool = DriverPool::new();
        let driver = pool.register(Uuid::new_v4(), point());
        pool.try_claim(driver.id, Uuid::new_v4());

        assert!(pool.mark_near_alert_sent(driver.id));
        assert!(!pool.mark_near_alert_sent(driver.id));

        // A fresh claim re-arms the alert.
        pool.release(driver.id, true).unwrap();
        pool.try_claim(driver.id, Uuid::new_v4());
        assert!(pool.mark_near_alert_sent(driver.id));
    }

    #[test]
    fn cannot_free_driver_with_assigned_order() {
        let pool = DriverPool::new();
        let driver = pool.register(Uuid::new_v4(), point());
        pool.try_claim(driver.id, Uuid::new_v4());

        let result = pool.set_availability(driver.id, Availability::Available);
        assert!(result.is_err());
    }
}
