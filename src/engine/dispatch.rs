//! The dispatch coordinator: one operation per externally triggered
//! lifecycle event.
//!
//! Every operation is a sequential pipeline with two failure classes.
//! Mandatory steps (fetching the order or restaurant, persisting the
//! status change, claiming a driver) early-return their error. Advisory
//! steps (notifications, broadcasts, driver release after a terminal
//! status) run after the state change is already durable upstream; their
//! failures are logged and never reported as failure of the operation.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::AuthToken;
use crate::engine::{matcher, state_machine};
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::driver::{Driver, GeoPoint};
use crate::models::event::DispatchEvent;
use crate::models::notification::NotificationKind;
use crate::models::order::{Order, OrderStatus};
use crate::models::user::UserProfile;
use crate::notify::NotifyContext;
use crate::state::AppState;

/// Distance at which the one-time "driver nearby" alert fires.
pub const PROXIMITY_ALERT_KM: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub order: Order,
    pub driver: Driver,
    pub distance_km: f64,
}

/// Find, claim, and record a driver for the order.
///
/// The claim loop tolerates concurrent assignment: when another order
/// wins the selected driver between snapshot and claim, that driver is
/// dropped from the local pool and matching re-runs against the rest.
pub async fn assign_driver(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<AssignmentOutcome, AppError> {
    let started = Instant::now();
    let result = assign_driver_inner(state, auth, order_id).await;

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());

    result
}

async fn assign_driver_inner(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<AssignmentOutcome, AppError> {
    let order = state.collaborators.orders.fetch_order(auth, order_id).await?;
    state_machine::ensure_transition(order.status, OrderStatus::DriverAssigned)?;

    let restaurant = state
        .collaborators
        .restaurants
        .fetch_restaurant(auth, order.restaurant_id)
        .await?;

    let mut pool = state.drivers.snapshot_available();
    let winner = loop {
        let candidate = matcher::select(&restaurant.location, &pool)?;
        if state.drivers.try_claim(candidate.driver.id, order_id) {
            break candidate;
        }
        // Lost the race for this driver; retry against the rest.
        pool.retain(|d| d.id != candidate.driver.id);
    };

    let driver = state.drivers.get(winner.driver.id)?;

    let updated = match state
        .collaborators
        .orders
        .update_status(auth, order_id, OrderStatus::DriverAssigned, Some(driver.id))
        .await
    {
        Ok(updated) => updated,
        Err(err) => {
            // The claim never became visible upstream; undo it so the
            // driver is not stranded busy with no order.
            if let Err(release_err) = state.drivers.release(driver.id, false) {
                warn!(driver_id = %driver.id, error = %release_err, "failed to undo driver claim");
            }
            return Err(err);
        }
    };

    state.broadcaster.publish_order(
        order_id,
        DispatchEvent::OrderStatusChanged {
            order_id,
            status: OrderStatus::DriverAssigned,
        },
    );
    state.broadcaster.publish_order(
        order_id,
        DispatchEvent::DriverAssigned {
            order_id,
            driver_id: driver.id,
            coordinates: driver.location,
        },
    );

    info!(
        order_id = %order_id,
        driver_id = %driver.id,
        distance_km = winner.distance_km,
        "driver assigned"
    );

    let mut recipients = Vec::new();
    recipients.extend(fetch_profile(state, auth, updated.customer_id, "customer").await);
    recipients.extend(fetch_profile(state, auth, driver.user_id, "driver").await);
    recipients.extend(fetch_profile(state, auth, restaurant.owner_id, "restaurant owner").await);

    let ctx = NotifyContext::for_order(order_id)
        .with_driver(driver.id)
        .with_restaurant(&restaurant.name);
    state
        .notifier
        .notify(auth, NotificationKind::DriverAssigned, &ctx, &recipients)
        .await;

    Ok(AssignmentOutcome {
        order: updated,
        driver,
        distance_km: winner.distance_km,
    })
}

/// Restaurant accepts or rejects a pending order. No notifications; the
/// customer learns the outcome from later transitions.
pub async fn decide(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
    decision: Decision,
) -> Result<Order, AppError> {
    let target = match decision {
        Decision::Accept => OrderStatus::Accepted,
        Decision::Reject => OrderStatus::Rejected,
    };

    let updated = apply_transition(state, auth, order_id, target).await?;
    if target == OrderStatus::Rejected {
        state.broadcaster.retire_order(order_id);
    }

    Ok(updated)
}

/// Restaurant marks the order ready for pickup.
pub async fn mark_ready(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let updated = apply_transition(state, auth, order_id, OrderStatus::Ready).await?;

    let mut recipients = Vec::new();
    recipients.extend(fetch_profile(state, auth, updated.customer_id, "customer").await);
    if let Some(driver_id) = updated.driver_id {
        recipients.extend(fetch_driver_profile(state, auth, driver_id).await);
    }

    let ctx = NotifyContext::for_order(order_id);
    state
        .notifier
        .notify(auth, NotificationKind::OrderReady, &ctx, &recipients)
        .await;

    Ok(updated)
}

/// Driver confirms pickup at the restaurant.
pub async fn confirm_pickup(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let updated = apply_transition(state, auth, order_id, OrderStatus::PickedUp).await?;

    state
        .broadcaster
        .publish_order(order_id, DispatchEvent::OrderPickedUp { order_id });

    let recipients: Vec<UserProfile> = fetch_profile(state, auth, updated.customer_id, "customer")
        .await
        .into_iter()
        .collect();
    let ctx = NotifyContext::for_order(order_id);
    state
        .notifier
        .notify(auth, NotificationKind::OrderPickedUp, &ctx, &recipients)
        .await;

    Ok(updated)
}

/// Driver confirms delivery. The transition step releases the driver and
/// credits the completed delivery.
pub async fn confirm_delivery(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let updated = apply_transition(state, auth, order_id, OrderStatus::Delivered).await?;

    if let Some(driver_id) = updated.driver_id {
        state.broadcaster.publish_order(
            order_id,
            DispatchEvent::OrderDelivered {
                order_id,
                driver_id,
            },
        );
    }
    state.broadcaster.retire_order(order_id);

    let mut recipients = Vec::new();
    recipients.extend(fetch_profile(state, auth, updated.customer_id, "customer").await);
    if let Some(driver_id) = updated.driver_id {
        recipients.extend(fetch_driver_profile(state, auth, driver_id).await);
    }

    let ctx = NotifyContext::for_order(order_id);
    state
        .notifier
        .notify(auth, NotificationKind::OrderDelivered, &ctx, &recipients)
        .await;

    Ok(updated)
}

/// Customer (or support) cancels a live order. An assigned driver is
/// released without delivery credit.
pub async fn cancel(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let updated = apply_transition(state, auth, order_id, OrderStatus::Cancelled).await?;
    state.broadcaster.retire_order(order_id);

    let mut recipients = Vec::new();
    recipients.extend(fetch_profile(state, auth, updated.customer_id, "customer").await);
    match state
        .collaborators
        .restaurants
        .fetch_restaurant(auth, updated.restaurant_id)
        .await
    {
        Ok(restaurant) => {
            recipients
                .extend(fetch_profile(state, auth, restaurant.owner_id, "restaurant owner").await);
        }
        Err(err) => {
            warn!(order_id = %order_id, error = %err, "skipping owner notification");
        }
    }

    let ctx = NotifyContext::for_order(order_id);
    state
        .notifier
        .notify(auth, NotificationKind::OrderCancelled, &ctx, &recipients)
        .await;

    Ok(updated)
}

/// Fan out the order-placed announcement to the customer and the
/// restaurant owner. Pure notification; no transition happens here.
pub async fn announce_placed(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
) -> Result<(), AppError> {
    let order = state.collaborators.orders.fetch_order(auth, order_id).await?;
    let restaurant = state
        .collaborators
        .restaurants
        .fetch_restaurant(auth, order.restaurant_id)
        .await?;

    let mut recipients = Vec::new();
    recipients.extend(fetch_profile(state, auth, order.customer_id, "customer").await);
    recipients.extend(fetch_profile(state, auth, restaurant.owner_id, "restaurant owner").await);

    let ctx = NotifyContext::for_order(order_id).with_restaurant(&restaurant.name);
    state
        .notifier
        .notify(auth, NotificationKind::OrderPlaced, &ctx, &recipients)
        .await;

    Ok(())
}

/// Driver location ping: persist, broadcast, and evaluate the one-time
/// proximity alert for the driver's active order.
pub async fn report_location(
    state: &AppState,
    auth: &AuthToken,
    driver_id: Uuid,
    location: GeoPoint,
) -> Result<Driver, AppError> {
    let driver = state.drivers.record_location(driver_id, location)?;

    let event = DispatchEvent::DriverLocationUpdate {
        order_id: driver.assigned_order,
        driver_id,
        lat: location.lat,
        lng: location.lng,
    };

    let Some(order_id) = driver.assigned_order else {
        state.broadcaster.publish_global(event);
        return Ok(driver);
    };
    state.broadcaster.publish_order(order_id, event);

    // Advisory from here on: the ping itself already succeeded.
    let order = match state.collaborators.orders.fetch_order(auth, order_id).await {
        Ok(order) => order,
        Err(err) => {
            warn!(order_id = %order_id, error = %err, "proximity check skipped");
            return Ok(driver);
        }
    };

    let distance = haversine_km(&location, &order.delivery_address.location);
    if distance <= PROXIMITY_ALERT_KM && state.drivers.mark_near_alert_sent(driver_id) {
        state.metrics.proximity_alerts_total.inc();
        info!(order_id = %order_id, driver_id = %driver_id, distance_km = distance, "driver nearby");

        let recipients: Vec<UserProfile> =
            fetch_profile(state, auth, order.customer_id, "customer")
                .await
                .into_iter()
                .collect();
        let ctx = NotifyContext::for_order(order_id)
            .with_driver(driver_id)
            .with_distance(distance);
        state
            .notifier
            .notify(auth, NotificationKind::DriverNearby, &ctx, &recipients)
            .await;
    }

    Ok(driver)
}

/// Validate and persist a status change, emit the status event, and run
/// the driver-release follow-up for terminal statuses.
async fn apply_transition(
    state: &AppState,
    auth: &AuthToken,
    order_id: Uuid,
    target: OrderStatus,
) -> Result<Order, AppError> {
    let order = state.collaborators.orders.fetch_order(auth, order_id).await?;
    state_machine::ensure_transition(order.status, target)?;

    let updated = state
        .collaborators
        .orders
        .update_status(auth, order_id, target, None)
        .await?;

    state.broadcaster.publish_order(
        order_id,
        DispatchEvent::OrderStatusChanged {
            order_id,
            status: target,
        },
    );

    // The status change is durable upstream; a failed release is a
    // recoverable warning, not a rollback.
    if matches!(target, OrderStatus::Delivered | OrderStatus::Cancelled) {
        if let Some(driver_id) = updated.driver_id {
            let completed = target == OrderStatus::Delivered;
            if let Err(err) = state.drivers.release(driver_id, completed) {
                warn!(
                    order_id = %order_id,
                    driver_id = %driver_id,
                    error = %err,
                    "driver release failed after terminal status"
                );
            }
        }
    }

    info!(order_id = %order_id, status = %target, "order status updated");

    Ok(updated)
}

async fn fetch_profile(
    state: &AppState,
    auth: &AuthToken,
    user_id: Uuid,
    role: &str,
) -> Option<UserProfile> {
    match state.collaborators.users.fetch_user(auth, user_id).await {
        Ok(profile) => Some(profile),
        Err(err) => {
            warn!(user_id = %user_id, role, error = %err, "skipping unreachable recipient");
            None
        }
    }
}

async fn fetch_driver_profile(
    state: &AppState,
    auth: &AuthToken,
    driver_id: Uuid,
) -> Option<UserProfile> {
    match state.drivers.get(driver_id) {
        Ok(driver) => fetch_profile(state, auth, driver.user_id, "driver").await,
        Err(err) => {
            warn!(driver_id = %driver_id, error = %err, "skipping unknown driver recipient");
            None
        }
    }
}
