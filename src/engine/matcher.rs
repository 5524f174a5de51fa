use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::driver::{Driver, GeoPoint};

/// Drivers further than this from the restaurant are only considered when
/// nobody closer exists.
pub const MATCH_RADIUS_KM: f64 = 10.0;

/// A driver paired with its distance to the restaurant, alive for one
/// matching call.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub driver: Driver,
    pub distance_km: f64,
}

/// Pick the best driver for a pickup at `restaurant`.
///
/// Candidates within 10 km are preferred; with none in range the whole
/// pool stays in play rather than failing the order. Nearest wins, with
/// equidistant drivers ordered by fewest completed deliveries.
pub fn select(restaurant: &GeoPoint, pool: &[Driver]) -> Result<Candidate, AppError> {
    if pool.is_empty() {
        return Err(AppError::NoDriverAvailable);
    }

    let mut candidates: Vec<Candidate> = pool
        .iter()
        .map(|driver| Candidate {
            driver: driver.clone(),
            distance_km: haversine_km(restaurant, &driver.location),
        })
        .collect();

    let mut nearby: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.distance_km <= MATCH_RADIUS_KM)
        .cloned()
        .collect();
    if nearby.is_empty() {
        nearby = std::mem::take(&mut candidates);
    }

    nearby.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then(a.driver.deliveries_count.cmp(&b.driver.deliveries_count))
    });

    Ok(nearby.remove(0))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{MATCH_RADIUS_KM, select};
    use crate::error::AppError;
    use crate::models::driver::{Driver, GeoPoint};

    const RESTAURANT: GeoPoint = GeoPoint {
        lat: 6.9271,
        lng: 79.8612,
    };

    fn driver_at(lat: f64, lng: f64, deliveries: u32) -> Driver {
        let mut driver = Driver::new(Uuid::new_v4(), GeoPoint { lat, lng });
        driver.deliveries_count = deliveries;
        driver
    }

    #[test]
    fn empty_pool_fails() {
        let result = select(&RESTAURANT, &[]);
        assert!(matches!(result, Err(AppError::NoDriverAvailable)));
    }

    #[test]
    fn nearest_in_radius_wins() {
        // ~1.2 km and ~5 km north of the restaurant.
        let near = driver_at(6.9380, 79.8612, 50);
        let far = driver_at(6.9720, 79.8612, 0);

        let winner = select(&RESTAURANT, &[far, near.clone()]).unwrap();
        assert_eq!(winner.driver.id, near.id);
        assert!(winner.distance_km <= MATCH_RADIUS_KM);
    }

    #[test]
    fn out_of_radius_driver_loses_to_in_radius_driver() {
        let in_radius = driver_at(6.9720, 79.8612, 99);
        let out_of_radius = driver_at(7.5, 79.8612, 0);

        let winner = select(&RESTAURANT, &[out_of_radius, in_radius.clone()]).unwrap();
        assert_eq!(winner.driver.id, in_radius.id);
    }

    #[test]
    fn falls_back_to_full_pool_when_nobody_in_radius() {
        // Both well outside 10 km; the closer one should still win.
        let closer = driver_at(7.2, 79.8612, 0);
        let further = driver_at(7.6, 79.8612, 0);

        let winner = select(&RESTAURANT, &[further, closer.clone()]).unwrap();
        assert_eq!(winner.driver.id, closer.id);
        assert!(winner.distance_km > MATCH_RADIUS_KM);
    }

    #[test]
    fn ties_break_by_fewest_deliveries() {
        let busy = driver_at(6.9380, 79.8612, 12);
        let fresh = driver_at(6.9380, 79.8612, 3);

        let winner = select(&RESTAURANT, &[busy, fresh.clone()]).unwrap();
        assert_eq!(winner.driver.id, fresh.id);
    }
}
