use crate::geo::haversine_m;
use crate::models::courier::GeoPoint;

/// Fraction of the remaining straight-line vector covered per tick.
pub const STEP_FRACTION: f64 = 0.05;

/// Great-circle distance below which the marker snaps onto the target.
pub const ARRIVAL_THRESHOLD_M: f64 = 10.0;

pub fn advance(prev: &GeoPoint, target: &GeoPoint) -> GeoPoint {
    GeoPoint {
        lat: prev.lat + (target.lat - prev.lat) * STEP_FRACTION,
        lng: prev.lng + (target.lng - prev.lng) * STEP_FRACTION,
    }
}

/// One interpolation tick. Returns the next position and whether the marker
/// arrived (snapped exactly onto the target).
pub fn step(prev: &GeoPoint, target: &GeoPoint) -> (GeoPoint, bool) {
    let next = advance(prev, target);
    if haversine_m(&next, target) < ARRIVAL_THRESHOLD_M {
        (target.clone(), true)
    } else {
        (next, false)
    }
}

#[cfg(test)]
mod tests {
    use super::{step, ARRIVAL_THRESHOLD_M};
    use crate::geo::haversine_m;
    use crate::models::courier::GeoPoint;

    fn start() -> GeoPoint {
        // roughly 1 km north of the target
        GeoPoint {
            lat: 19.4416,
            lng: -99.1332,
        }
    }

    fn target() -> GeoPoint {
        GeoPoint {
            lat: 19.4326,
            lng: -99.1332,
        }
    }

    #[test]
    fn distance_strictly_decreases_every_tick() {
        let target = target();
        let mut position = start();
        let mut distance = haversine_m(&position, &target);

        for _ in 0..50 {
            let (next, arrived) = step(&position, &target);
            let next_distance = haversine_m(&next, &target);
            assert!(next_distance < distance, "tick must move the marker closer");
            position = next;
            distance = next_distance;
            if arrived {
                break;
            }
        }
    }

    #[test]
    fn marker_never_overshoots() {
        let target = target();
        let mut position = start();

        loop {
            let (next, arrived) = step(&position, &target);
            if arrived {
                assert_eq!(next.lat, target.lat);
                assert_eq!(next.lng, target.lng);
                break;
            }
            // still strictly between the previous position and the target
            assert!((next.lat - target.lat).abs() < (position.lat - target.lat).abs());
            position = next;
        }
    }

    #[test]
    fn run_from_a_kilometer_terminates() {
        let target = target();
        let mut position = start();
        assert!(haversine_m(&position, &target) > 900.0);

        let mut ticks = 0;
        loop {
            let (next, arrived) = step(&position, &target);
            position = next;
            ticks += 1;
            if arrived {
                break;
            }
            assert!(ticks < 200, "interpolation must terminate");
        }

        // 5% decay needs about 90 ticks to get 1 km under 10 m
        assert!(ticks > 50);
        assert_eq!(position.lat, target.lat);
        assert_eq!(position.lng, target.lng);
        assert!(haversine_m(&position, &target) < ARRIVAL_THRESHOLD_M);
    }

    #[test]
    fn already_at_target_snaps_immediately() {
        let target = target();
        let (next, arrived) = step(&target, &target);
        assert!(arrived);
        assert_eq!(next.lat, target.lat);
    }
}
