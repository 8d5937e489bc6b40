//! Spatial math for route statistics.

use crate::actions::ActionKind;
use crate::mission::Placemark;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Length and estimated flight time of a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteStats {
    pub distance_m: f64,
    pub duration_s: f64,
}

/// Compute route statistics over placemarks in flight order.
///
/// Each leg is flown at the speed of the placemark it departs from; the
/// vertical component of a leg is included. Hover actions add their time.
pub fn route_stats(placemarks: &[Placemark]) -> RouteStats {
    let mut distance_m = 0.0;
    let mut duration_s = 0.0;

    for leg in placemarks.windows(2) {
        let (from, to) = (&leg[0], &leg[1]);
        let horizontal = haversine_distance(from.latitude, from.longitude, to.latitude, to.longitude);
        let vertical = to.height - from.height;
        let length = (horizontal * horizontal + vertical * vertical).sqrt();
        distance_m += length;
        if from.speed > 0.0 {
            duration_s += length / from.speed;
        }
    }

    duration_s += placemarks
        .iter()
        .flat_map(|p| p.action_groups.iter())
        .flat_map(|g| g.actions.iter())
        .map(|a| match a.kind {
            ActionKind::Hover { hover_time } => hover_time,
            _ => 0.0,
        })
        .sum::<f64>();

    RouteStats {
        distance_m: round_to(distance_m, 2),
        duration_s: round_to(duration_s, 1),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TurnMode;

    fn placemark(index: u32, latitude: f64, height: f64, speed: f64) -> Placemark {
        Placemark {
            index,
            latitude,
            longitude: 0.0,
            height,
            speed,
            turn_mode: TurnMode::CoordinateTurn,
            turn_damping_dist: 0.2,
            use_straight_line: true,
            action_groups: Vec::new(),
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(39.9042, 116.4074, 39.9042, 116.4074);
        assert!(dist < 0.001);
    }

    #[test]
    fn route_stats_uses_departure_speed() {
        let placemarks = vec![placemark(0, 0.0, 50.0, 10.0), placemark(1, 0.001, 50.0, 2.0)];
        let stats = route_stats(&placemarks);
        assert!((stats.distance_m - 111.19).abs() < 0.1);
        assert!((stats.duration_s - 11.1).abs() < 0.05);
    }

    #[test]
    fn single_placemark_has_no_length() {
        let stats = route_stats(&[placemark(0, 10.0, 50.0, 5.0)]);
        assert_eq!(stats, RouteStats { distance_m: 0.0, duration_s: 0.0 });
    }
}
