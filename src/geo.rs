//! Great-circle distance, travel velocity, and timestamp parsing shared by the detectors.

use chrono::{DateTime, Utc};

use crate::errors::DetectorError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Avoids a division by zero when two logins carry the same (or an inverted) timestamp;
/// the resulting velocity is enormous and so always trips the impossible-travel threshold.
const ELAPSED_EPSILON_HOURS: f64 = 1.0 / 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint { latitude, longitude }
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1_rad = p1.latitude.to_radians();
    let lat2_rad = p2.latitude.to_radians();
    let delta_lat = (p2.latitude - p1.latitude).to_radians();
    let delta_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Ground speed in km/h required to travel from (p1, t1) to (p2, t2).
///
/// `t2 <= t1` is treated as an epsilon-small elapsed time rather than zero, so the
/// result stays finite while still comfortably exceeding any plausible velocity ceiling.
pub fn velocity(p1: GeoPoint, t1: DateTime<Utc>, p2: GeoPoint, t2: DateTime<Utc>) -> f64 {
    let distance_km = haversine(p1, p2);
    let elapsed_hours = (t2 - t1).num_milliseconds() as f64 / 3_600_000.0;
    let elapsed_hours = if elapsed_hours <= 0.0 {
        ELAPSED_EPSILON_HOURS
    } else {
        elapsed_hours
    };

    distance_km / elapsed_hours
}

/// Rounds a velocity to the nearest whole km/h for alert description formatting.
pub fn round_velocity(v: f64) -> i64 {
    v.round() as i64
}

/// Parses an ISO-8601 timestamp with fractional seconds and a trailing `Z`, e.g.
/// `2023-05-03T06:50:03.768Z`. Also accepts timestamps without fractional seconds.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DetectorError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DetectorError::MalformedEvent(format!("invalid timestamp: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_distance_for_identical_points() {
        let p = GeoPoint::new(45.4758, 9.2275);
        assert!(haversine(p, p) < 1e-9);
    }

    #[test]
    fn haversine_india_to_united_states_matches_scenario_a() {
        let india = GeoPoint::new(28.6, 77.2);
        let us = GeoPoint::new(40.7, -74.0);
        let distance = haversine(india, us);
        // ~11,800 km great-circle distance between these points.
        assert!((distance - 11_831.0).abs() < 50.0, "distance was {distance}");
    }

    #[test]
    fn velocity_matches_scenario_a_within_rounding_tolerance() {
        let india = GeoPoint::new(28.6, 77.2);
        let us = GeoPoint::new(40.7, -74.0);
        let t1 = parse_timestamp("2023-05-03T06:50:03.768Z").unwrap();
        let t2 = parse_timestamp("2023-05-03T06:55:31.768Z").unwrap();
        let v = velocity(india, t1, us, t2);
        assert!((round_velocity(v) - 133_973).abs() <= 1, "velocity was {v}");
    }

    #[test]
    fn velocity_handles_non_increasing_timestamps_without_panicking() {
        let p1 = GeoPoint::new(10.0, 10.0);
        let p2 = GeoPoint::new(50.0, 50.0);
        let t = parse_timestamp("2023-05-03T06:50:03.768Z").unwrap();
        let v = velocity(p1, t, p2, t);
        assert!(v > 300.0);
        assert!(v.is_finite());
    }

    #[test]
    fn parse_timestamp_accepts_trailing_z() {
        let dt = parse_timestamp("2023-05-03T06:50:03.768Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(), "2023-05-03T06:50:03.768Z");
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("not-a-timestamp").is_err());
    }
}
