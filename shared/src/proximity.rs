//! Geometry for deciding how close an aircraft will pass to an observer.
//!
//! Positions are degrees of latitude/longitude plus geometric altitude in
//! feet. The aircraft track is dead-reckoned in a straight line for
//! [`PREDICT_MINUTES`] and sampled to find the closest point of approach.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EARTH_RADIUS_FT: f64 = 6371.0 * 3280.84;
pub const FEET_PER_NM: f64 = 6076.12;
pub const PREDICT_MINUTES: f64 = 3.0;
pub const APPROACH_SAMPLES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub alt_ft: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64, alt_ft: f64) -> Self {
        Self { lat, lon, alt_ft }
    }

    fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + t * (other.lat - self.lat),
            lon: self.lon + t * (other.lon - self.lon),
            alt_ft: self.alt_ft + t * (other.alt_ft - self.alt_ft),
        }
    }
}

/// Great-circle surface distance in feet.
#[must_use]
pub fn haversine_ft(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_FT * h.sqrt().clamp(0.0, 1.0).asin()
}

#[must_use]
pub fn slant_distance_ft(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_ft(a, b).hypot(a.alt_ft - b.alt_ft)
}

/// Elevation of `target` as seen from `observer`, in degrees. Negative when
/// the target is below the observer.
#[must_use]
pub fn angle_above_horizon_deg(observer: GeoPoint, target: GeoPoint) -> f64 {
    (target.alt_ft - observer.alt_ft)
        .atan2(haversine_ft(observer, target))
        .to_degrees()
}

/// Straight-line prediction along `track_deg` at `ground_speed_kts`.
/// Altitude is held constant.
#[must_use]
pub fn predict_position(
    from: GeoPoint,
    ground_speed_kts: f64,
    track_deg: f64,
    minutes: f64,
) -> GeoPoint {
    let travelled_ft = ground_speed_kts * FEET_PER_NM / 60.0 * minutes;
    let track = track_deg.to_radians();
    let d_lat = travelled_ft * track.cos() / EARTH_RADIUS_FT;
    let d_lon = travelled_ft * track.sin() / (EARTH_RADIUS_FT * from.lat.to_radians().cos());
    GeoPoint {
        lat: from.lat + d_lat.to_degrees(),
        lon: from.lon + d_lon.to_degrees(),
        alt_ft: from.alt_ft,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Over the ground only.
    Surface,
    /// Including altitude difference.
    Slant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    pub point: GeoPoint,
    /// Fraction of the predicted segment, `0.0..=1.0`.
    pub fraction: f64,
    pub distance_nm: f64,
}

/// Samples the segment `start..=end` and returns the point nearest to the
/// observer under `metric`. The first minimum wins on ties.
#[must_use]
pub fn closest_approach(
    observer: GeoPoint,
    start: GeoPoint,
    end: GeoPoint,
    metric: DistanceMetric,
) -> ClosestApproach {
    let measure = |p: GeoPoint| match metric {
        DistanceMetric::Surface => haversine_ft(observer, p),
        DistanceMetric::Slant => slant_distance_ft(observer, p),
    };

    let mut best = ClosestApproach {
        point: start,
        fraction: 0.0,
        distance_nm: measure(start) / FEET_PER_NM,
    };
    for i in 1..=APPROACH_SAMPLES {
        let fraction = f64::from(i) / f64::from(APPROACH_SAMPLES);
        let point = start.lerp(end, fraction);
        let distance_nm = measure(point) / FEET_PER_NM;
        if distance_nm < best.distance_nm {
            best = ClosestApproach {
                point,
                fraction,
                distance_nm,
            };
        }
    }
    best
}

/// One aircraft state vector as reported by an ADS-B aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSighting {
    pub hex: String,
    pub lat: f64,
    pub lon: f64,
    /// Barometric altitude, or the string `"ground"`.
    #[serde(default)]
    pub alt_baro: Option<Value>,
    #[serde(default)]
    pub alt_geom: Option<f64>,
    #[serde(default, rename = "gs")]
    pub ground_speed_kts: f64,
    #[serde(default)]
    pub track: f64,
    #[serde(default, rename = "t")]
    pub type_code: Option<String>,
    #[serde(default, rename = "r")]
    pub registration: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl AircraftSighting {
    #[must_use]
    pub fn is_on_ground(&self) -> bool {
        matches!(&self.alt_baro, Some(Value::String(s)) if s == "ground")
    }

    /// Current position, if the aircraft is airborne with a geometric
    /// altitude. Aircraft without `alt_geom` may be on the ground.
    #[must_use]
    pub fn airborne_position(&self) -> Option<GeoPoint> {
        if self.is_on_ground() {
            return None;
        }
        self.alt_geom.map(|alt| GeoPoint::new(self.lat, self.lon, alt))
    }

    #[must_use]
    pub fn predicted_position(&self) -> Option<GeoPoint> {
        self.airborne_position().map(|p| {
            predict_position(p, self.ground_speed_kts, self.track, PREDICT_MINUTES)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn one_degree_of_latitude_is_about_sixty_nm() {
        let a = GeoPoint::new(0.0, 0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0, 0.0);
        let nm = haversine_ft(a, b) / FEET_PER_NM;
        assert!((nm - 60.04).abs() < 0.1, "got {nm}");
    }

    #[test]
    fn slant_distance_adds_altitude() {
        let a = GeoPoint::new(51.0, 0.0, 0.0);
        let b = GeoPoint::new(51.0, 0.0, 3000.0);
        assert!((slant_distance_ft(a, b) - 3000.0).abs() < EPS);
    }

    #[test]
    fn angle_straight_up_is_ninety() {
        let a = GeoPoint::new(51.0, 0.0, 0.0);
        let b = GeoPoint::new(51.0, 0.0, 1000.0);
        assert!((angle_above_horizon_deg(a, b) - 90.0).abs() < EPS);
        let below = GeoPoint::new(51.01, 0.0, -100.0);
        assert!(angle_above_horizon_deg(a, below) < 0.0);
    }

    #[test]
    fn northbound_prediction_moves_latitude_only() {
        let start = GeoPoint::new(40.0, -74.0, 5000.0);
        // 120 kts for 3 minutes is 6 NM
        let end = predict_position(start, 120.0, 0.0, 3.0);
        assert!((end.lon - start.lon).abs() < EPS);
        assert!((end.alt_ft - 5000.0).abs() < EPS);
        let nm = haversine_ft(start, end) / FEET_PER_NM;
        assert!((nm - 6.0).abs() < 0.05, "got {nm}");
    }

    #[test]
    fn closest_approach_finds_overflight() {
        let observer = GeoPoint::new(0.0, 0.0, 0.0);
        let start = GeoPoint::new(-0.05, 0.0, 2000.0);
        let end = GeoPoint::new(0.05, 0.0, 2000.0);
        let surface = closest_approach(observer, start, end, DistanceMetric::Surface);
        assert!((surface.fraction - 0.5).abs() < EPS);
        assert!(surface.distance_nm < 1e-3);

        let slant = closest_approach(observer, start, end, DistanceMetric::Slant);
        assert!((slant.distance_nm - 2000.0 / FEET_PER_NM).abs() < 1e-3);
    }

    #[test]
    fn receding_aircraft_is_closest_now() {
        let observer = GeoPoint::new(0.0, 0.0, 0.0);
        let start = GeoPoint::new(0.01, 0.0, 1000.0);
        let end = GeoPoint::new(0.2, 0.0, 1000.0);
        let ca = closest_approach(observer, start, end, DistanceMetric::Slant);
        assert!(ca.fraction.abs() < EPS);
        assert_eq!(ca.point, start);
    }

    mod sighting_tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn decodes_aggregator_fields() {
            let s: AircraftSighting = serde_json::from_value(json!({
                "hex": "a1b2c3", "lat": 40.0, "lon": -74.0, "alt_baro": 4975,
                "alt_geom": 5000, "gs": 250.5, "track": 90.0, "t": "B738",
                "r": "N123AB", "category": "A3", "desc": "BOEING 737-800"
            }))
            .expect("decode");
            assert_eq!(s.type_code.as_deref(), Some("B738"));
            assert_eq!(s.airborne_position(), Some(GeoPoint::new(40.0, -74.0, 5000.0)));
        }

        #[test]
        fn ground_and_missing_geometric_altitude_are_skipped() {
            let ground: AircraftSighting = serde_json::from_value(json!({
                "hex": "1", "lat": 0.0, "lon": 0.0, "alt_baro": "ground", "alt_geom": 10
            }))
            .expect("decode");
            assert!(ground.is_on_ground());
            assert!(ground.predicted_position().is_none());

            let no_geom: AircraftSighting =
                serde_json::from_value(json!({"hex": "2", "lat": 0.0, "lon": 0.0, "alt_baro": 1200}))
                    .expect("decode");
            assert!(no_geom.airborne_position().is_none());
        }
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(
            lat1 in -80.0f64..80.0, lon1 in -179.0f64..179.0,
            lat2 in -80.0f64..80.0, lon2 in -179.0f64..179.0,
        ) {
            let a = GeoPoint::new(lat1, lon1, 0.0);
            let b = GeoPoint::new(lat2, lon2, 0.0);
            prop_assert!((haversine_ft(a, b) - haversine_ft(b, a)).abs() < 1e-3);
            prop_assert!(haversine_ft(a, b) >= 0.0);
        }

        #[test]
        fn closest_is_never_farther_than_endpoints(
            lat in -1.0f64..1.0, lon in -1.0f64..1.0, track in 0.0f64..360.0, gs in 0.0f64..500.0,
        ) {
            let observer = GeoPoint::new(0.0, 0.0, 0.0);
            let start = GeoPoint::new(lat, lon, 3000.0);
            let end = predict_position(start, gs, track, PREDICT_MINUTES);
            let ca = closest_approach(observer, start, end, DistanceMetric::Slant);
            prop_assert!(ca.distance_nm <= slant_distance_ft(observer, start) / FEET_PER_NM + 1e-9);
            prop_assert!(ca.distance_nm <= slant_distance_ft(observer, end) / FEET_PER_NM + 1e-9);
        }
    }
}
