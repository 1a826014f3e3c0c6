//! Great-circle travel estimates (fallback when the routing backend fails).
//!
//! Ignores the road network, so estimates are optimistic on distance, but
//! they are always available.

use crate::model::Coordinates;

/// Average travel speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaversineEstimator {
    /// Assumed average travel speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineEstimator {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance in meters.
    pub fn distance_meters(from: Coordinates, to: Coordinates) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lon = (to.lon - from.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_M * c
    }

    /// Travel time in whole seconds for a distance at the assumed speed.
    pub fn seconds_for(&self, meters: f64) -> u32 {
        if self.speed_kmh <= 0.0 {
            return u32::MAX;
        }
        let meters_per_second = self.speed_kmh * 1000.0 / 3600.0;
        (meters / meters_per_second).round() as u32
    }

    /// Estimated `(distance_meters, duration_seconds)` between two points.
    pub fn estimate(&self, from: Coordinates, to: Coordinates) -> (u32, u32) {
        let meters = Self::distance_meters(from, to);
        (meters.round() as u32, self.seconds_for(meters))
    }
}
