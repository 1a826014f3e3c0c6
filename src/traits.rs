//! Seam between the optimizer and the road-routing backend.
//!
//! The optimizer only needs "how far and how long between these points".
//! Concrete backends (OSRM, a mock in tests) implement [`RouteBackend`].

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::model::Coordinates;
use crate::polyline::Polyline;

/// One turn-by-turn instruction along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Maneuver type, e.g. `depart`, `turn`, `arrive`.
    pub maneuver: String,
    /// Maneuver modifier, e.g. `left`, `slight right`.
    pub modifier: Option<String>,
    pub name: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Travel cost for a route through the requested waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub geometry: Option<Polyline>,
    pub steps: Vec<RouteStep>,
}

/// A road-routing service.
///
/// Waypoints are visited in the given order. Implementations make one
/// request per call; throttling and retries are the caller's job.
pub trait RouteBackend {
    fn route(&self, waypoints: &[Coordinates]) -> Result<RouteSummary, RoutingError>;
}

impl<B: RouteBackend + ?Sized> RouteBackend for &B {
    fn route(&self, waypoints: &[Coordinates]) -> Result<RouteSummary, RoutingError> {
        (**self).route(waypoints)
    }
}
