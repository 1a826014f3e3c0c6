//! day-route: single-day route optimization for travel itineraries.
//!
//! Resolves travel costs between a day's stops through a rate-limited
//! road-routing backend, orders the stops to minimise travel time, and
//! derives an arrival/departure timeline with schedule warnings.

pub mod error;
pub mod haversine;
pub mod itinerary;
pub mod matrix;
pub mod model;
pub mod optimizer;
pub mod osrm;
pub mod polyline;
pub mod provider;
pub mod solver;
pub mod throttle;
pub mod timeline;
pub mod traits;
pub mod warning;

pub use error::{ApplyConflict, OptimizeError, RoutingError};
pub use itinerary::{DayItinerary, Entry, Place, apply_optimized_route};
pub use model::{Anchors, Coordinates, OpenWindow, Stop, StopId, StopKind};
pub use optimizer::{OptimizationResult, OptimizeOptions, OrderedStop, RouteOptimizer};
pub use throttle::CancellationToken;
