//! Test fixtures for day-route.
//!
//! Provides:
//! - Real Hanoi locations (from OpenStreetMap)
//! - A scripted routing backend that never touches the network
//! - Small helpers for times and fast provider options

pub mod hanoi_locations;

use std::cell::{Cell, RefCell};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use day_route::haversine::HaversineEstimator;
use day_route::provider::ProviderOptions;
use day_route::traits::{RouteBackend, RouteSummary};
use day_route::{CancellationToken, Coordinates, OptimizeOptions, RoutingError};

type CostFn = Box<dyn Fn(Coordinates, Coordinates) -> Option<(f64, f64)>>;

/// Routing backend driven by a cost function.
///
/// The cost function returns `(distance_meters, duration_seconds)`, or
/// `None` to simulate a backend failure for that pair.
pub struct MockBackend {
    cost: CostFn,
    calls: RefCell<Vec<(Coordinates, Coordinates)>>,
    cancel_after: Cell<Option<(usize, CancellationToken)>>,
}

impl MockBackend {
    pub fn new(cost: impl Fn(Coordinates, Coordinates) -> Option<(f64, f64)> + 'static) -> Self {
        Self {
            cost: Box::new(cost),
            calls: RefCell::new(Vec::new()),
            cancel_after: Cell::new(None),
        }
    }

    /// Manhattan distance in degrees; one degree takes `seconds_per_degree`.
    pub fn manhattan(seconds_per_degree: f64) -> Self {
        Self::new(move |from, to| {
            let degrees = (from.lon - to.lon).abs() + (from.lat - to.lat).abs();
            Some((degrees * 111_000.0, degrees * seconds_per_degree))
        })
    }

    /// Great-circle distance at city driving speed (20 km/h).
    pub fn city() -> Self {
        Self::new(|from, to| {
            let meters = HaversineEstimator::distance_meters(from, to);
            Some((meters * 1.3, meters * 1.3 / (20_000.0 / 3600.0)))
        })
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::new(|_, _| None)
    }

    /// Cancels `token` once `calls` requests have been answered.
    pub fn cancel_after(self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after.set(Some((calls, token)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl RouteBackend for MockBackend {
    fn route(&self, waypoints: &[Coordinates]) -> Result<RouteSummary, RoutingError> {
        let (from, to) = (waypoints[0], waypoints[1]);
        self.calls.borrow_mut().push((from, to));

        if let Some((limit, token)) = self.cancel_after.take() {
            if self.call_count() >= limit {
                token.cancel();
            }
            self.cancel_after.set(Some((limit, token)));
        }

        match (self.cost)(from, to) {
            Some((distance_meters, duration_seconds)) => Ok(RouteSummary {
                distance_meters,
                duration_seconds,
                geometry: None,
                steps: Vec::new(),
            }),
            None => Err(RoutingError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            }),
        }
    }
}

/// Provider options with no throttling or backoff delays.
pub fn fast_provider() -> ProviderOptions {
    ProviderOptions::default()
        .with_call_interval(Duration::ZERO)
        .with_retry_backoff(Duration::ZERO)
}

pub fn fast_options() -> OptimizeOptions {
    OptimizeOptions::default().with_provider(fast_provider())
}

pub fn day_at(hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

pub fn time(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
