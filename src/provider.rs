//! Distance/duration provider.
//!
//! Resolves the legs the sequencer needs by calling the routing backend
//! one pair at a time. Failed calls are retried with backoff and then
//! replaced by great-circle estimates, so a flaky backend degrades the
//! result instead of aborting it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::OptimizeError;
use crate::haversine::HaversineEstimator;
use crate::matrix::{DistanceMatrix, Leg};
use crate::model::{Anchors, Coordinates, Stop, StopId};
use crate::polyline::Polyline;
use crate::throttle::{CancellationToken, DEFAULT_CALL_INTERVAL, Throttle, WaitOutcome, sleep_interruptibly};
use crate::traits::RouteBackend;

#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Minimum spacing between backend calls.
    pub call_interval: Duration,
    /// Retries after the first failed attempt for one pair.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
    /// Treat A→B and B→A as the same route. When false both directions
    /// are requested.
    pub symmetric: bool,
    /// Estimator used for legs the backend could not answer.
    pub fallback: HaversineEstimator,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            call_interval: DEFAULT_CALL_INTERVAL,
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            symmetric: true,
            fallback: HaversineEstimator::default(),
        }
    }
}

impl ProviderOptions {
    pub fn with_call_interval(mut self, interval: Duration) -> Self {
        self.call_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    pub fn with_fallback_speed(mut self, speed_kmh: f64) -> Self {
        self.fallback = HaversineEstimator::new(speed_kmh);
        self
    }
}

type CoordKey = (i64, i64);

/// Mutable state scoped to a single `resolve_legs` call.
struct Run<'a> {
    throttle: Throttle,
    /// Legs by coordinates; ids are rewritten on every hit.
    cache: HashMap<(CoordKey, CoordKey), Leg>,
    cancel: &'a CancellationToken,
    deadline: Option<Instant>,
    deadline_passed: bool,
    calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Start,
    Regular,
    End,
}

struct Node<'a> {
    id: &'a StopId,
    coordinates: Coordinates,
    role: Role,
}

pub struct DistanceProvider<B> {
    backend: B,
    options: ProviderOptions,
}

impl<B: RouteBackend> DistanceProvider<B> {
    pub fn new(backend: B, options: ProviderOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Resolves every leg the sequencer may ask for.
    ///
    /// Stops without valid coordinates are ignored. With fewer than two
    /// usable nodes the matrix is empty. Legs into the start anchor and out
    /// of the end anchor are never resolved, nor is the direct
    /// start-to-end leg when there are stops between them.
    ///
    /// Once `deadline` passes, remaining pairs are estimated without
    /// calling the backend. Cancellation aborts with
    /// [`OptimizeError::Cancelled`].
    pub fn resolve_legs(
        &self,
        stops: &[Stop],
        anchors: &Anchors,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<DistanceMatrix, OptimizeError> {
        let nodes = collect_nodes(stops, anchors);
        let mut matrix = DistanceMatrix::new();
        if nodes.len() < 2 {
            return Ok(matrix);
        }

        let has_regular = nodes.iter().any(|node| node.role == Role::Regular);
        let mut run = Run {
            throttle: Throttle::new(self.options.call_interval),
            cache: HashMap::new(),
            cancel,
            deadline,
            deadline_passed: false,
            calls: 0,
        };

        for (i, from) in nodes.iter().enumerate() {
            for (j, to) in nodes.iter().enumerate() {
                if i == j || !leg_needed(from.role, to.role, has_regular) {
                    continue;
                }
                let leg = self.resolve_pair(&mut run, from, to)?;
                matrix.insert(leg);
            }
        }

        let estimated = matrix.legs().filter(|leg| leg.is_estimated()).count();
        info!(
            nodes = nodes.len(),
            legs = matrix.len(),
            backend_calls = run.calls,
            estimated,
            deadline_passed = run.deadline_passed,
            "resolved distance matrix"
        );

        Ok(matrix)
    }

    fn resolve_pair(&self, run: &mut Run<'_>, from: &Node<'_>, to: &Node<'_>) -> Result<Leg, OptimizeError> {
        let (from_id, to_id) = (from.id.clone(), to.id.clone());
        let (from_key, to_key) = (from.coordinates.key(), to.coordinates.key());
        if from_key == to_key {
            return Ok(Leg::measured(from_id, to_id, 0, 0));
        }

        if let Some(leg) = run.cache.get(&(from_key, to_key)) {
            debug!(from = %from_id, to = %to_id, "route cache hit");
            return Ok(Leg {
                from: from_id,
                to: to_id,
                ..leg.clone()
            });
        }
        if self.options.symmetric {
            if let Some(leg) = run.cache.get(&(to_key, from_key)) {
                debug!(from = %from_id, to = %to_id, "route cache hit (reverse direction)");
                return Ok(Leg {
                    from: from_id,
                    to: to_id,
                    ..leg.reversed()
                });
            }
        }

        let leg = self.fetch(run, from, to)?;
        run.cache.insert((from_key, to_key), leg.clone());
        Ok(leg)
    }

    fn fetch(&self, run: &mut Run<'_>, from: &Node<'_>, to: &Node<'_>) -> Result<Leg, OptimizeError> {
        let waypoints = [from.coordinates, to.coordinates];
        if run.deadline_passed {
            return Ok(self.estimate(from, to));
        }

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let backoff = self
                    .options
                    .retry_backoff
                    .saturating_mul(2u32.saturating_pow(attempt - 1));
                match sleep_interruptibly(backoff, run.cancel, run.deadline) {
                    WaitOutcome::Ready => {}
                    WaitOutcome::Cancelled => return Err(OptimizeError::Cancelled),
                    WaitOutcome::DeadlinePassed => {
                        run.deadline_passed = true;
                        break;
                    }
                }
            }

            match run.throttle.acquire(run.cancel, run.deadline) {
                WaitOutcome::Ready => {}
                WaitOutcome::Cancelled => return Err(OptimizeError::Cancelled),
                WaitOutcome::DeadlinePassed => {
                    run.deadline_passed = true;
                    break;
                }
            }

            run.calls += 1;
            let response = self.backend.route(&waypoints);
            if run.cancel.is_cancelled() {
                return Err(OptimizeError::Cancelled);
            }

            match response {
                Ok(summary) => {
                    debug!(from = %from.id, to = %to.id, duration = summary.duration_seconds, "route resolved");
                    return Ok(Leg {
                        polyline: summary.geometry,
                        steps: summary.steps,
                        ..Leg::measured(
                            from.id.clone(),
                            to.id.clone(),
                            summary.distance_meters.round() as u32,
                            summary.duration_seconds.round() as u32,
                        )
                    });
                }
                Err(err) => {
                    warn!(from = %from.id, to = %to.id, attempt, error = %err, "routing backend call failed");
                }
            }
        }

        if run.deadline_passed {
            warn!(from = %from.id, to = %to.id, "optimization deadline passed, estimating remaining legs");
        } else {
            warn!(from = %from.id, to = %to.id, "routing backend unavailable, using great-circle estimate");
        }
        Ok(self.estimate(from, to))
    }

    fn estimate(&self, from: &Node<'_>, to: &Node<'_>) -> Leg {
        let (distance_meters, duration_seconds) = self.options.fallback.estimate(from.coordinates, to.coordinates);
        Leg {
            polyline: Some(Polyline::new(vec![from.coordinates, to.coordinates])),
            ..Leg::estimated(from.id.clone(), to.id.clone(), distance_meters, duration_seconds)
        }
    }
}

fn collect_nodes<'a>(stops: &'a [Stop], anchors: &'a Anchors) -> Vec<Node<'a>> {
    let start = anchors.start.iter().map(|stop| (stop, Role::Start));
    let regular = stops.iter().map(|stop| (stop, Role::Regular));
    let end = anchors.end.iter().map(|stop| (stop, Role::End));

    start
        .chain(regular)
        .chain(end)
        .filter_map(|(stop, role)| {
            stop.coordinates
                .filter(Coordinates::is_valid)
                .map(|coordinates| Node {
                    id: &stop.id,
                    coordinates,
                    role,
                })
        })
        .collect()
}

fn leg_needed(from: Role, to: Role, has_regular: bool) -> bool {
    match (from, to) {
        (_, Role::Start) | (Role::End, _) => false,
        (Role::Start, Role::End) => !has_regular,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::RoutingError;
    use crate::traits::RouteSummary;

    /// Backend that answers with Manhattan-ish costs and records calls.
    struct RecordingBackend {
        calls: RefCell<Vec<(Coordinates, Coordinates)>>,
        fail: bool,
    }

    impl RecordingBackend {
        fn new(fail: bool) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail,
            }
        }
    }

    impl RouteBackend for RecordingBackend {
        fn route(&self, waypoints: &[Coordinates]) -> Result<RouteSummary, RoutingError> {
            let (from, to) = (waypoints[0], waypoints[1]);
            self.calls.borrow_mut().push((from, to));
            if self.fail {
                return Err(RoutingError::Status {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            let units = (from.lon - to.lon).abs() + (from.lat - to.lat).abs();
            Ok(RouteSummary {
                distance_meters: units * 1000.0,
                duration_seconds: units * 60.0,
                geometry: Some(Polyline::new(vec![from, to])),
                steps: Vec::new(),
            })
        }
    }

    fn fast_options() -> ProviderOptions {
        ProviderOptions::default()
            .with_call_interval(Duration::ZERO)
            .with_retry_backoff(Duration::ZERO)
    }

    fn stops(points: &[(&str, f64, f64)]) -> Vec<Stop> {
        points
            .iter()
            .map(|(id, lon, lat)| Stop::new(*id, *id, Coordinates::new(*lon, *lat)))
            .collect()
    }

    #[test]
    fn test_fewer_than_two_stops_gives_empty_matrix() {
        let provider = DistanceProvider::new(RecordingBackend::new(false), fast_options());
        let matrix = provider
            .resolve_legs(&stops(&[("a", 0.0, 0.0)]), &Anchors::none(), &CancellationToken::new(), None)
            .unwrap();
        assert!(matrix.is_empty());
        assert!(provider.backend.calls.borrow().is_empty());
    }

    #[test]
    fn test_symmetric_pairs_resolved_once() {
        let backend = RecordingBackend::new(false);
        let provider = DistanceProvider::new(&backend, fast_options());
        let input = stops(&[("a", 0.0, 0.0), ("b", 1.0, 0.0), ("c", 2.0, 0.0)]);
        let matrix = provider
            .resolve_legs(&input, &Anchors::none(), &CancellationToken::new(), None)
            .unwrap();

        assert_eq!(matrix.len(), 6);
        assert_eq!(backend.calls.borrow().len(), 3);
        let ab = matrix.get(&StopId::new("a"), &StopId::new("b")).unwrap();
        let ba = matrix.get(&StopId::new("b"), &StopId::new("a")).unwrap();
        assert_eq!(ab.duration_seconds, 60);
        assert_eq!(ba.duration_seconds, 60);
        assert_eq!(ba.from, StopId::new("b"));
        let geometry = ba.polyline.as_ref().unwrap();
        assert_eq!(geometry.points()[0], Coordinates::new(1.0, 0.0));
        assert_eq!(geometry, &ab.polyline.as_ref().unwrap().reversed());
        assert!(!matrix.is_degraded());
    }

    #[test]
    fn test_asymmetric_requests_both_directions() {
        let backend = RecordingBackend::new(false);
        let provider = DistanceProvider::new(&backend, fast_options().with_symmetric(false));
        let input = stops(&[("a", 0.0, 0.0), ("b", 1.0, 0.0)]);
        provider
            .resolve_legs(&input, &Anchors::none(), &CancellationToken::new(), None)
            .unwrap();
        assert_eq!(backend.calls.borrow().len(), 2);
    }

    #[test]
    fn test_identical_coordinates_skip_backend() {
        let backend = RecordingBackend::new(false);
        let provider = DistanceProvider::new(&backend, fast_options());
        let input = stops(&[("a", 0.0, 0.0), ("b", 0.0, 0.0)]);
        let matrix = provider
            .resolve_legs(&input, &Anchors::none(), &CancellationToken::new(), None)
            .unwrap();
        assert!(backend.calls.borrow().is_empty());
        assert_eq!(matrix.get(&StopId::new("a"), &StopId::new("b")).unwrap().duration_seconds, 0);
    }

    #[test]
    fn test_anchor_legs_pruned() {
        let backend = RecordingBackend::new(false);
        let provider = DistanceProvider::new(&backend, fast_options().with_symmetric(false));
        let anchors = Anchors::both(
            Stop::anchor("start", "Start", Coordinates::new(0.0, 0.0)),
            Stop::anchor("end", "End", Coordinates::new(5.0, 0.0)),
        );
        let input = stops(&[("a", 1.0, 0.0), ("b", 2.0, 0.0)]);
        let matrix = provider
            .resolve_legs(&input, &anchors, &CancellationToken::new(), None)
            .unwrap();

        let start = StopId::new("start");
        let end = StopId::new("end");
        let a = StopId::new("a");
        assert!(matrix.get(&start, &a).is_some());
        assert!(matrix.get(&a, &end).is_some());
        assert!(matrix.get(&a, &start).is_none());
        assert!(matrix.get(&end, &a).is_none());
        assert!(matrix.get(&start, &end).is_none());
        // start→a, start→b, a→b, b→a, a→end, b→end
        assert_eq!(matrix.len(), 6);
    }

    #[test]
    fn test_failures_degrade_to_estimates() {
        let backend = RecordingBackend::new(true);
        let provider = DistanceProvider::new(&backend, fast_options().with_max_retries(2));
        let input = stops(&[("a", 0.0, 0.0), ("b", 0.0, 1.0)]);
        let matrix = provider
            .resolve_legs(&input, &Anchors::none(), &CancellationToken::new(), None)
            .unwrap();

        // one pair, three attempts
        assert_eq!(backend.calls.borrow().len(), 3);
        let leg = matrix.get(&StopId::new("a"), &StopId::new("b")).unwrap();
        assert!(leg.is_estimated());
        assert!((leg.distance_meters as i64 - 111_195).abs() < 10);
        assert!(matrix.is_degraded());
    }

    #[test]
    fn test_cancelled_before_start() {
        let provider = DistanceProvider::new(RecordingBackend::new(false), fast_options());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = provider.resolve_legs(
            &stops(&[("a", 0.0, 0.0), ("b", 1.0, 0.0)]),
            &Anchors::none(),
            &cancel,
            None,
        );
        assert_eq!(result.unwrap_err(), OptimizeError::Cancelled);
    }

    #[test]
    fn test_expired_deadline_estimates_everything() {
        let backend = RecordingBackend::new(false);
        let provider = DistanceProvider::new(&backend, fast_options());
        let deadline = Instant::now() - Duration::from_secs(1);
        let matrix = provider
            .resolve_legs(
                &stops(&[("a", 0.0, 0.0), ("b", 1.0, 0.0), ("c", 2.0, 0.0)]),
                &Anchors::none(),
                &CancellationToken::new(),
                Some(deadline),
            )
            .unwrap();
        assert!(backend.calls.borrow().is_empty());
        assert_eq!(matrix.len(), 6);
        assert!(matrix.legs().all(Leg::is_estimated));
    }

    #[test]
    fn test_invalid_coordinates_ignored() {
        let backend = RecordingBackend::new(false);
        let provider = DistanceProvider::new(&backend, fast_options());
        let input = stops(&[("a", 0.0, 0.0), ("bad", 200.0, 0.0), ("b", 1.0, 0.0)]);
        let matrix = provider
            .resolve_legs(&input, &Anchors::none(), &CancellationToken::new(), None)
            .unwrap();
        assert_eq!(matrix.len(), 2);
        assert!(matrix.get(&StopId::new("a"), &StopId::new("bad")).is_none());
    }
}
