//! Day-route optimization: resolve legs, sequence, build the timeline.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OptimizeError;
use crate::itinerary::DayItinerary;
use crate::matrix::Leg;
use crate::model::{Anchors, Stop, StopId, StopKind};
use crate::provider::{DistanceProvider, ProviderOptions};
use crate::solver::{SequenceOptions, sequence};
use crate::throttle::CancellationToken;
use crate::timeline::{TimelineEntry, TimelineOptions, build_timeline};
use crate::traits::RouteBackend;
use crate::warning::{Warning, WarningKind};

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub provider: ProviderOptions,
    pub sequence: SequenceOptions,
    pub timeline: TimelineOptions,
    /// Overall budget for one optimization. When it runs out, legs not yet
    /// resolved are estimated instead of requested.
    pub deadline: Option<Duration>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            provider: ProviderOptions::default(),
            sequence: SequenceOptions::default(),
            timeline: TimelineOptions::default(),
            deadline: Some(Duration::from_secs(90)),
        }
    }
}

impl OptimizeOptions {
    pub fn with_provider(mut self, provider: ProviderOptions) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_sequence(mut self, sequence: SequenceOptions) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_timeline(mut self, timeline: TimelineOptions) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedStop {
    pub id: StopId,
    pub name: String,
    /// Fixed start/end supplied by the caller rather than the itinerary.
    pub anchor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub order: Vec<OrderedStop>,
    pub total_distance_meters: u64,
    pub total_duration_seconds: u64,
    pub timeline: Vec<TimelineEntry>,
    pub warnings: Vec<Warning>,
    /// True if any resolved leg is a great-circle estimate.
    pub degraded: bool,
    /// Stops left out of the route (bad or missing coordinates, duplicates).
    pub excluded: Vec<StopId>,
    /// Consecutive legs along `order`.
    pub legs: Vec<Leg>,
    /// Sorted ids of the stops the result was computed from.
    pub place_snapshot: Vec<StopId>,
}

impl OptimizationResult {
    pub fn order_ids(&self) -> Vec<&str> {
        self.order.iter().map(|stop| stop.id.as_str()).collect()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |warning| warning.kind == kind)
    }
}

pub struct RouteOptimizer<B> {
    provider: DistanceProvider<B>,
    options: OptimizeOptions,
}

impl<B: RouteBackend> RouteOptimizer<B> {
    pub fn new(backend: B, options: OptimizeOptions) -> Self {
        Self {
            provider: DistanceProvider::new(backend, options.provider.clone()),
            options,
        }
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    /// Optimizes the place entries of a day itinerary.
    pub fn optimize_itinerary(
        &self,
        itinerary: &DayItinerary,
        anchors: &Anchors,
        day_start: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<Option<OptimizationResult>, OptimizeError> {
        self.optimize_day_route(&itinerary.stops(), anchors, day_start, cancel)
    }

    /// Computes a visiting order and timeline for one day.
    ///
    /// `stops` are treated as regular stops whatever their `kind`; fixed
    /// endpoints come from `anchors`. Returns `Ok(None)` when fewer than
    /// two usable stops (anchors included) remain after filtering.
    ///
    /// Routing failures degrade the result rather than failing it. Only
    /// cancellation is an error, and a cancelled run never yields a
    /// partial result.
    pub fn optimize_day_route(
        &self,
        stops: &[Stop],
        anchors: &Anchors,
        day_start: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<Option<OptimizationResult>, OptimizeError> {
        let mut warnings = Vec::new();
        let mut excluded = Vec::new();
        let mut seen = HashSet::new();

        let start = anchors
            .start
            .as_ref()
            .filter(|stop| admit(stop, &mut seen, &mut warnings))
            .map(as_anchor);
        // A round trip ends at the lodging it started from, so the end
        // anchor is only checked against regular stops, not the start.
        let end = anchors
            .end
            .as_ref()
            .filter(|stop| admit(stop, &mut HashSet::new(), &mut warnings))
            .map(as_anchor);
        if let Some(end) = &end {
            seen.insert(end.id.clone());
        }
        let anchors = Anchors { start, end };

        let usable: Vec<Stop> = stops
            .iter()
            .filter(|stop| {
                let keep = admit(stop, &mut seen, &mut warnings);
                if !keep {
                    excluded.push(stop.id.clone());
                }
                keep
            })
            .map(|stop| Stop {
                kind: StopKind::Regular,
                ..stop.clone()
            })
            .collect();

        let node_count = usable.len()
            + usize::from(anchors.start.is_some())
            + usize::from(anchors.end.is_some());
        if node_count < 2 {
            debug!(node_count, "nothing to optimize");
            return Ok(None);
        }

        // A budget too large to represent is no deadline at all.
        let deadline = self
            .options
            .deadline
            .and_then(|budget| Instant::now().checked_add(budget));
        let matrix = self.provider.resolve_legs(&usable, &anchors, cancel, deadline)?;
        if cancel.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }

        let sequenced = sequence(&usable, &matrix, &anchors, &self.options.sequence);
        for (from, to) in &sequenced.missing_legs {
            warnings.push(Warning::new(
                to.clone(),
                WarningKind::MissingLeg,
                format!("no travel data from {from} to {to}; leg counted as zero"),
            ));
        }

        let (timeline, timeline_warnings) =
            build_timeline(&sequenced.order, &matrix, day_start, &self.options.timeline);
        warnings.extend(timeline_warnings);

        let legs: Vec<Leg> = sequenced
            .order
            .windows(2)
            .filter_map(|pair| matrix.get(&pair[0].id, &pair[1].id).cloned())
            .collect();
        let total_distance_meters: u64 = legs.iter().map(|leg| u64::from(leg.distance_meters)).sum();
        let total_duration_seconds: u64 = legs.iter().map(|leg| u64::from(leg.duration_seconds)).sum();

        let mut place_snapshot: Vec<StopId> = stops.iter().map(|stop| stop.id.clone()).collect();
        place_snapshot.sort();

        let result = OptimizationResult {
            order: sequenced
                .order
                .iter()
                .map(|stop| OrderedStop {
                    id: stop.id.clone(),
                    name: stop.name.clone(),
                    anchor: stop.is_anchor(),
                })
                .collect(),
            total_distance_meters,
            total_duration_seconds,
            timeline,
            warnings,
            degraded: matrix.is_degraded(),
            excluded,
            legs,
            place_snapshot,
        };

        info!(
            stops = result.order.len(),
            excluded = result.excluded.len(),
            total_duration_seconds = result.total_duration_seconds,
            total_distance_meters = result.total_distance_meters,
            warnings = result.warnings.len(),
            degraded = result.degraded,
            "optimized day route"
        );

        Ok(Some(result))
    }
}

/// Accepts a stop into the run, recording why it was turned away.
fn admit(stop: &Stop, seen: &mut HashSet<StopId>, warnings: &mut Vec<Warning>) -> bool {
    let rejection = match stop.coordinates {
        None => Some((
            WarningKind::MissingCoordinates,
            format!("{} has no coordinates and was left out of the route", stop.name),
        )),
        Some(coordinates) if !coordinates.is_valid() => Some((
            WarningKind::InvalidCoordinate,
            format!(
                "{} has invalid coordinates ({}) and was left out of the route",
                stop.name, coordinates
            ),
        )),
        Some(_) if seen.contains(&stop.id) => Some((
            WarningKind::DuplicateStop,
            format!("{} repeats id {} and was left out of the route", stop.name, stop.id),
        )),
        Some(_) => None,
    };

    match rejection {
        Some((kind, message)) => {
            warn!(stop = %stop.id, ?kind, "excluding stop from optimization");
            warnings.push(Warning::new(stop.id.clone(), kind, message));
            false
        }
        None => {
            seen.insert(stop.id.clone());
            true
        }
    }
}

fn as_anchor(stop: &Stop) -> Stop {
    Stop {
        kind: StopKind::Anchor,
        ..stop.clone()
    }
}
