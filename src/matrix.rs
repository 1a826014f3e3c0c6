//! Resolved travel costs for one optimization run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::StopId;
use crate::polyline::Polyline;
use crate::traits::RouteStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegQuality {
    /// Answered by the routing backend.
    Measured,
    /// Great-circle fallback.
    Estimated,
}

/// Directed travel cost between two stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub from: StopId,
    pub to: StopId,
    pub distance_meters: u32,
    pub duration_seconds: u32,
    pub polyline: Option<Polyline>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<RouteStep>,
    pub quality: LegQuality,
}

impl Leg {
    pub fn measured(from: StopId, to: StopId, distance_meters: u32, duration_seconds: u32) -> Self {
        Self {
            from,
            to,
            distance_meters,
            duration_seconds,
            polyline: None,
            steps: Vec::new(),
            quality: LegQuality::Measured,
        }
    }

    pub fn estimated(from: StopId, to: StopId, distance_meters: u32, duration_seconds: u32) -> Self {
        Self {
            quality: LegQuality::Estimated,
            ..Self::measured(from, to, distance_meters, duration_seconds)
        }
    }

    pub fn is_estimated(&self) -> bool {
        self.quality == LegQuality::Estimated
    }

    /// The same leg travelled the other way. Steps describe a single
    /// direction, so they are dropped.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
            polyline: self.polyline.as_ref().map(Polyline::reversed),
            steps: Vec::new(),
            quality: self.quality,
        }
    }
}

/// Legs keyed by ordered `(from, to)` stop ids.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    legs: HashMap<(StopId, StopId), Leg>,
}

impl DistanceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, leg: Leg) {
        self.legs.insert((leg.from.clone(), leg.to.clone()), leg);
    }

    pub fn get(&self, from: &StopId, to: &StopId) -> Option<&Leg> {
        self.legs.get(&(from.clone(), to.clone()))
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.values()
    }

    /// True if any leg is a fallback estimate.
    pub fn is_degraded(&self) -> bool {
        self.legs.values().any(Leg::is_estimated)
    }

    /// Travel seconds along a path; a missing leg makes the path unusable.
    pub fn path_cost(&self, path: &[StopId]) -> u64 {
        path.windows(2).fold(0u64, |total, pair| {
            match self.get(&pair[0], &pair[1]) {
                Some(leg) => total.saturating_add(u64::from(leg.duration_seconds)),
                None => u64::MAX,
            }
        })
    }
}

impl FromIterator<Leg> for DistanceMatrix {
    fn from_iter<I: IntoIterator<Item = Leg>>(iter: I) -> Self {
        let mut matrix = Self::new();
        for leg in iter {
            matrix.insert(leg);
        }
        matrix
    }
}
