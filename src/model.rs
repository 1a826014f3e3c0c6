//! Stop model shared by the provider, sequencer and timeline builder.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A WGS84 position. Longitude first, matching the routing backend's
/// `lon,lat` wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinates {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Rounded key used to recognise identical positions.
    pub(crate) fn key(&self) -> (i64, i64) {
        (
            (self.lon * 1e6).round() as i64,
            (self.lat * 1e6).round() as i64,
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lon, self.lat)
    }
}

/// Identifier of a stop, stable within one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Wall-clock interval during which a stop can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    /// Earliest acceptable arrival.
    pub earliest: NaiveTime,
    /// Latest acceptable departure.
    pub latest: NaiveTime,
}

impl OpenWindow {
    pub fn new(earliest: NaiveTime, latest: NaiveTime) -> Self {
        Self { earliest, latest }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopKind {
    Regular,
    Anchor,
}

/// One waypoint of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub coordinates: Option<Coordinates>,
    /// Minutes spent at the stop. `None` falls back to the timeline default
    /// for regular stops and to zero for anchors.
    pub visit_duration: Option<u32>,
    pub open_window: Option<OpenWindow>,
    pub kind: StopKind,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: StopId::new(id),
            name: name.into(),
            coordinates: Some(coordinates),
            visit_duration: None,
            open_window: None,
            kind: StopKind::Regular,
        }
    }

    /// An anchor stop (lodging, station) with no visit duration.
    pub fn anchor(id: impl Into<String>, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            kind: StopKind::Anchor,
            ..Self::new(id, name, coordinates)
        }
    }

    pub fn with_visit_duration(mut self, minutes: u32) -> Self {
        self.visit_duration = Some(minutes);
        self
    }

    pub fn with_open_window(mut self, earliest: NaiveTime, latest: NaiveTime) -> Self {
        self.open_window = Some(OpenWindow::new(earliest, latest));
        self
    }

    pub fn is_anchor(&self) -> bool {
        self.kind == StopKind::Anchor
    }
}

/// Optional fixed endpoints of the day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Anchors {
    pub start: Option<Stop>,
    pub end: Option<Stop>,
}

impl Anchors {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn start(stop: Stop) -> Self {
        Self {
            start: Some(stop),
            end: None,
        }
    }

    pub fn both(start: Stop, end: Stop) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn with_end(mut self, stop: Stop) -> Self {
        self.end = Some(stop);
        self
    }
}
