//! Non-fatal findings reported alongside an optimized route.

use serde::{Deserialize, Serialize};

use crate::model::StopId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    ArrivedBeforeOpen,
    ArrivedAfterClose,
    DepartedAfterClose,
    /// The leg into this stop is a great-circle estimate.
    EstimatedDistanceUsed,
    DayOverrun,
    /// Excluded: coordinates outside WGS84 ranges.
    InvalidCoordinate,
    /// Excluded: no coordinates at all.
    MissingCoordinates,
    /// Excluded: id already used by an earlier stop.
    DuplicateStop,
    /// No leg was resolved into this stop.
    MissingLeg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub stop_id: StopId,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(stop_id: StopId, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            stop_id,
            kind,
            message: message.into(),
        }
    }
}
