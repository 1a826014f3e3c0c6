//! Day itinerary entries and applying an optimized order back to them.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApplyConflict;
use crate::model::{Coordinates, OpenWindow, Stop, StopId, StopKind};
use crate::optimizer::OptimizationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: StopId,
    pub name: String,
    pub coordinates: Option<Coordinates>,
    /// Planned visit length in minutes.
    pub visit_duration: Option<u32>,
    pub open_window: Option<OpenWindow>,
}

impl Place {
    pub fn to_stop(&self) -> Stop {
        Stop {
            id: self.id.clone(),
            name: self.name.clone(),
            coordinates: self.coordinates,
            visit_duration: self.visit_duration,
            open_window: self.open_window,
            kind: StopKind::Regular,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// One entry of a day, as stored by the itinerary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entry {
    Note {
        id: String,
        text: String,
    },
    Checklist {
        id: String,
        title: String,
        items: Vec<ChecklistItem>,
    },
    Place(Place),
}

impl Entry {
    pub fn as_place(&self) -> Option<&Place> {
        match self {
            Entry::Place(place) => Some(place),
            Entry::Note { .. } | Entry::Checklist { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayItinerary {
    pub entries: Vec<Entry>,
}

impl DayItinerary {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.entries.iter().filter_map(Entry::as_place)
    }

    /// Snapshot of the place entries as stops, in itinerary order.
    pub fn stops(&self) -> Vec<Stop> {
        self.places().map(Place::to_stop).collect()
    }
}

/// Reorders the place entries of `itinerary` to follow `result.order`.
///
/// Only the positions held by optimized places are rewritten; notes,
/// checklists and places left out of the optimization stay where they
/// are. Anchors are not itinerary entries and are skipped. Applying the
/// same result twice gives the same itinerary.
///
/// Fails with [`ApplyConflict`] if places were added or removed since the
/// result was computed.
pub fn apply_optimized_route(
    itinerary: &DayItinerary,
    result: &OptimizationResult,
) -> Result<DayItinerary, ApplyConflict> {
    check_snapshot(itinerary, &result.place_snapshot)?;

    let optimized: Vec<&StopId> = result
        .order
        .iter()
        .filter(|stop| !stop.anchor)
        .map(|stop| &stop.id)
        .collect();
    let wanted: HashSet<&StopId> = optimized.iter().copied().collect();

    let mut places: HashMap<&StopId, &Place> = HashMap::new();
    let mut slots = Vec::with_capacity(optimized.len());
    for (index, entry) in itinerary.entries.iter().enumerate() {
        let Entry::Place(place) = entry else {
            continue;
        };
        if wanted.contains(&place.id) && !places.contains_key(&place.id) {
            places.insert(&place.id, place);
            slots.push(index);
        }
    }

    let mut entries = itinerary.entries.clone();
    for (slot, id) in slots.into_iter().zip(optimized) {
        if let Some(place) = places.get(id) {
            entries[slot] = Entry::Place((*place).clone());
        }
    }

    debug!(places = places.len(), entries = entries.len(), "applied optimized route");
    Ok(DayItinerary { entries })
}

fn check_snapshot(itinerary: &DayItinerary, snapshot: &[StopId]) -> Result<(), ApplyConflict> {
    let mut balance: BTreeMap<&StopId, i64> = BTreeMap::new();
    for place in itinerary.places() {
        *balance.entry(&place.id).or_default() += 1;
    }
    for id in snapshot {
        *balance.entry(id).or_default() -= 1;
    }

    let added: Vec<StopId> = balance
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(id, _)| (*id).clone())
        .collect();
    let removed: Vec<StopId> = balance
        .iter()
        .filter(|(_, count)| **count < 0)
        .map(|(id, _)| (*id).clone())
        .collect();

    if added.is_empty() && removed.is_empty() {
        Ok(())
    } else {
        Err(ApplyConflict { added, removed })
    }
}
