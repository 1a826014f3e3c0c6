//! Wall-clock timeline for an ordered day route.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::matrix::DistanceMatrix;
use crate::model::{OpenWindow, Stop, StopId};
use crate::warning::{Warning, WarningKind};

#[derive(Debug, Clone)]
pub struct TimelineOptions {
    /// Latest acceptable final departure. A time earlier than `day_start`
    /// is taken to be on the following day. `None` means midnight at the
    /// end of the starting day.
    pub day_end: Option<NaiveTime>,
    /// Visit length for regular stops that don't specify one.
    pub default_visit_minutes: u32,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            day_end: None,
            default_visit_minutes: 60,
        }
    }
}

impl TimelineOptions {
    pub fn with_day_end(mut self, day_end: NaiveTime) -> Self {
        self.day_end = Some(day_end);
        self
    }

    pub fn with_default_visit_minutes(mut self, minutes: u32) -> Self {
        self.default_visit_minutes = minutes;
        self
    }

    /// Visit minutes for a stop; anchors default to zero.
    pub fn visit_minutes(&self, stop: &Stop) -> u32 {
        match stop.visit_duration {
            Some(minutes) => minutes,
            None if stop.is_anchor() => 0,
            None => self.default_visit_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stop_id: StopId,
    pub name: String,
    pub arrival_time: NaiveDateTime,
    pub departure_time: NaiveDateTime,
    /// Minutes spent at the stop.
    pub visit_duration: u32,
}

/// Walks `order` once, accumulating travel and visit time from
/// `day_start`.
///
/// Time-window violations are reported, never corrected: an early
/// arrival is flagged rather than padded with waiting time. Legs missing
/// from the matrix count as zero travel time.
pub fn build_timeline(
    order: &[Stop],
    matrix: &DistanceMatrix,
    day_start: NaiveDateTime,
    options: &TimelineOptions,
) -> (Vec<TimelineEntry>, Vec<Warning>) {
    let mut entries: Vec<TimelineEntry> = Vec::with_capacity(order.len());
    let mut warnings = Vec::new();
    let mut clock = day_start;

    for (index, stop) in order.iter().enumerate() {
        if index > 0 {
            let previous = &order[index - 1];
            if let Some(leg) = matrix.get(&previous.id, &stop.id) {
                clock += TimeDelta::seconds(i64::from(leg.duration_seconds));
                if leg.is_estimated() {
                    warnings.push(Warning::new(
                        stop.id.clone(),
                        WarningKind::EstimatedDistanceUsed,
                        format!(
                            "travel from {} to {} is estimated; routing service unavailable for this leg",
                            previous.name, stop.name
                        ),
                    ));
                }
            }
        }

        let visit_duration = options.visit_minutes(stop);
        let arrival_time = clock;
        let departure_time = arrival_time + TimeDelta::minutes(i64::from(visit_duration));

        if let Some(window) = stop.open_window {
            check_window(stop, window, day_start, arrival_time, departure_time, &mut warnings);
        }

        entries.push(TimelineEntry {
            stop_id: stop.id.clone(),
            name: stop.name.clone(),
            arrival_time,
            departure_time,
            visit_duration,
        });
        clock = departure_time;
    }

    if let Some(last) = entries.last() {
        let cutoff = day_cutoff(day_start, options.day_end);
        if last.departure_time > cutoff {
            warnings.push(Warning::new(
                last.stop_id.clone(),
                WarningKind::DayOverrun,
                format!(
                    "day ends at {} but the last departure is {}",
                    cutoff.format("%Y-%m-%d %H:%M"),
                    last.departure_time.format("%Y-%m-%d %H:%M")
                ),
            ));
        }
    }

    (entries, warnings)
}

fn check_window(
    stop: &Stop,
    window: OpenWindow,
    day_start: NaiveDateTime,
    arrival: NaiveDateTime,
    departure: NaiveDateTime,
    warnings: &mut Vec<Warning>,
) {
    let date = day_start.date();
    let opens = date.and_time(window.earliest);
    let mut closes = date.and_time(window.latest);
    // Windows such as 18:00-02:00 close on the following day.
    if closes < opens {
        closes += TimeDelta::days(1);
    }

    if arrival < opens {
        warnings.push(Warning::new(
            stop.id.clone(),
            WarningKind::ArrivedBeforeOpen,
            format!(
                "arrives at {} before {} opens at {}",
                arrival.format("%H:%M"),
                stop.name,
                window.earliest.format("%H:%M")
            ),
        ));
    }
    if arrival > closes {
        warnings.push(Warning::new(
            stop.id.clone(),
            WarningKind::ArrivedAfterClose,
            format!(
                "arrives at {} after {} closes at {}",
                arrival.format("%H:%M"),
                stop.name,
                window.latest.format("%H:%M")
            ),
        ));
    }
    if departure > closes {
        warnings.push(Warning::new(
            stop.id.clone(),
            WarningKind::DepartedAfterClose,
            format!(
                "leaves {} at {}, after closing at {}",
                stop.name,
                departure.format("%H:%M"),
                window.latest.format("%H:%M")
            ),
        ));
    }
}

fn day_cutoff(day_start: NaiveDateTime, day_end: Option<NaiveTime>) -> NaiveDateTime {
    match day_end {
        // An end earlier than the start, e.g. 02:00 for an evening tour,
        // falls on the following day.
        Some(end) if end < day_start.time() => day_start.date().and_time(end) + TimeDelta::days(1),
        Some(end) => day_start.date().and_time(end),
        None => day_start.date().and_time(NaiveTime::MIN) + TimeDelta::days(1),
    }
}
