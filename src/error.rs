//! Error types surfaced by the optimizer.
//!
//! Routing failures are recovered inside the distance provider; only
//! cancellation and stale applies reach the caller.

use thiserror::Error;

use crate::model::StopId;

/// A single failed call to the routing backend.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("routing backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed routing response: {0}")]
    Malformed(String),

    /// The backend answered but found no route (e.g. `NoRoute`, `NoSegment`).
    #[error("no route found: {0}")]
    NoRoute(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    #[error("optimization cancelled")]
    Cancelled,
}

/// The itinerary's place set changed after the result was computed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("itinerary changed since optimization (added: {added:?}, removed: {removed:?}); re-optimize before applying")]
pub struct ApplyConflict {
    pub added: Vec<StopId>,
    pub removed: Vec<StopId>,
}
