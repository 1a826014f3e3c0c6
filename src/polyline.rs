//! Route geometry for a single leg.
//!
//! The routing backend returns geometries as GeoJSON LineStrings
//! (`[[lon, lat], ...]`). They are decoded once at the boundary and kept
//! as coordinate sequences so the caller can draw the leg.

use serde::{Deserialize, Serialize};

use crate::model::Coordinates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinates>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinates>) -> Self {
        Self { points }
    }

    /// Builds a polyline from GeoJSON LineString positions.
    ///
    /// Positions with fewer than two components are skipped; any altitude
    /// component is ignored.
    pub fn from_geojson(positions: &[Vec<f64>]) -> Self {
        let points = positions
            .iter()
            .filter(|position| position.len() >= 2)
            .map(|position| Coordinates::new(position[0], position[1]))
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[Coordinates] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The same geometry walked in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    pub fn into_points(self) -> Vec<Coordinates> {
        self.points
    }
}
