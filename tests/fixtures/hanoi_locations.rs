//! Real Hanoi locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. All points are routable with
//! the OSRM Vietnam extract.

use day_route::{Coordinates, Stop};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub const fn new(id: &'static str, name: &'static str, lon: f64, lat: f64) -> Self {
        Self { id, name, lon, lat }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lon, self.lat)
    }

    pub fn stop(&self) -> Stop {
        Stop::new(self.id, self.name, self.coords())
    }

    pub fn anchor(&self) -> Stop {
        Stop::anchor(self.id, self.name, self.coords())
    }
}

// ============================================================================
// Lodging (good for start/end anchors)
// ============================================================================

pub const HOTELS: &[Location] = &[
    Location::new("metropole", "Sofitel Legend Metropole", 105.8560, 21.0257),
    Location::new("hilton-opera", "Hilton Hanoi Opera", 105.8583, 21.0240),
    Location::new("lotte", "Lotte Hotel Hanoi", 105.8129, 21.0318),
];

// ============================================================================
// Old Quarter / Hoan Kiem
// ============================================================================

pub const OLD_QUARTER: &[Location] = &[
    Location::new("hoan-kiem", "Hoan Kiem Lake", 105.8523, 21.0287),
    Location::new("cathedral", "St. Joseph's Cathedral", 105.8489, 21.0287),
    Location::new("dong-xuan", "Dong Xuan Market", 105.8497, 21.0385),
    Location::new("hoa-lo", "Hoa Lo Prison", 105.8466, 21.0253),
    Location::new("opera-house", "Hanoi Opera House", 105.8576, 21.0245),
    Location::new("long-bien", "Long Bien Bridge", 105.8600, 21.0430),
];

// ============================================================================
// Ba Dinh / West Lake
// ============================================================================

pub const BA_DINH: &[Location] = &[
    Location::new("temple-literature", "Temple of Literature", 105.8355, 21.0284),
    Location::new("mausoleum", "Ho Chi Minh Mausoleum", 105.8346, 21.0368),
    Location::new("one-pillar", "One Pillar Pagoda", 105.8336, 21.0359),
    Location::new("tran-quoc", "Tran Quoc Pagoda", 105.8368, 21.0479),
    Location::new("ethnology", "Vietnam Museum of Ethnology", 105.7986, 21.0405),
];

/// A typical sightseeing day, deliberately listed in a poor order.
pub fn sightseeing_day() -> Vec<Location> {
    vec![
        OLD_QUARTER[0].clone(),
        BA_DINH[0].clone(),
        OLD_QUARTER[2].clone(),
        BA_DINH[4].clone(),
        OLD_QUARTER[3].clone(),
        BA_DINH[3].clone(),
        OLD_QUARTER[4].clone(),
    ]
}
