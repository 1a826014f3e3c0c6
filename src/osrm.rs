//! OSRM HTTP adapter for point-to-point routes.

use serde::Deserialize;
use tracing::debug;

use crate::error::RoutingError;
use crate::model::Coordinates;
use crate::polyline::Polyline;
use crate::traits::{RouteBackend, RouteStep, RouteSummary};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Reads `OSRM_BASE_URL`, `OSRM_PROFILE` and `OSRM_TIMEOUT_SECS`,
    /// keeping defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OsrmConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("OSRM_BASE_URL").unwrap_or(defaults.base_url),
            profile: lookup("OSRM_PROFILE").unwrap_or(defaults.profile),
            timeout_secs: lookup("OSRM_TIMEOUT_SECS")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Route service URL for the given waypoints.
    pub fn route_url(&self, waypoints: &[Coordinates]) -> String {
        let coords = waypoints
            .iter()
            .map(Coordinates::to_string)
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson&steps=true",
            self.base_url.trim_end_matches('/'),
            self.profile,
            coords
        )
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }
}

impl RouteBackend for OsrmClient {
    fn route(&self, waypoints: &[Coordinates]) -> Result<RouteSummary, RoutingError> {
        if waypoints.len() < 2 {
            return Err(RoutingError::Malformed(format!(
                "route needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }

        let url = self.config.route_url(waypoints);
        debug!(%url, "requesting OSRM route");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(RoutingError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        parse_route_response(&body)
    }
}

/// Parses an OSRM `route` service response body.
pub fn parse_route_response(body: &str) -> Result<RouteSummary, RoutingError> {
    let parsed: OsrmRouteResponse =
        serde_json::from_str(body).map_err(|err| RoutingError::Malformed(err.to_string()))?;

    if parsed.code != "Ok" {
        return Err(RoutingError::NoRoute(
            parsed.message.unwrap_or(parsed.code),
        ));
    }

    let route = parsed
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::Malformed("response contains no routes".to_string()))?;

    if !route.distance.is_finite() || !route.duration.is_finite() || route.distance < 0.0 || route.duration < 0.0 {
        return Err(RoutingError::Malformed(format!(
            "invalid route totals: distance={} duration={}",
            route.distance, route.duration
        )));
    }

    let geometry = route
        .geometry
        .map(|geometry| Polyline::from_geojson(&geometry.coordinates));

    let steps = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| RouteStep {
            maneuver: step.maneuver.kind,
            modifier: step.maneuver.modifier,
            name: step.name,
            distance_meters: step.distance,
            duration_seconds: step.duration,
        })
        .collect();

    Ok(RouteSummary {
        distance_meters: route.distance,
        duration_seconds: route.duration,
        geometry,
        steps,
    })
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Option<OsrmGeometry>,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: String,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
}
