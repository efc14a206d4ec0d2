// service/route_provider.rs
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

use crate::{
    config::Config,
    models::requestmodel::Polyline,
    utils::geo::{validate_polyline, Coordinates},
};

const PROVIDER_TIMEOUT_SECS: u64 = 8;
const USER_AGENT: &str = "kashta-dispatch/0.1";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSummary {
    /// `[lat, lng]` pairs from origin to destination.
    pub polyline: Polyline,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl RouteSummary {
    pub fn eta_minutes(&self) -> i32 {
        (self.duration_seconds.max(0.0) / 60.0).ceil() as i32
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Route provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No result for {0}")]
    NoResult(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait RouteProvider: Send + Sync + fmt::Debug {
    async fn geocode(&self, query: &str) -> Result<Coordinates, RouteError>;

    async fn route(&self, from: Coordinates, to: Coordinates) -> Result<RouteSummary, RouteError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: `[lng, lat]`.
    coordinates: Vec<[f64; 2]>,
}

/// OSRM for driving routes, Nominatim for free-text geocoding.
#[derive(Debug, Clone)]
pub struct OsrmRouteProvider {
    client: reqwest::Client,
    routing_base_url: String,
    geocoding_base_url: String,
}

impl OsrmRouteProvider {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            routing_base_url: config.routing_base_url.trim_end_matches('/').to_string(),
            geocoding_base_url: config.geocoding_base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn route_from_osrm(response: OsrmResponse) -> Result<RouteSummary, RouteError> {
    if response.code != "Ok" {
        return Err(RouteError::InvalidResponse(response.code));
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::NoResult("route".to_string()))?;

    let swapped: Vec<[f64; 2]> = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| [*lat, *lng])
        .collect();
    let polyline = validate_polyline(&swapped)
        .ok_or_else(|| RouteError::InvalidResponse("invalid geometry".to_string()))?;

    Ok(RouteSummary {
        polyline,
        distance_meters: route.distance,
        duration_seconds: route.duration,
    })
}

#[async_trait]
impl RouteProvider for OsrmRouteProvider {
    async fn geocode(&self, query: &str) -> Result<Coordinates, RouteError> {
        let url = format!(
            "{}/search?format=json&limit=1&countrycodes=sa&q={}",
            self.geocoding_base_url,
            urlencoding::encode(query.trim())
        );

        let places: Vec<NominatimPlace> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| RouteError::NoResult(query.to_string()))?;

        let lat = place.lat.parse::<f64>().ok();
        let lng = place.lon.parse::<f64>().ok();
        Coordinates::from_pair(lat, lng)
            .ok_or_else(|| RouteError::InvalidResponse(format!("{},{}", place.lat, place.lon)))
    }

    async fn route(&self, from: Coordinates, to: Coordinates) -> Result<RouteSummary, RouteError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.routing_base_url, from.lng, from.lat, to.lng, to.lat
        );

        let response: OsrmResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        route_from_osrm(response)
    }
}
