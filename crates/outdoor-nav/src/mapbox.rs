//! Mapbox walking directions and geocoding

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::{debug, info};
use crate::config::OutdoorConfig;
use crate::{Coordinates, Geocoder, NavError, RouteStep, RoutingProvider};

const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    maneuver: Maneuver,
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct Maneuver {
    instruction: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Steps of the first leg of the first route
fn parse_route(body: &str) -> Result<Vec<RouteStep>, NavError> {
    let response: DirectionsResponse =
        serde_json::from_str(body).map_err(|e| NavError::Malformed(e.to_string()))?;

    let route = response.routes.into_iter().next().ok_or(NavError::NoRoute)?;
    let leg = route
        .legs
        .into_iter()
        .next()
        .ok_or_else(|| NavError::Malformed("route has no legs".to_string()))?;

    Ok(leg
        .steps
        .into_iter()
        .map(|s| RouteStep {
            instruction: s.maneuver.instruction,
            distance_m: s.distance,
        })
        .collect())
}

/// Coordinates of the best geocoding match
fn parse_geocoding(address: &str, body: &str) -> Result<Coordinates, NavError> {
    let response: GeocodingResponse =
        serde_json::from_str(body).map_err(|e| NavError::Malformed(e.to_string()))?;

    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or_else(|| NavError::NoMatch(address.to_string()))?;

    match feature.geometry.coordinates.as_slice() {
        [longitude, latitude, ..] => Ok(Coordinates::new(*longitude, *latitude)),
        _ => Err(NavError::Malformed("feature without coordinates".to_string())),
    }
}

/// Read a response body, turning non-success statuses into errors
pub(crate) async fn checked_body(response: Response) -> Result<String, NavError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let mut body = body;
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(NavError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Mapbox REST client
#[derive(Debug, Clone)]
pub struct MapboxClient {
    client: Client,
    token: String,
    directions_url: Url,
    geocoding_url: Url,
}

impl MapboxClient {
    pub fn new(config: &OutdoorConfig) -> Result<Self, NavError> {
        let token = config.resolve_token().ok_or(NavError::MissingToken)?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            token,
            directions_url: parse_base(&config.directions_url)?,
            geocoding_url: parse_base(&config.geocoding_url)?,
        })
    }

    fn with_segment(base: &Url, segment: &str) -> Result<Url, NavError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| NavError::Malformed(format!("{} cannot be a base URL", base)))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }
}

fn parse_base(raw: &str) -> Result<Url, NavError> {
    Url::parse(raw).map_err(|e| NavError::Malformed(format!("invalid URL {}: {}", raw, e)))
}

#[async_trait]
impl RoutingProvider for MapboxClient {
    async fn route(&self, origin: Coordinates, destination: Coordinates) -> Result<Vec<RouteStep>, NavError> {
        let url = Self::with_segment(&self.directions_url, &format!("{};{}", origin, destination))?;
        debug!("Requesting walking route {} -> {}", origin, destination);

        let response = self
            .client
            .get(url)
            .query(&[
                ("access_token", self.token.as_str()),
                ("geometries", "geojson"),
                ("overview", "full"),
                ("steps", "true"),
            ])
            .send()
            .await?;

        let steps = parse_route(&checked_body(response).await?)?;
        info!("Route {} -> {} has {} steps", origin, destination, steps.len());
        Ok(steps)
    }
}

#[async_trait]
impl Geocoder for MapboxClient {
    async fn locate(&self, address: &str) -> Result<Coordinates, NavError> {
        let url = Self::with_segment(&self.geocoding_url, &format!("{}.json", address))?;

        let response = self
            .client
            .get(url)
            .query(&[("access_token", self.token.as_str())])
            .send()
            .await?;

        let coordinates = parse_geocoding(address, &checked_body(response).await?)?;
        info!("Geocoded {:?} to {}", address, coordinates);
        Ok(coordinates)
    }
}
