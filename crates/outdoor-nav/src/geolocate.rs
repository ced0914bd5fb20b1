//! IP-based geolocation

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use crate::config::OutdoorConfig;
use crate::mapbox::checked_body;
use crate::{Coordinates, Geolocator, NavError};

#[derive(Debug, Deserialize)]
struct IpLocation {
    loc: Option<String>,
}

/// Parse an ipinfo-style body (`"loc": "lat,lng"`)
fn parse_location(body: &str) -> Result<Coordinates, NavError> {
    let location: IpLocation =
        serde_json::from_str(body).map_err(|e| NavError::Malformed(e.to_string()))?;
    let loc = location
        .loc
        .ok_or_else(|| NavError::Malformed("response has no loc field".to_string()))?;

    let parsed = loc
        .split_once(',')
        .and_then(|(lat, lng)| Some((lat.trim().parse::<f64>().ok()?, lng.trim().parse::<f64>().ok()?)));

    match parsed {
        Some((latitude, longitude)) => Ok(Coordinates::new(longitude, latitude)),
        None => Err(NavError::Malformed(format!("unparseable loc {:?}", loc))),
    }
}

/// Approximate current position from the public IP address
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(config: &OutdoorConfig) -> Result<Self, NavError> {
        Ok(Self {
            client: Client::builder().timeout(config.request_timeout()).build()?,
            url: config.geolocation_url.clone(),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current(&self) -> Result<Coordinates, NavError> {
        let response = self.client.get(&self.url).send().await?;
        let coordinates = parse_location(&checked_body(response).await?)?;
        debug!("Current location {}", coordinates);
        Ok(coordinates)
    }
}
