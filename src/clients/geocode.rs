use anyhow::{anyhow, Result};
use async_trait::async_trait;
use isahc::{AsyncReadResponseExt, HttpClient};
use serde::Deserialize;

use crate::{clients::Geocoder, schema::db::GeoPoint};

#[derive(Deserialize, Debug)]
struct GeocodeResult {
    formatted_address: String,
}

#[derive(Deserialize, Debug)]
struct GeocodeReply {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

/// Reverse geocoding through the Google Maps Geocoding API.
pub struct GoogleGeocoder {
    client: HttpClient,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(GoogleGeocoder {
            client: HttpClient::new()?,
            api_key: api_key.to_string(),
        })
    }
}

fn first_address(reply: GeocodeReply) -> Result<Option<String>> {
    match reply.status.as_str() {
        "OK" => Ok(reply.results.into_iter().next().map(|r| r.formatted_address)),
        "ZERO_RESULTS" => Ok(None),
        other => Err(anyhow!("geocoder returned {other}")),
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>> {
        let mut response = self
            .client
            .get_async(format!(
                "https://maps.googleapis.com/maps/api/geocode/json?latlng={},{}&key={}",
                point.latitude, point.longitude, self.api_key
            ))
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("geocoder returned {}", response.status()));
        }
        first_address(response.json().await?)
    }
}
