//! Google Maps Platform client
//!
//! Thin wrapper over the web service endpoints the restaurant tools need:
//! Geocoding, Places (nearby, text search, details), Directions and the
//! Distance Matrix. Responses are returned as raw JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{NearbySearch, Payload, PlacesProvider, TextSearch, TravelMode, Waypoint};

const GOOGLE_MAPS_API_URL: &str = "https://maps.googleapis.com/maps/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GoogleMapsClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleMapsClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| GOOGLE_MAPS_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    /// GET `{base}/{endpoint}/json` and check the body's `status` field
    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}/json", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Google Maps ({})", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("Google Maps API error ({}): {}", status, error_text);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Google Maps response")?;

        match body.get("status").and_then(Value::as_str) {
            None | Some("OK") | Some("ZERO_RESULTS") => Ok(body),
            Some(status) => {
                let message = body
                    .get("error_message")
                    .and_then(Value::as_str)
                    .unwrap_or("no error message");
                anyhow::bail!("Google Maps API error ({}): {}", status, message)
            }
        }
    }
}

fn join_waypoints(points: &[Waypoint]) -> String {
    points
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

fn take_array(mut body: Value, field: &str) -> Value {
    match body.get_mut(field) {
        Some(items) => items.take(),
        None => Value::Array(Vec::new()),
    }
}

#[async_trait]
impl PlacesProvider for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<Payload> {
        let body = self
            .get("geocode", &[("address", address.to_string())])
            .await?;
        Ok(take_array(body, "results"))
    }

    async fn places_nearby(&self, request: &NearbySearch) -> Result<Payload> {
        let mut query = vec![
            ("location", request.location.to_string()),
            ("radius", request.radius.to_string()),
        ];
        if let Some(place_type) = &request.place_type {
            query.push(("type", place_type.clone()));
        }
        if let Some(keyword) = &request.keyword {
            query.push(("keyword", keyword.clone()));
        }

        self.get("place/nearbysearch", &query).await
    }

    async fn text_search(&self, request: &TextSearch) -> Result<Payload> {
        let mut query = vec![("query", request.query.clone())];
        if let Some(location) = request.location {
            query.push(("location", location.to_string()));
        }
        if let Some(radius) = request.radius {
            query.push(("radius", radius.to_string()));
        }

        self.get("place/textsearch", &query).await
    }

    async fn place_details(&self, place_id: &str, fields: &[&str]) -> Result<Payload> {
        let mut query = vec![("place_id", place_id.to_string())];
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }

        self.get("place/details", &query).await
    }

    async fn directions(&self, origin: &str, destination: &str, mode: TravelMode) -> Result<Payload> {
        let query = [
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("mode", mode.as_str().to_string()),
        ];

        let body = self.get("directions", &query).await?;
        Ok(take_array(body, "routes"))
    }

    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        mode: TravelMode,
    ) -> Result<Payload> {
        let query = [
            ("origins", join_waypoints(origins)),
            ("destinations", join_waypoints(destinations)),
            ("mode", mode.as_str().to_string()),
        ];

        self.get("distancematrix", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LatLng;
    use serde_json::json;

    #[test]
    fn test_waypoints_are_pipe_joined() {
        let points = vec![
            Waypoint::Address("Times Square".to_string()),
            Waypoint::Coordinates(LatLng::new(40.5, -73.25)),
        ];
        assert_eq!(join_waypoints(&points), "Times Square|40.5,-73.25");
    }

    #[test]
    fn test_take_array_defaults_to_empty() {
        assert_eq!(take_array(json!({"results": [1, 2]}), "results"), json!([1, 2]));
        assert_eq!(take_array(json!({"status": "OK"}), "routes"), json!([]));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            GoogleMapsClient::new("k".to_string(), Some("http://localhost:1234/".to_string())).unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
