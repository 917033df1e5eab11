//! Yelp Fusion client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{BusinessProvider, BusinessSearch, Payload};

const YELP_API_URL: &str = "https://api.yelp.com/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct YelpClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl YelpClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| YELP_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Yelp ({})", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("Yelp API error ({}): {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse Yelp response")
    }
}

#[async_trait]
impl BusinessProvider for YelpClient {
    async fn search(&self, request: &BusinessSearch) -> Result<Payload> {
        self.get("businesses/search", &request.query_params()).await
    }

    async fn business_details(&self, business_id: &str) -> Result<Payload> {
        self.get(&format!("businesses/{}", business_id), &[]).await
    }

    async fn reviews(&self, business_id: &str, limit: u32) -> Result<Payload> {
        self.get(
            &format!("businesses/{}/reviews", business_id),
            &[("limit", limit.to_string())],
        )
        .await
    }
}
