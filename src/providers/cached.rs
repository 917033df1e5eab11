//! Caching wrappers for provider clients
//!
//! These decorators implement the provider traits by wrapping another client.
//! Every call is keyed on a canonical parameter record, answered from the
//! cache when possible, and metered only when it actually reaches upstream.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use super::{
    BusinessProvider, BusinessSearch, NearbySearch, Payload, PlacesProvider, TextSearch,
    TravelMode, UsageReport, UsageReporter, Waypoint,
};
use crate::cache::{CacheStats, CacheStore};
use crate::usage::UsageMeter;

/// Shared cache-then-call-then-meter glue
#[derive(Clone)]
pub struct Memoizer {
    cache: Arc<CacheStore>,
    meter: Arc<dyn UsageMeter>,
}

impl Memoizer {
    pub fn new(cache: Arc<CacheStore>, meter: Arc<dyn UsageMeter>) -> Self {
        Self { cache, meter }
    }

    /// Answer `operation` from the cache, or run `fetch` and remember its result.
    ///
    /// `weight` is the number of billable units one upstream call consumes.
    /// Failed fetches are neither cached nor metered. Once a fetch succeeds its
    /// payload is returned even if it cannot be metered or cached.
    pub async fn call<F, Fut>(&self, operation: &str, params: Value, weight: u64, fetch: F) -> Result<Payload>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload>>,
    {
        if let Some(cached) = self.cache.lookup(operation, &params)? {
            tracing::debug!("Cache hit for {}", operation);
            return Ok(cached);
        }

        tracing::debug!("Cache miss for {}, calling provider", operation);
        let payload = fetch().await?;

        // The upstream call is billed at this point; a local write failure must not lose it
        if let Err(e) = self.meter.record(operation, weight) {
            tracing::warn!("Failed to record usage for {}: {:#}", operation, e);
        }
        if let Err(e) = self.cache.store(operation, &params, &payload) {
            tracing::warn!("Failed to cache {} response: {:#}", operation, e);
        }

        Ok(payload)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.clear()
    }

    pub fn clear_old_cache(&self, max_age_days: u64) -> Result<usize> {
        self.cache.clear_older_than(max_age_days)
    }

    pub fn report(&self) -> Result<UsageReport> {
        UsageReport::collect(self.cache.stats(), self.meter.as_ref())
    }
}

/// A caching wrapper for any places provider
pub struct CachingPlacesClient {
    inner: Box<dyn PlacesProvider>,
    memo: Memoizer,
}

impl CachingPlacesClient {
    pub fn new(inner: Box<dyn PlacesProvider>, memo: Memoizer) -> Self {
        Self { inner, memo }
    }

    pub fn memo(&self) -> &Memoizer {
        &self.memo
    }
}

#[async_trait]
impl PlacesProvider for CachingPlacesClient {
    async fn geocode(&self, address: &str) -> Result<Payload> {
        let params = json!({ "address": address });
        self.memo
            .call("geocode", params, 1, || self.inner.geocode(address))
            .await
    }

    async fn places_nearby(&self, request: &NearbySearch) -> Result<Payload> {
        let params = json!({
            "location": request.location.to_string(),
            "radius": request.radius,
            "type": request.place_type,
            "keyword": request.keyword,
        });
        self.memo
            .call("places_nearby", params, 1, || self.inner.places_nearby(request))
            .await
    }

    async fn text_search(&self, request: &TextSearch) -> Result<Payload> {
        let params = json!({
            "query": request.query,
            "location": request.location.map(|point| point.to_string()),
            "radius": request.radius,
        });
        self.memo
            .call("places_search", params, 1, || self.inner.text_search(request))
            .await
    }

    async fn place_details(&self, place_id: &str, fields: &[&str]) -> Result<Payload> {
        let mut sorted = fields.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let fields_param = if sorted.is_empty() {
            None
        } else {
            Some(sorted.join(","))
        };

        let params = json!({ "place_id": place_id, "fields": fields_param });
        self.memo
            .call("place_details", params, 1, || self.inner.place_details(place_id, fields))
            .await
    }

    async fn directions(&self, origin: &str, destination: &str, mode: TravelMode) -> Result<Payload> {
        let params = json!({
            "origin": origin,
            "destination": destination,
            "mode": mode.as_str(),
        });
        self.memo
            .call("directions", params, 1, || self.inner.directions(origin, destination, mode))
            .await
    }

    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        mode: TravelMode,
    ) -> Result<Payload> {
        let params = json!({
            "origins": origins.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "destinations": destinations.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "mode": mode.as_str(),
        });
        // Billed per element of the matrix
        let elements = (origins.len() * destinations.len()) as u64;
        self.memo
            .call("distance_matrix", params, elements, || {
                self.inner.distance_matrix(origins, destinations, mode)
            })
            .await
    }
}

impl UsageReporter for CachingPlacesClient {
    fn usage_report(&self) -> Result<UsageReport> {
        self.memo.report()
    }
}

/// A caching wrapper for any business-search provider
pub struct CachingBusinessClient {
    inner: Box<dyn BusinessProvider>,
    memo: Memoizer,
}

impl CachingBusinessClient {
    pub fn new(inner: Box<dyn BusinessProvider>, memo: Memoizer) -> Self {
        Self { inner, memo }
    }

    pub fn memo(&self) -> &Memoizer {
        &self.memo
    }
}

#[async_trait]
impl BusinessProvider for CachingBusinessClient {
    async fn search(&self, request: &BusinessSearch) -> Result<Payload> {
        let mut params = request.to_params();
        params.insert("endpoint".to_string(), json!("businesses/search"));
        self.memo
            .call("business_search", Value::Object(params), 1, || self.inner.search(request))
            .await
    }

    async fn business_details(&self, business_id: &str) -> Result<Payload> {
        let params = json!({ "endpoint": format!("businesses/{}", business_id) });
        self.memo
            .call("business_details", params, 1, || self.inner.business_details(business_id))
            .await
    }

    async fn reviews(&self, business_id: &str, limit: u32) -> Result<Payload> {
        let params = json!({
            "endpoint": format!("businesses/{}/reviews", business_id),
            "limit": limit,
        });
        self.memo
            .call("business_reviews", params, 1, || self.inner.reviews(business_id, limit))
            .await
    }
}

impl UsageReporter for CachingBusinessClient {
    fn usage_report(&self) -> Result<UsageReport> {
        self.memo.report()
    }
}
