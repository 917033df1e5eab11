use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::{CacheStats, CacheStore, CacheSummary};
use crate::clock::Clock;
use crate::config::{Config, ProviderKind};
use crate::usage::{
    CostPlan, NullMeter, PeriodUsageMeter, QuotaPlan, UsageMeter, UsagePlan, UsageSummary,
    UsageWarning,
};

pub mod cached;
pub mod google;
pub mod yelp;

pub use cached::{CachingBusinessClient, CachingPlacesClient, Memoizer};
pub use google::GoogleMapsClient;
pub use yelp::YelpClient;

/// Raw upstream response. Never interpreted by the caching layer.
pub type Payload = Value;

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Read a `{"lat": .., "lng": ..}` object as found in geocoding results
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            lat: value.get("lat")?.as_f64()?,
            lng: value.get("lng")?.as_f64()?,
        })
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Origin or destination of a route: an address or coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoint {
    Address(String),
    Coordinates(LatLng),
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waypoint::Address(address) => f.write_str(address),
            Waypoint::Coordinates(point) => write!(f, "{}", point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

impl FromStr for TravelMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "driving" => Ok(TravelMode::Driving),
            "walking" => Ok(TravelMode::Walking),
            "bicycling" => Ok(TravelMode::Bicycling),
            "transit" => Ok(TravelMode::Transit),
            other => bail!("Unknown travel mode: {}", other),
        }
    }
}

/// Nearby search around a point
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySearch {
    pub location: LatLng,
    pub radius: u32,
    pub place_type: Option<String>,
    pub keyword: Option<String>,
}

impl NearbySearch {
    pub fn restaurants(location: LatLng, radius: u32) -> Self {
        Self {
            location,
            radius,
            place_type: Some("restaurant".to_string()),
            keyword: None,
        }
    }

    pub fn with_keyword(mut self, keyword: Option<String>) -> Self {
        self.keyword = keyword;
        self
    }
}

/// Free-text place search, optionally biased to a circle
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub query: String,
    pub location: Option<LatLng>,
    pub radius: Option<u32>,
}

/// Business search filters. Unset filters are not sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessSearch {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub term: Option<String>,
    pub categories: Option<String>,
    pub radius: Option<u32>,
    pub limit: u32,
    pub sort_by: String,
    pub price: Option<String>,
    pub open_now: Option<bool>,
    pub attributes: Option<String>,
}

impl Default for BusinessSearch {
    fn default() -> Self {
        Self {
            location: None,
            latitude: None,
            longitude: None,
            term: None,
            categories: None,
            radius: None,
            limit: 10,
            sort_by: "best_match".to_string(),
            price: None,
            open_now: None,
            attributes: None,
        }
    }
}

impl BusinessSearch {
    /// Query parameters as sent upstream, skipping unset filters
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(location) = &self.location {
            params.push(("location", location.clone()));
        }
        if let Some(latitude) = self.latitude {
            params.push(("latitude", latitude.to_string()));
        }
        if let Some(longitude) = self.longitude {
            params.push(("longitude", longitude.to_string()));
        }
        if let Some(term) = &self.term {
            params.push(("term", term.clone()));
        }
        if let Some(categories) = &self.categories {
            params.push(("categories", categories.clone()));
        }
        if let Some(radius) = self.radius {
            params.push(("radius", radius.to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        params.push(("sort_by", self.sort_by.clone()));
        if let Some(price) = &self.price {
            params.push(("price", price.clone()));
        }
        if let Some(open_now) = self.open_now {
            params.push(("open_now", open_now.to_string()));
        }
        if let Some(attributes) = &self.attributes {
            params.push(("attributes", attributes.clone()));
        }
        params
    }

    /// Upstream parameters as a JSON object, for cache keys
    pub fn to_params(&self) -> Map<String, Value> {
        self.query_params()
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value)))
            .collect()
    }
}

/// Geocoding, places, and routing operations
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Payload>;

    async fn places_nearby(&self, request: &NearbySearch) -> Result<Payload>;

    async fn text_search(&self, request: &TextSearch) -> Result<Payload>;

    async fn place_details(&self, place_id: &str, fields: &[&str]) -> Result<Payload>;

    async fn directions(&self, origin: &str, destination: &str, mode: TravelMode) -> Result<Payload>;

    async fn distance_matrix(
        &self,
        origins: &[Waypoint],
        destinations: &[Waypoint],
        mode: TravelMode,
    ) -> Result<Payload>;
}

/// Business search and review operations
#[async_trait]
pub trait BusinessProvider: Send + Sync {
    async fn search(&self, request: &BusinessSearch) -> Result<Payload>;

    async fn business_details(&self, business_id: &str) -> Result<Payload>;

    async fn reviews(&self, business_id: &str, limit: u32) -> Result<Payload>;
}

/// Cache performance and free-tier consumption for one provider
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub cache: CacheSummary,
    pub usage: UsageSummary,
    pub warning: Option<UsageWarning>,
}

impl UsageReport {
    pub fn collect(cache: CacheStats, meter: &dyn UsageMeter) -> Result<Self> {
        Ok(Self {
            cache: cache.summary(),
            usage: meter.summary()?,
            warning: meter.warning()?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}

/// Anything that can report its cache and usage statistics
pub trait UsageReporter: Send + Sync {
    fn usage_report(&self) -> Result<UsageReport>;
}

/// Open the response cache for a provider
pub fn open_cache(config: &Config, kind: ProviderKind, clock: Arc<dyn Clock>) -> Result<Arc<CacheStore>> {
    let paths = config.provider_paths(kind)?;
    let ttl = std::time::Duration::from_secs(config.cache.ttl_secs);
    Ok(Arc::new(CacheStore::open(paths.cache_dir, ttl, clock)?))
}

/// Open the usage meter for a provider, or a [`NullMeter`] when tracking is off
pub fn open_meter(config: &Config, kind: ProviderKind, clock: Arc<dyn Clock>) -> Result<Arc<dyn UsageMeter>> {
    if !config.usage.enabled {
        return Ok(Arc::new(NullMeter));
    }

    let paths = config.provider_paths(kind)?;
    let plan = match kind {
        ProviderKind::Google => UsagePlan::MeteredCost(
            CostPlan::google_maps().with_monthly_credit(config.google.monthly_credit),
        ),
        ProviderKind::Yelp => UsagePlan::DailyQuota(QuotaPlan {
            daily_limit: config.yelp.daily_limit,
        }),
    };

    Ok(Arc::new(PeriodUsageMeter::open(paths.usage_file, plan, clock)?))
}

/// Build the caching Google Maps client described by `config`
pub fn create_places_client(config: &Config, clock: Arc<dyn Clock>) -> Result<CachingPlacesClient> {
    let api_key = config.api_key(ProviderKind::Google)?;
    let inner = GoogleMapsClient::new(api_key, config.google.base_url.clone())?;
    let memo = Memoizer::new(
        open_cache(config, ProviderKind::Google, clock.clone())?,
        open_meter(config, ProviderKind::Google, clock)?,
    );

    tracing::info!(
        "Google Maps client ready (cache ttl={}s, usage tracking={})",
        config.cache.ttl_secs,
        config.usage.enabled
    );
    Ok(CachingPlacesClient::new(Box::new(inner), memo))
}

/// Build the caching Yelp client described by `config`
pub fn create_business_client(config: &Config, clock: Arc<dyn Clock>) -> Result<CachingBusinessClient> {
    let api_key = config.api_key(ProviderKind::Yelp)?;
    let inner = YelpClient::new(api_key, config.yelp.base_url.clone())?;
    let memo = Memoizer::new(
        open_cache(config, ProviderKind::Yelp, clock.clone())?,
        open_meter(config, ProviderKind::Yelp, clock)?,
    );

    tracing::info!(
        "Yelp client ready (cache ttl={}s, usage tracking={})",
        config.cache.ttl_secs,
        config.usage.enabled
    );
    Ok(CachingBusinessClient::new(Box::new(inner), memo))
}
