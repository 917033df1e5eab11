use chrono::{Local, TimeZone};
use mockito::{Matcher, Mock, ServerGuard};
use restaurant_finder::clock::ManualClock;
use restaurant_finder::config::{Config, ProviderKind};
use restaurant_finder::providers::{CachingBusinessClient, CachingPlacesClient, Memoizer};
use restaurant_finder::providers::{GoogleMapsClient, YelpClient};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_KEY: &str = "test-key";

/// Temporary cache root plus a config whose provider URLs point at `server`
pub struct TestEnvironment {
    pub cache_dir: TempDir,
    pub config: Config,
    pub clock: Arc<ManualClock>,
}

impl TestEnvironment {
    pub fn new(server: &ServerGuard) -> Self {
        let cache_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.cache.directory = Some(cache_dir.path().to_path_buf());
        config.google.api_key = Some(TEST_KEY.to_string());
        config.google.base_url = Some(server.url());
        config.yelp.api_key = Some(TEST_KEY.to_string());
        config.yelp.base_url = Some(server.url());

        let start = Local.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();

        Self {
            cache_dir,
            config,
            clock: Arc::new(ManualClock::new(start)),
        }
    }

    /// Caching Google client wired like `serve` does, but on the manual clock
    pub fn places_client(&self) -> CachingPlacesClient {
        let inner = GoogleMapsClient::new(TEST_KEY.to_string(), self.config.google.base_url.clone())
            .expect("Failed to build client");
        CachingPlacesClient::new(Box::new(inner), self.memoizer(ProviderKind::Google))
    }

    pub fn business_client(&self) -> CachingBusinessClient {
        let inner = YelpClient::new(TEST_KEY.to_string(), self.config.yelp.base_url.clone())
            .expect("Failed to build client");
        CachingBusinessClient::new(Box::new(inner), self.memoizer(ProviderKind::Yelp))
    }

    fn memoizer(&self, kind: ProviderKind) -> Memoizer {
        let cache = restaurant_finder::providers::open_cache(&self.config, kind, self.clock.clone())
            .expect("Failed to open cache");
        let meter = restaurant_finder::providers::open_meter(&self.config, kind, self.clock.clone())
            .expect("Failed to open meter");
        Memoizer::new(cache, meter)
    }
}

/// Mock a Google Maps endpoint returning `body` for requests carrying the test key
pub async fn mock_google(server: &mut ServerGuard, endpoint: &str, query: Vec<Matcher>, body: &str) -> Mock {
    let mut matchers = vec![Matcher::UrlEncoded("key".into(), TEST_KEY.into())];
    matchers.extend(query);

    server
        .mock("GET", format!("/{}/json", endpoint).as_str())
        .match_query(Matcher::AllOf(matchers))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

pub const TIMES_SQUARE_GEOCODE: &str = r#"{
    "status": "OK",
    "results": [{
        "formatted_address": "Manhattan, NY 10036, USA",
        "geometry": {"location": {"lat": 40.758, "lng": -73.9855}}
    }]
}"#;

pub const NEARBY_RESULTS: &str = r#"{
    "status": "OK",
    "results": [
        {"place_id": "p1", "name": "Joe's Pizza", "rating": 4.6, "price_level": 1, "types": ["restaurant", "pizza_restaurant", "food"]},
        {"place_id": "p2", "name": "Le Fancy", "rating": 4.8, "price_level": 4, "types": ["restaurant", "french_restaurant"]},
        {"place_id": "p3", "name": "Meh Diner", "rating": 3.1, "price_level": 2, "types": ["restaurant"]}
    ]
}"#;

pub const JOES_DETAILS: &str = r#"{
    "status": "OK",
    "result": {
        "name": "Joe's Pizza",
        "rating": 4.6,
        "user_ratings_total": 10234,
        "price_level": 1,
        "vicinity": "1435 Broadway, New York",
        "url": "https://maps.google.com/?cid=1",
        "reviews": [
            {"author_name": "Sam", "rating": 5, "text": "Best slice in town", "relative_time_description": "a week ago"},
            {"author_name": "Alex", "rating": 2, "text": "Long line", "relative_time_description": "a month ago"}
        ]
    }
}"#;
