//! Restaurant tools backed by a business-search provider

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::format::{
    display_address, field_or, format_hours, meters_to_miles, price_range, str_field,
    ReviewBuckets,
};
use super::{parse_args, Lookup, NotFound, Tool};
use crate::providers::{BusinessProvider, BusinessSearch};

/// Largest search radius the upstream accepts, in meters
const MAX_RADIUS: u32 = 40_000;
/// Largest page the upstream returns
const MAX_LIMIT: u32 = 50;
const REVIEWS_PER_DETAIL: u32 = 3;

fn default_radius() -> u32 {
    1500
}

fn default_max_results() -> u32 {
    10
}

fn default_alternatives_radius() -> u32 {
    1000
}

fn default_few_results() -> u32 {
    5
}

/// `"thai,restaurants"`, or just `"restaurants"`
fn restaurant_categories(cuisine: Option<&str>) -> String {
    match cuisine {
        Some(cuisine) => format!("{},restaurants", cuisine),
        None => "restaurants".to_string(),
    }
}

fn businesses(response: &Value) -> Vec<Value> {
    response
        .get("businesses")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn meets_rating(business: &Value, min_rating: f64) -> bool {
    business.get("rating").and_then(Value::as_f64).unwrap_or(0.0) >= min_rating
}

fn category_titles(business: &Value) -> Vec<Value> {
    business
        .get("categories")
        .and_then(Value::as_array)
        .map(|categories| categories.iter().map(|c| field_or(c, "title", Value::Null)).collect())
        .unwrap_or_default()
}

fn distance_display(business: &Value) -> String {
    match business.get("distance").and_then(Value::as_f64) {
        Some(meters) if meters > 0.0 => meters_to_miles(meters),
        _ => "N/A".to_string(),
    }
}

/// Restaurant cards straight from search results
fn summarize(businesses: &[Value]) -> Vec<Value> {
    businesses
        .iter()
        .map(|business| {
            json!({
                "name": field_or(business, "name", json!("Unknown")),
                "address": display_address(business),
                "rating": field_or(business, "rating", json!("N/A")),
                "total_ratings": field_or(business, "review_count", json!(0)),
                "price_level": field_or(business, "price", json!("N/A")),
                "cuisine_types": category_titles(business),
                "distance": distance_display(business),
                "phone": field_or(business, "display_phone", json!("N/A")),
                "yelp_url": field_or(business, "url", json!("N/A")),
                "is_closed": field_or(business, "is_closed", json!(false)),
            })
        })
        .collect()
}

fn format_review(review: &Value) -> Value {
    json!({
        "author": review.pointer("/user/name").cloned().unwrap_or_else(|| json!("Anonymous")),
        "rating": field_or(review, "rating", json!("N/A")),
        "text": str_field(review, "text").unwrap_or_default(),
        "time": str_field(review, "time_created").unwrap_or_default(),
    })
}

/// The best match for `name` in `location`
async fn find_business(business: &dyn BusinessProvider, name: &str, location: &str) -> Result<Lookup<Value>> {
    let request = BusinessSearch {
        term: Some(name.to_string()),
        location: Some(location.to_string()),
        limit: 1,
        ..Default::default()
    };
    let found = business.search(&request).await?;

    match found.pointer("/businesses/0") {
        Some(hit) => Ok(Ok(hit.clone())),
        None => Ok(Err(NotFound::restaurant(name))),
    }
}

fn business_id(business: &Value) -> &str {
    str_field(business, "id").unwrap_or_default()
}

fn restaurant_lookup_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "restaurant_name": {
                "type": "string",
                "description": "Name of the restaurant"
            },
            "location": {
                "type": "string",
                "description": "Location (e.g., 'New York, NY')"
            }
        },
        "required": ["restaurant_name", "location"]
    })
}

#[derive(Debug, Deserialize)]
struct RestaurantLookupParams {
    restaurant_name: String,
    location: String,
}

pub struct FindByLocationTool {
    business: Arc<dyn BusinessProvider>,
}

impl FindByLocationTool {
    pub fn new(business: Arc<dyn BusinessProvider>) -> Self {
        Self { business }
    }
}

#[derive(Debug, Deserialize)]
struct FindByLocationParams {
    location: String,
    #[serde(default = "default_radius")]
    radius: u32,
    #[serde(default = "default_max_results")]
    max_results: u32,
    #[serde(default)]
    min_rating: f64,
    #[serde(default)]
    cuisine_type: Option<String>,
    #[serde(default)]
    max_price: Option<u32>,
    #[serde(default)]
    open_now: bool,
}

#[async_trait]
impl Tool for FindByLocationTool {
    fn name(&self) -> &str {
        "find_restaurants_by_location"
    }

    fn description(&self) -> &str {
        "Find restaurants near a specific location using Yelp"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Location to search (e.g., 'New York, NY' or '123 Main St')"
                },
                "radius": {
                    "type": "integer",
                    "description": "Search radius in meters (default: 1500, max: 40000)",
                    "default": 1500
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results (default: 10, max: 50)",
                    "default": 10
                },
                "min_rating": {
                    "type": "number",
                    "description": "Minimum rating filter (0-5, default: 0)",
                    "default": 0
                },
                "cuisine_type": {
                    "type": "string",
                    "description": "Cuisine type (e.g., 'italian', 'chinese', 'mexican', 'japanese')"
                },
                "max_price": {
                    "type": "integer",
                    "description": "Maximum price level (1-4: 1=$, 2=$$, 3=$$$, 4=$$$$)"
                },
                "open_now": {
                    "type": "boolean",
                    "description": "Only show restaurants open now"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: FindByLocationParams = parse_args(self.name(), params)?;

        let request = BusinessSearch {
            location: Some(params.location),
            categories: Some(restaurant_categories(params.cuisine_type.as_deref())),
            radius: Some(params.radius.min(MAX_RADIUS)),
            limit: params.max_results.min(MAX_LIMIT),
            sort_by: "rating".to_string(),
            price: params.max_price.filter(|max| *max > 0).map(price_range),
            open_now: params.open_now.then_some(true),
            ..Default::default()
        };
        let found = self.business.search(&request).await?;

        let matches: Vec<Value> = businesses(&found)
            .into_iter()
            .filter(|b| params.min_rating <= 0.0 || meets_rating(b, params.min_rating))
            .take(params.max_results as usize)
            .collect();

        Ok(Value::Array(summarize(&matches)))
    }
}

pub struct RestaurantDetailsTool {
    business: Arc<dyn BusinessProvider>,
}

impl RestaurantDetailsTool {
    pub fn new(business: Arc<dyn BusinessProvider>) -> Self {
        Self { business }
    }
}

#[async_trait]
impl Tool for RestaurantDetailsTool {
    fn name(&self) -> &str {
        "get_restaurant_details"
    }

    fn description(&self) -> &str {
        "Get detailed information about a specific restaurant including reviews"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema()
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let provider = self.business.as_ref();

        let hit = match find_business(provider, &params.restaurant_name, &params.location).await? {
            Ok(hit) => hit,
            Err(miss) => return Ok(miss.into_value()),
        };
        let id = business_id(&hit);
        let details = provider.business_details(id).await?;

        // Review access is restricted on some plans; details stand on their own
        let reviews = match provider.reviews(id, REVIEWS_PER_DETAIL).await {
            Ok(body) => body
                .get("reviews")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!("Reviews unavailable for {}: {}", id, e);
                Vec::new()
            }
        };
        let buckets = ReviewBuckets::categorize(&reviews);
        let note = if reviews.is_empty() {
            json!("Reviews may not be available due to API restrictions")
        } else {
            Value::Null
        };

        Ok(json!({
            "name": field_or(&details, "name", json!("Unknown")),
            "address": display_address(&details),
            "phone": field_or(&details, "display_phone", json!("N/A")),
            "website": field_or(&details, "url", json!("N/A")),
            "rating": field_or(&details, "rating", json!("N/A")),
            "total_ratings": field_or(&details, "review_count", json!(0)),
            "price_level": field_or(&details, "price", json!("N/A")),
            "cuisine_types": category_titles(&details),
            "yelp_url": field_or(&details, "url", json!("N/A")),
            "hours": format_hours(details.get("hours")),
            "is_closed": field_or(&details, "is_closed", json!(false)),
            "review_summary": buckets.summary(),
            "good_reviews": buckets.good.iter().map(|r| format_review(r)).collect::<Vec<_>>(),
            "bad_reviews": buckets.bad.iter().map(|r| format_review(r)).collect::<Vec<_>>(),
            "neutral_reviews": buckets.neutral.iter().map(|r| format_review(r)).collect::<Vec<_>>(),
            "note": note,
        }))
    }
}

pub struct CompareRestaurantsTool {
    business: Arc<dyn BusinessProvider>,
}

impl CompareRestaurantsTool {
    pub fn new(business: Arc<dyn BusinessProvider>) -> Self {
        Self { business }
    }
}

#[derive(Debug, Deserialize)]
struct CompareParams {
    restaurant_names: Vec<String>,
    location: String,
}

#[async_trait]
impl Tool for CompareRestaurantsTool {
    fn name(&self) -> &str {
        "compare_restaurants"
    }

    fn description(&self) -> &str {
        "Compare 2-3 restaurants side by side with ratings, prices, and distance"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "restaurant_names": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of 2-3 restaurant names to compare"
                },
                "location": {
                    "type": "string",
                    "description": "Reference location (e.g., 'New York, NY')"
                }
            },
            "required": ["restaurant_names", "location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: CompareParams = parse_args(self.name(), params)?;
        if !(2..=3).contains(&params.restaurant_names.len()) {
            return Ok(json!({ "error": "Please provide 2-3 restaurant names as a list" }));
        }

        let provider = self.business.as_ref();
        let mut comparison = Vec::new();

        for name in &params.restaurant_names {
            let hit = match find_business(provider, name, &params.location).await? {
                Ok(hit) => hit,
                Err(_) => {
                    comparison.push(json!({ "name": name, "error": "Not found" }));
                    continue;
                }
            };
            let details = provider.business_details(business_id(&hit)).await?;

            comparison.push(json!({
                "name": field_or(&details, "name", json!(name)),
                "rating": field_or(&details, "rating", json!("N/A")),
                "total_ratings": field_or(&details, "review_count", json!(0)),
                "price_level": field_or(&details, "price", json!("N/A")),
                "address": display_address(&details),
                "distance": meters_to_miles(hit.get("distance").and_then(Value::as_f64).unwrap_or(0.0)),
                "yelp_url": field_or(&details, "url", json!("N/A")),
            }));
        }

        Ok(json!({ "comparison": comparison, "reference_location": params.location }))
    }
}

pub struct RestaurantHoursTool {
    business: Arc<dyn BusinessProvider>,
}

impl RestaurantHoursTool {
    pub fn new(business: Arc<dyn BusinessProvider>) -> Self {
        Self { business }
    }
}

#[async_trait]
impl Tool for RestaurantHoursTool {
    fn name(&self) -> &str {
        "get_restaurant_hours"
    }

    fn description(&self) -> &str {
        "Check if a restaurant is open now and get its hours"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema()
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let provider = self.business.as_ref();

        let hit = match find_business(provider, &params.restaurant_name, &params.location).await? {
            Ok(hit) => hit,
            Err(miss) => return Ok(miss.into_value()),
        };
        let details = provider.business_details(business_id(&hit)).await?;
        let open_now = details
            .pointer("/hours/0/is_open_now")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(json!({
            "name": field_or(&details, "name", json!(params.restaurant_name)),
            "address": display_address(&details),
            "open_now": open_now,
            "hours": format_hours(details.get("hours")),
            "yelp_url": field_or(&details, "url", json!("N/A")),
        }))
    }
}

pub struct NearbyAlternativesTool {
    business: Arc<dyn BusinessProvider>,
}

impl NearbyAlternativesTool {
    pub fn new(business: Arc<dyn BusinessProvider>) -> Self {
        Self { business }
    }
}

#[derive(Debug, Deserialize)]
struct AlternativesParams {
    restaurant_name: String,
    location: String,
    #[serde(default = "default_alternatives_radius")]
    radius: u32,
    #[serde(default = "default_few_results")]
    max_results: u32,
}

#[async_trait]
impl Tool for NearbyAlternativesTool {
    fn name(&self) -> &str {
        "find_nearby_alternatives"
    }

    fn description(&self) -> &str {
        "Find similar restaurants near a specific restaurant"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "restaurant_name": {
                    "type": "string",
                    "description": "Name of the reference restaurant"
                },
                "location": {
                    "type": "string",
                    "description": "Location (e.g., 'New York, NY')"
                },
                "radius": {
                    "type": "integer",
                    "description": "Search radius in meters (default: 1000)",
                    "default": 1000
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of alternatives (default: 5)",
                    "default": 5
                }
            },
            "required": ["restaurant_name", "location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: AlternativesParams = parse_args(self.name(), params)?;
        let provider = self.business.as_ref();

        let hit = match find_business(provider, &params.restaurant_name, &params.location).await? {
            Ok(hit) => hit,
            Err(miss) => return Ok(miss.into_value()),
        };
        let original_id = business_id(&hit);

        let (Some(latitude), Some(longitude)) = (
            hit.pointer("/coordinates/latitude").and_then(Value::as_f64),
            hit.pointer("/coordinates/longitude").and_then(Value::as_f64),
        ) else {
            return Ok(NotFound::restaurant(&params.restaurant_name).into_value());
        };

        let aliases: Vec<&str> = hit
            .get("categories")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|c| str_field(c, "alias"))
            .collect();
        let categories = if aliases.is_empty() {
            "restaurants".to_string()
        } else {
            aliases.join(",")
        };

        let request = BusinessSearch {
            latitude: Some(latitude),
            longitude: Some(longitude),
            categories: Some(categories),
            radius: Some(params.radius.min(MAX_RADIUS)),
            // One extra to make up for the original showing up in its own neighborhood
            limit: (params.max_results + 1).min(MAX_LIMIT),
            ..Default::default()
        };
        let nearby = self.business.search(&request).await?;

        let alternatives: Vec<Value> = businesses(&nearby)
            .into_iter()
            .filter(|b| business_id(b) != original_id)
            .take(params.max_results as usize)
            .collect();

        Ok(json!({
            "original_restaurant": hit.get("name").cloned().unwrap_or(Value::Null),
            "alternatives": summarize(&alternatives),
        }))
    }
}

pub struct RecommendTool {
    business: Arc<dyn BusinessProvider>,
}

impl RecommendTool {
    pub fn new(business: Arc<dyn BusinessProvider>) -> Self {
        Self { business }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendParams {
    location: String,
    #[serde(default = "empty_object")]
    preferences: Value,
    #[serde(default = "default_few_results")]
    max_results: u32,
}

fn empty_object() -> Value {
    json!({})
}

#[derive(Debug, Deserialize)]
struct Preferences {
    #[serde(default)]
    cuisine: Option<String>,
    #[serde(default = "default_min_rating")]
    min_rating: f64,
    #[serde(default = "default_max_price")]
    max_price_level: u32,
    #[serde(default)]
    open_now: bool,
    #[serde(default)]
    attributes: Vec<String>,
}

fn default_min_rating() -> f64 {
    4.0
}

fn default_max_price() -> u32 {
    3
}

#[async_trait]
impl Tool for RecommendTool {
    fn name(&self) -> &str {
        "recommend_restaurants"
    }

    fn description(&self) -> &str {
        "Get personalized restaurant recommendations based on cuisine, rating, price, and attributes"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Location to search near"
                },
                "preferences": {
                    "type": "object",
                    "description": "Preferences: cuisine (string), min_rating (number, default 4.0), max_price_level (1-4, default 3), open_now (boolean), attributes (array, e.g. 'hot_and_new', 'reservation')",
                    "properties": {
                        "cuisine": {"type": "string"},
                        "min_rating": {"type": "number"},
                        "max_price_level": {"type": "integer"},
                        "open_now": {"type": "boolean"},
                        "attributes": {"type": "array", "items": {"type": "string"}}
                    }
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of recommendations (default: 5)",
                    "default": 5
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RecommendParams = parse_args(self.name(), params)?;
        let preferences: Preferences = parse_args(self.name(), params.preferences.clone())?;

        let request = BusinessSearch {
            location: Some(params.location.clone()),
            categories: Some(restaurant_categories(preferences.cuisine.as_deref())),
            limit: MAX_LIMIT,
            sort_by: "rating".to_string(),
            price: (preferences.max_price_level > 0).then(|| price_range(preferences.max_price_level)),
            open_now: preferences.open_now.then_some(true),
            attributes: (!preferences.attributes.is_empty()).then(|| preferences.attributes.join(",")),
            ..Default::default()
        };
        let found = self.business.search(&request).await?;

        let filtered: Vec<Value> = businesses(&found)
            .into_iter()
            .filter(|b| meets_rating(b, preferences.min_rating))
            .collect();

        Ok(json!({
            "location": params.location,
            "preferences": params.preferences,
            "recommendations": summarize(&filtered[..filtered.len().min(params.max_results as usize)]),
            "total_found": filtered.len(),
        }))
    }
}
