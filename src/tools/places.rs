//! Restaurant tools backed by a geocoding/places provider

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use super::format::{
    cuisine_types, field_or, mention_counts, price_display, review_corpus, str_field,
    strip_instruction_html, truncate_text, ReviewBuckets,
};
use super::{parse_args, Lookup, NotFound, Tool};
use crate::providers::{LatLng, NearbySearch, PlacesProvider, TextSearch, TravelMode, Waypoint};

/// Radius used to pin down a named restaurant around its location context
const RESTAURANT_SEARCH_RADIUS: u32 = 5000;
/// Wider radius used when comparing restaurants
const COMPARISON_SEARCH_RADIUS: u32 = 10000;
/// Route steps sampled per leg when searching along a route
const ROUTE_STEPS_PER_LEG: usize = 5;
const REVIEWS_PER_RESULT: usize = 3;
const REVIEW_PREVIEW_CHARS: usize = 200;

const SUMMARY_FIELDS: &[&str] = &[
    "name",
    "rating",
    "user_ratings_total",
    "price_level",
    "type",
    "vicinity",
    "url",
    "reviews",
    "geometry",
];

const POPULAR_DISHES_SHOWN: usize = 10;

/// Dishes looked for in review text
const DISH_TERMS: &[&str] = &[
    "pizza", "burger", "steak", "fried chicken", "wings", "pasta", "lasagna", "salad",
    "sandwich", "tacos", "burrito", "enchiladas", "sushi", "ramen", "pho", "dumplings",
    "pad thai", "curry", "noodles", "fried rice", "soup", "seafood", "shrimp", "salmon",
    "oysters", "lobster", "ribs", "brisket", "pancakes", "waffles", "omelet", "fries",
    "cheesecake", "tiramisu", "ice cream", "brownie", "dessert",
];

/// Dietary options and the review phrases that suggest them
const DIETARY_SIGNALS: &[(&str, &[&str])] = &[
    ("vegetarian", &["vegetarian", "veggie"]),
    ("vegan", &["vegan", "plant-based", "plant based"]),
    ("gluten_free", &["gluten free", "gluten-free", "celiac"]),
    ("halal", &["halal"]),
    ("kosher", &["kosher"]),
];

/// Ambiance tags and the review phrases that suggest them
const AMBIANCE_SIGNALS: &[(&str, &[&str])] = &[
    ("romantic", &["romantic", "date night", "anniversary"]),
    ("family_friendly", &["family", "kids", "children"]),
    ("casual", &["casual", "laid back", "laid-back"]),
    ("upscale", &["upscale", "elegant", "fine dining"]),
    ("outdoor_seating", &["outdoor", "patio", "terrace"]),
];

const RESERVATION_PHRASES: &[&str] = &["reservation", "reserved a table", "booked a table"];
const RESERVATION_HOSTS: &[&str] = &["opentable", "resy", "sevenrooms"];

const CUISINE_DESCRIPTION: &str = "Filter by cuisine type (e.g., 'chinese', 'italian', 'mexican', 'japanese', 'american', 'indian', 'thai', 'greek', 'french', 'korean', 'vietnamese', 'mediterranean', 'breakfast', 'brunch')";
const PRICE_DESCRIPTION: &str = "Maximum price level (1=$ budget, 2=$$ moderate, 3=$$$ expensive, 4=$$$$ very expensive)";

fn default_radius() -> u32 {
    1500
}

fn default_max_results() -> usize {
    10
}

fn default_detour() -> u32 {
    2000
}

fn default_alternatives_radius() -> u32 {
    1000
}

fn default_few_results() -> usize {
    5
}

/// Geocode `location` to the coordinates of its best match
async fn locate(places: &dyn PlacesProvider, location: &str) -> Result<Lookup<LatLng>> {
    let results = places.geocode(location).await?;
    let point = results
        .get(0)
        .and_then(|best| best.pointer("/geometry/location"))
        .and_then(LatLng::from_json);

    Ok(point.ok_or_else(|| NotFound::location(location)))
}

/// The most relevant text-search hit for `name` near `location`
async fn find_place(
    places: &dyn PlacesProvider,
    name: &str,
    location: &str,
    radius: u32,
) -> Result<Lookup<(Value, LatLng)>> {
    let center = match locate(places, location).await? {
        Ok(center) => center,
        Err(miss) => return Ok(Err(miss)),
    };

    let request = TextSearch {
        query: format!("{} {}", name, location),
        location: Some(center),
        radius: Some(radius),
    };
    let found = places.text_search(&request).await?;

    match found.pointer("/results/0") {
        Some(place) => Ok(Ok((place.clone(), center))),
        None => Ok(Err(NotFound::restaurant(name))),
    }
}

fn place_id(place: &Value) -> &str {
    str_field(place, "place_id").unwrap_or_default()
}

/// Fetch place details and unwrap the `result` object
async fn details(places: &dyn PlacesProvider, place_id: &str, fields: &[&str]) -> Result<Value> {
    let mut body = places.place_details(place_id, fields).await?;
    Ok(match body.get_mut("result") {
        Some(result) => result.take(),
        None => json!({}),
    })
}

fn passes_filters(place: &Value, min_rating: f64, max_price_level: Option<u64>) -> bool {
    let rating = place.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
    if min_rating > 0.0 && rating < min_rating {
        return false;
    }

    match max_price_level {
        Some(max) => matches!(place.get("price_level").and_then(Value::as_u64), Some(level) if level <= max),
        None => true,
    }
}

/// Restaurant cards with details and a few review previews
async fn summarize(places: &dyn PlacesProvider, results: &[Value]) -> Result<Vec<Value>> {
    let mut cards = Vec::with_capacity(results.len());

    for place in results {
        let result = details(places, place_id(place), SUMMARY_FIELDS).await?;

        let reviews: Vec<Value> = result
            .get("reviews")
            .and_then(Value::as_array)
            .map(|reviews| {
                reviews
                    .iter()
                    .take(REVIEWS_PER_RESULT)
                    .map(|review| {
                        json!({
                            "author": field_or(review, "author_name", json!("Anonymous")),
                            "rating": field_or(review, "rating", json!("N/A")),
                            "text": truncate_text(str_field(review, "text").unwrap_or_default(), REVIEW_PREVIEW_CHARS),
                            "time": str_field(review, "relative_time_description").unwrap_or_default(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        cards.push(json!({
            "name": field_or(&result, "name", json!("Unknown")),
            "address": field_or(&result, "vicinity", json!("N/A")),
            "rating": field_or(&result, "rating", json!("N/A")),
            "total_ratings": field_or(&result, "user_ratings_total", json!(0)),
            "price_level": price_display(result.get("price_level").and_then(Value::as_u64)),
            "cuisine_types": cuisine_types(place.get("types")),
            "google_maps_url": field_or(&result, "url", json!("N/A")),
            "reviews": reviews,
        }));
    }

    Ok(cards)
}

fn format_review(review: &Value) -> Value {
    json!({
        "author": field_or(review, "author_name", json!("Anonymous")),
        "rating": field_or(review, "rating", json!("N/A")),
        "text": str_field(review, "text").unwrap_or_default(),
        "time": str_field(review, "relative_time_description").unwrap_or_default(),
    })
}

fn restaurant_lookup_schema(location_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "restaurant_name": {
                "type": "string",
                "description": "Name of the restaurant"
            },
            "location": {
                "type": "string",
                "description": location_description
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
    places: Arc<dyn PlacesProvider>,
}

impl FindByLocationTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[derive(Debug, Deserialize)]
struct FindByLocationParams {
    location: String,
    #[serde(default = "default_radius")]
    radius: u32,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default)]
    min_rating: f64,
    #[serde(default)]
    cuisine_type: Option<String>,
    #[serde(default)]
    max_price_level: Option<u64>,
}

#[async_trait]
impl Tool for FindByLocationTool {
    fn name(&self) -> &str {
        "find_restaurants_by_location"
    }

    fn description(&self) -> &str {
        "Find restaurants near a specific location (address, city, or coordinates)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Location to search (e.g., '123 Main St, New York' or 'Times Square')"
                },
                "radius": {
                    "type": "integer",
                    "description": "Search radius in meters (default: 1500)",
                    "default": 1500
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 10)",
                    "default": 10
                },
                "min_rating": {
                    "type": "number",
                    "description": "Minimum rating filter (0-5, default: 0 for no filter)",
                    "default": 0
                },
                "cuisine_type": {
                    "type": "string",
                    "description": CUISINE_DESCRIPTION
                },
                "max_price_level": {
                    "type": "integer",
                    "description": PRICE_DESCRIPTION
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: FindByLocationParams = parse_args(self.name(), params)?;

        let center = match locate(self.places.as_ref(), &params.location).await? {
            Ok(center) => center,
            Err(miss) => return Ok(miss.into_value()),
        };

        let request = NearbySearch::restaurants(center, params.radius).with_keyword(params.cuisine_type);
        let nearby = self.places.places_nearby(&request).await?;

        let matches: Vec<Value> = nearby
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|place| passes_filters(place, params.min_rating, params.max_price_level))
            .take(params.max_results)
            .cloned()
            .collect();

        Ok(Value::Array(summarize(self.places.as_ref(), &matches).await?))
    }
}

pub struct FindAlongRouteTool {
    places: Arc<dyn PlacesProvider>,
}

impl FindAlongRouteTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[derive(Debug, Deserialize)]
struct FindAlongRouteParams {
    origin: String,
    destination: String,
    #[serde(default = "default_detour")]
    detour_distance: u32,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default)]
    min_rating: f64,
    #[serde(default)]
    cuisine_type: Option<String>,
    #[serde(default)]
    max_price_level: Option<u64>,
}

#[async_trait]
impl Tool for FindAlongRouteTool {
    fn name(&self) -> &str {
        "find_restaurants_along_route"
    }

    fn description(&self) -> &str {
        "Find restaurants along a route between two locations"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "origin": {
                    "type": "string",
                    "description": "Starting location (address or place name)"
                },
                "destination": {
                    "type": "string",
                    "description": "Ending location (address or place name)"
                },
                "detour_distance": {
                    "type": "integer",
                    "description": "Maximum detour distance in meters from route (default: 2000)",
                    "default": 2000
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 10)",
                    "default": 10
                },
                "min_rating": {
                    "type": "number",
                    "description": "Minimum rating filter (0-5, default: 0 for no filter)",
                    "default": 0
                },
                "cuisine_type": {
                    "type": "string",
                    "description": CUISINE_DESCRIPTION
                },
                "max_price_level": {
                    "type": "integer",
                    "description": PRICE_DESCRIPTION
                }
            },
            "required": ["origin", "destination"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: FindAlongRouteParams = parse_args(self.name(), params)?;

        let routes = self
            .places
            .directions(&params.origin, &params.destination, TravelMode::Driving)
            .await?;
        let Some(legs) = routes.pointer("/0/legs").and_then(Value::as_array) else {
            return Ok(json!({ "error": "No route found between locations" }));
        };

        let stops: Vec<LatLng> = legs
            .iter()
            .flat_map(|leg| {
                leg.get("steps")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .take(ROUTE_STEPS_PER_LEG)
                    .filter_map(|step| step.get("end_location").and_then(LatLng::from_json))
            })
            .collect();

        let mut seen = HashSet::new();
        let mut found = Vec::new();

        'stops: for stop in stops {
            let request = NearbySearch::restaurants(stop, params.detour_distance)
                .with_keyword(params.cuisine_type.clone());
            let nearby = self.places.places_nearby(&request).await?;

            for place in nearby.get("results").and_then(Value::as_array).into_iter().flatten() {
                let id = place_id(place);
                if id.is_empty() || seen.contains(id) {
                    continue;
                }
                if !passes_filters(place, params.min_rating, params.max_price_level) {
                    continue;
                }

                seen.insert(id.to_string());
                found.push(place.clone());
                if found.len() >= params.max_results {
                    break 'stops;
                }
            }
        }

        Ok(Value::Array(summarize(self.places.as_ref(), &found).await?))
    }
}

pub struct RestaurantDetailsTool {
    places: Arc<dyn PlacesProvider>,
}

impl RestaurantDetailsTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl Tool for RestaurantDetailsTool {
    fn name(&self) -> &str {
        "get_restaurant_details"
    }

    fn description(&self) -> &str {
        "Get detailed information about a specific restaurant including categorized good and bad reviews"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema(
            "Location context (e.g., 'Wesley Chapel, FL') to help find the right restaurant",
        )
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };

        let result = details(
            places,
            place_id(&place),
            &[
                "name",
                "rating",
                "user_ratings_total",
                "price_level",
                "type",
                "vicinity",
                "formatted_address",
                "formatted_phone_number",
                "website",
                "url",
                "reviews",
                "opening_hours",
                "geometry",
            ],
        )
        .await?;

        let reviews: Vec<Value> = result
            .get("reviews")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let buckets = ReviewBuckets::categorize(&reviews);

        let address = result
            .get("formatted_address")
            .or_else(|| result.get("vicinity"))
            .cloned()
            .unwrap_or_else(|| json!("N/A"));

        Ok(json!({
            "name": field_or(&result, "name", json!("Unknown")),
            "address": address,
            "phone": field_or(&result, "formatted_phone_number", json!("N/A")),
            "website": field_or(&result, "website", json!("N/A")),
            "rating": field_or(&result, "rating", json!("N/A")),
            "total_ratings": field_or(&result, "user_ratings_total", json!(0)),
            "price_level": price_display(result.get("price_level").and_then(Value::as_u64)),
            "cuisine_types": cuisine_types(place.get("types")),
            "google_maps_url": field_or(&result, "url", json!("N/A")),
            "hours": result.pointer("/opening_hours/weekday_text").cloned().unwrap_or_else(|| json!([])),
            "review_summary": buckets.summary(),
            "good_reviews": buckets.good.iter().take(5).map(|r| format_review(r)).collect::<Vec<_>>(),
            "bad_reviews": buckets.bad.iter().take(5).map(|r| format_review(r)).collect::<Vec<_>>(),
            "neutral_reviews": buckets.neutral.iter().take(3).map(|r| format_review(r)).collect::<Vec<_>>(),
        }))
    }
}

pub struct CompareRestaurantsTool {
    places: Arc<dyn PlacesProvider>,
}

impl CompareRestaurantsTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
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
        "Compare 2-3 restaurants side by side with ratings, prices, reviews, and distance"
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
                    "description": "Reference location for comparison (e.g., 'Wesley Chapel, FL')"
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

        let places = self.places.as_ref();
        let user_location = match locate(places, &params.location).await? {
            Ok(point) => point,
            Err(miss) => return Ok(miss.into_value()),
        };

        let mut comparison = Vec::new();
        for name in &params.restaurant_names {
            let request = TextSearch {
                query: format!("{} {}", name, params.location),
                location: Some(user_location),
                radius: Some(COMPARISON_SEARCH_RADIUS),
            };
            let found = places.text_search(&request).await?;
            let Some(place) = found.pointer("/results/0") else {
                comparison.push(json!({ "name": name, "error": "Not found" }));
                continue;
            };

            let result = details(
                places,
                place_id(place),
                &[
                    "name",
                    "rating",
                    "user_ratings_total",
                    "price_level",
                    "vicinity",
                    "formatted_address",
                    "url",
                    "geometry",
                ],
            )
            .await?;

            let (mut distance, mut duration) = (json!("N/A"), json!("N/A"));
            if let Some(restaurant) = result.pointer("/geometry/location").and_then(LatLng::from_json) {
                let matrix = places
                    .distance_matrix(
                        &[Waypoint::Coordinates(user_location)],
                        &[Waypoint::Coordinates(restaurant)],
                        TravelMode::Driving,
                    )
                    .await?;
                if let Some(element) = matrix.pointer("/rows/0/elements/0") {
                    if str_field(element, "status") == Some("OK") {
                        distance = element.pointer("/distance/text").cloned().unwrap_or(distance);
                        duration = element.pointer("/duration/text").cloned().unwrap_or(duration);
                    }
                }
            }

            comparison.push(json!({
                "name": field_or(&result, "name", json!(name)),
                "rating": field_or(&result, "rating", json!("N/A")),
                "total_ratings": field_or(&result, "user_ratings_total", json!(0)),
                "price_level": price_display(result.get("price_level").and_then(Value::as_u64)),
                "address": field_or(&result, "vicinity", json!("N/A")),
                "distance": distance,
                "drive_time": duration,
                "google_maps_url": field_or(&result, "url", json!("N/A")),
            }));
        }

        Ok(json!({ "comparison": comparison, "reference_location": params.location }))
    }
}

pub struct RestaurantHoursTool {
    places: Arc<dyn PlacesProvider>,
}

impl RestaurantHoursTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
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
        restaurant_lookup_schema("Location context (e.g., 'Wesley Chapel, FL')")
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };

        let result = details(
            places,
            place_id(&place),
            &["name", "opening_hours", "formatted_address", "url"],
        )
        .await?;

        Ok(json!({
            "name": field_or(&result, "name", json!(params.restaurant_name)),
            "address": field_or(&result, "formatted_address", json!("N/A")),
            "open_now": result.pointer("/opening_hours/open_now").cloned().unwrap_or_else(|| json!("Unknown")),
            "hours": result.pointer("/opening_hours/weekday_text").cloned().unwrap_or_else(|| json!([])),
            "google_maps_url": field_or(&result, "url", json!("N/A")),
        }))
    }
}

pub struct DirectionsTool {
    places: Arc<dyn PlacesProvider>,
}

impl DirectionsTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsParams {
    restaurant_name: String,
    location: String,
    origin: String,
    #[serde(default)]
    mode: TravelMode,
}

#[async_trait]
impl Tool for DirectionsTool {
    fn name(&self) -> &str {
        "get_directions"
    }

    fn description(&self) -> &str {
        "Get detailed driving or walking directions to a restaurant"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "restaurant_name": {
                    "type": "string",
                    "description": "Name of the restaurant"
                },
                "location": {
                    "type": "string",
                    "description": "Location context (e.g., 'Wesley Chapel, FL')"
                },
                "origin": {
                    "type": "string",
                    "description": "Starting location (address or place name)"
                },
                "mode": {
                    "type": "string",
                    "enum": ["driving", "walking", "bicycling", "transit"],
                    "description": "Travel mode (default: driving)",
                    "default": "driving"
                }
            },
            "required": ["restaurant_name", "location", "origin"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: DirectionsParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };

        let result = details(
            places,
            place_id(&place),
            &["name", "formatted_address", "geometry"],
        )
        .await?;
        let Some(destination) = str_field(&result, "formatted_address") else {
            return Ok(json!({ "error": "Could not find route" }));
        };

        let routes = places
            .directions(&params.origin, destination, params.mode)
            .await?;
        let Some(leg) = routes.pointer("/0/legs/0") else {
            return Ok(json!({ "error": "Could not find route" }));
        };

        let steps: Vec<Value> = leg
            .get("steps")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|step| {
                json!({
                    "instruction": strip_instruction_html(str_field(step, "html_instructions").unwrap_or_default()),
                    "distance": step.pointer("/distance/text").cloned().unwrap_or(Value::Null),
                    "duration": step.pointer("/duration/text").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();

        Ok(json!({
            "restaurant": result.get("name").cloned().unwrap_or(Value::Null),
            "destination": destination,
            "origin": params.origin,
            "mode": params.mode.as_str(),
            "total_distance": leg.pointer("/distance/text").cloned().unwrap_or(Value::Null),
            "total_duration": leg.pointer("/duration/text").cloned().unwrap_or(Value::Null),
            "steps": steps,
        }))
    }
}

pub struct NearbyAlternativesTool {
    places: Arc<dyn PlacesProvider>,
}

impl NearbyAlternativesTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[derive(Debug, Deserialize)]
struct AlternativesParams {
    restaurant_name: String,
    location: String,
    #[serde(default = "default_alternatives_radius")]
    radius: u32,
    #[serde(default = "default_few_results")]
    max_results: usize,
}

#[async_trait]
impl Tool for NearbyAlternativesTool {
    fn name(&self) -> &str {
        "find_nearby_alternatives"
    }

    fn description(&self) -> &str {
        "Find similar restaurants near a specific restaurant (useful if your first choice is full)"
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
                    "description": "Location context (e.g., 'Wesley Chapel, FL')"
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
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };
        let original_id = place_id(&place).to_string();

        let result = details(places, &original_id, &["name", "geometry", "type"]).await?;
        let Some(anchor) = result.pointer("/geometry/location").and_then(LatLng::from_json) else {
            return Ok(NotFound::restaurant(&params.restaurant_name).into_value());
        };

        let nearby = places
            .places_nearby(&NearbySearch::restaurants(anchor, params.radius))
            .await?;
        let alternatives: Vec<Value> = nearby
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|candidate| place_id(candidate) != original_id)
            .take(params.max_results)
            .cloned()
            .collect();

        Ok(json!({
            "original_restaurant": result.get("name").cloned().unwrap_or(Value::Null),
            "alternatives": summarize(places, &alternatives).await?,
        }))
    }
}

pub struct RecommendTool {
    places: Arc<dyn PlacesProvider>,
}

impl RecommendTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendParams {
    location: String,
    #[serde(default = "empty_object")]
    preferences: Value,
    #[serde(default = "default_few_results")]
    max_results: usize,
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
    max_price_level: u64,
    #[serde(default)]
    dietary: Vec<String>,
    #[serde(default)]
    ambiance: Vec<String>,
}

fn default_min_rating() -> f64 {
    4.0
}

fn default_max_price() -> u64 {
    3
}

impl Preferences {
    /// Search keyword combining cuisine, dietary and ambiance wishes
    fn keyword(&self) -> Option<String> {
        let words: Vec<&str> = self
            .cuisine
            .iter()
            .chain(&self.dietary)
            .chain(&self.ambiance)
            .map(String::as_str)
            .collect();

        if words.is_empty() {
            None
        } else {
            Some(words.join(" "))
        }
    }
}

#[async_trait]
impl Tool for RecommendTool {
    fn name(&self) -> &str {
        "recommend_restaurants"
    }

    fn description(&self) -> &str {
        "Get personalized restaurant recommendations based on cuisine, rating, price, dietary needs, and ambiance"
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
                    "description": "Preferences: cuisine (string), min_rating (number, default 4.0), max_price_level (1-4, default 3), dietary (array), ambiance (array)",
                    "properties": {
                        "cuisine": {"type": "string"},
                        "min_rating": {"type": "number"},
                        "max_price_level": {"type": "integer"},
                        "dietary": {"type": "array", "items": {"type": "string"}},
                        "ambiance": {"type": "array", "items": {"type": "string"}}
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
        let places = self.places.as_ref();

        let center = match locate(places, &params.location).await? {
            Ok(center) => center,
            Err(miss) => return Ok(miss.into_value()),
        };

        let request = NearbySearch::restaurants(center, RESTAURANT_SEARCH_RADIUS)
            .with_keyword(preferences.keyword());
        let nearby = places.places_nearby(&request).await?;

        let mut filtered: Vec<Value> = nearby
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|place| {
                let rating = place.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
                let price_ok = place
                    .get("price_level")
                    .and_then(Value::as_u64)
                    .map_or(true, |level| level <= preferences.max_price_level);
                rating >= preferences.min_rating && price_ok
            })
            .cloned()
            .collect();

        filtered.sort_by(|a, b| {
            let rating = |place: &Value| place.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
            rating(b).total_cmp(&rating(a))
        });

        let total_found = filtered.len();
        filtered.truncate(params.max_results);

        Ok(json!({
            "location": params.location,
            "preferences": params.preferences,
            "recommendations": summarize(places, &filtered).await?,
            "total_found": total_found,
        }))
    }
}

pub struct ReviewLinkTool {
    places: Arc<dyn PlacesProvider>,
}

impl ReviewLinkTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl Tool for ReviewLinkTool {
    fn name(&self) -> &str {
        "get_review_link"
    }

    fn description(&self) -> &str {
        "Get the direct link to leave a review for a restaurant on Google Maps"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema("Location context (e.g., 'Wesley Chapel, FL')")
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };
        let id = place_id(&place);

        let result = details(places, id, &["name", "formatted_address", "url", "place_id"]).await?;

        Ok(json!({
            "restaurant": field_or(&result, "name", json!(params.restaurant_name)),
            "address": field_or(&result, "formatted_address", json!("N/A")),
            "google_maps_url": field_or(&result, "url", json!("N/A")),
            "review_url": format!("https://search.google.com/local/writereview?placeid={}", id),
            "place_id": id,
            "instructions": "Open the review_url to leave your review. You'll need to be signed in to your Google account.",
        }))
    }
}

/// Tags from `signals` whose phrases appear in `corpus`
fn matched_tags(corpus: &str, signals: &[(&str, &[&str])]) -> Map<String, Value> {
    signals
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|phrase| corpus.contains(phrase)))
        .map(|(tag, _)| (tag.to_string(), Value::Bool(true)))
        .collect()
}

pub struct PopularDishesTool {
    places: Arc<dyn PlacesProvider>,
}

impl PopularDishesTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl Tool for PopularDishesTool {
    fn name(&self) -> &str {
        "extract_popular_dishes"
    }

    fn description(&self) -> &str {
        "Find the dishes reviewers mention most at a restaurant"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema("Location context (e.g., 'Wesley Chapel, FL')")
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };

        let result = details(places, place_id(&place), &["name", "reviews"]).await?;
        let reviews: Vec<Value> = result
            .get("reviews")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let dishes: Vec<Value> = mention_counts(&reviews, DISH_TERMS)
            .into_iter()
            .take(POPULAR_DISHES_SHOWN)
            .map(|(dish, mentions)| json!({ "dish": dish, "mentions": mentions }))
            .collect();

        Ok(json!({
            "restaurant": field_or(&result, "name", json!(params.restaurant_name)),
            "popular_dishes": dishes,
            "total_reviews_analyzed": reviews.len(),
        }))
    }
}

pub struct RestaurantFeaturesTool {
    places: Arc<dyn PlacesProvider>,
}

impl RestaurantFeaturesTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl Tool for RestaurantFeaturesTool {
    fn name(&self) -> &str {
        "check_restaurant_features"
    }

    fn description(&self) -> &str {
        "Check reservations, dietary options and ambiance of a restaurant as suggested by its reviews"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema("Location context (e.g., 'Wesley Chapel, FL')")
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };

        let result = details(
            places,
            place_id(&place),
            &["name", "website", "type", "reviews", "formatted_address", "url"],
        )
        .await?;
        let reviews: Vec<Value> = result
            .get("reviews")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let corpus = review_corpus(&reviews);
        let website = str_field(&result, "website").unwrap_or_default();

        let website_lower = website.to_lowercase();
        let takes_reservations = RESERVATION_PHRASES.iter().any(|phrase| corpus.contains(phrase))
            || RESERVATION_HOSTS.iter().any(|host| website_lower.contains(host));

        Ok(json!({
            "restaurant": field_or(&result, "name", json!(params.restaurant_name)),
            "address": field_or(&result, "formatted_address", json!("N/A")),
            "website": if website.is_empty() { "N/A" } else { website },
            "accepts_reservations": if takes_reservations { "Likely" } else { "Unknown (check website)" },
            "dietary_options": matched_tags(&corpus, DIETARY_SIGNALS),
            "ambiance": matched_tags(&corpus, AMBIANCE_SIGNALS),
            "google_maps_url": field_or(&result, "url", json!("N/A")),
        }))
    }
}

pub struct PeakHoursTool {
    places: Arc<dyn PlacesProvider>,
}

impl PeakHoursTool {
    pub fn new(places: Arc<dyn PlacesProvider>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl Tool for PeakHoursTool {
    fn name(&self) -> &str {
        "get_peak_hours"
    }

    fn description(&self) -> &str {
        "Get typical busy times for a restaurant so you can avoid the crowds"
    }

    fn parameters_schema(&self) -> Value {
        restaurant_lookup_schema("Location context (e.g., 'Wesley Chapel, FL')")
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let params: RestaurantLookupParams = parse_args(self.name(), params)?;
        let places = self.places.as_ref();

        let place = match find_place(places, &params.restaurant_name, &params.location, RESTAURANT_SEARCH_RADIUS).await? {
            Ok((place, _)) => place,
            Err(miss) => return Ok(miss.into_value()),
        };

        // Live popularity is not part of the Places API; only general guidance is available
        let result = details(places, place_id(&place), &["name", "type", "formatted_address"]).await?;

        Ok(json!({
            "restaurant": field_or(&result, "name", json!(params.restaurant_name)),
            "address": field_or(&result, "formatted_address", json!("N/A")),
            "note": "Peak hours data not available via API. Generally, restaurants are busiest:",
            "typical_peak_times": {
                "lunch": "12:00 PM - 1:30 PM (weekdays)",
                "dinner": "6:00 PM - 8:00 PM (all days)",
                "weekend_brunch": "10:00 AM - 1:00 PM (Saturday & Sunday)"
            },
            "recommendation": "Call ahead or check the Google Maps app for live 'Popular Times' data",
        }))
    }
}
