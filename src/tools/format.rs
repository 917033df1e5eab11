//! Presentation helpers shared by the restaurant tools

use serde_json::{json, Value};

/// Place types too generic to be shown as a cuisine
const GENERIC_PLACE_TYPES: &[&str] = &["restaurant", "food", "point_of_interest", "establishment"];

const METERS_PER_MILE: f64 = 1609.34;
/// Highest Google price level ("very expensive")
const MAX_PRICE_LEVEL: u64 = 4;
const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// `field` of `value`, or `default` when absent or null
pub fn field_or(value: &Value, field: &str, default: Value) -> Value {
    match value.get(field) {
        Some(Value::Null) | None => default,
        Some(found) => found.clone(),
    }
}

pub fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// Google price level as dollar signs
pub fn price_display(level: Option<u64>) -> String {
    match level {
        Some(level) => "$".repeat(level.min(MAX_PRICE_LEVEL) as usize),
        None => "N/A".to_string(),
    }
}

/// Yelp price filter covering every level up to `max_level`, e.g. `"1,2,3"`
pub fn price_range(max_level: u32) -> String {
    (1..=max_level)
        .map(|level| level.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Human-readable cuisines from Google place types
pub fn cuisine_types(types: Option<&Value>) -> Vec<String> {
    types
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .filter_map(Value::as_str)
                .filter(|t| !GENERIC_PLACE_TYPES.contains(t))
                .map(title_case)
                .collect()
        })
        .unwrap_or_default()
}

fn title_case(place_type: &str) -> String {
    place_type
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Reviews split by star rating: 4+ good, 2 or less bad, the rest neutral
#[derive(Debug, Default)]
pub struct ReviewBuckets<'a> {
    pub good: Vec<&'a Value>,
    pub bad: Vec<&'a Value>,
    pub neutral: Vec<&'a Value>,
}

impl<'a> ReviewBuckets<'a> {
    pub fn categorize(reviews: &'a [Value]) -> Self {
        let mut buckets = Self::default();
        for review in reviews {
            let rating = review.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
            if rating >= 4.0 {
                buckets.good.push(review);
            } else if rating <= 2.0 {
                buckets.bad.push(review);
            } else {
                buckets.neutral.push(review);
            }
        }
        buckets
    }

    pub fn summary(&self) -> Value {
        json!({
            "total_reviews": self.good.len() + self.bad.len() + self.neutral.len(),
            "good_reviews_count": self.good.len(),
            "bad_reviews_count": self.bad.len(),
            "neutral_reviews_count": self.neutral.len(),
        })
    }
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn meters_to_miles(meters: f64) -> String {
    format!("{:.1} miles", meters / METERS_PER_MILE)
}

/// Join a Yelp `location.display_address` into one line
pub fn display_address(business: &Value) -> String {
    business
        .pointer("/location/display_address")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Weekly opening hours from Yelp's `hours` array, one line per day
pub fn format_hours(hours: Option<&Value>) -> Vec<String> {
    let Some(open) = hours
        .and_then(Value::as_array)
        .and_then(|hours| hours.first())
        .and_then(|schedule| schedule.get("open"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    WEEKDAYS
        .iter()
        .enumerate()
        .map(|(day_index, day_name)| {
            let times: Vec<String> = open
                .iter()
                .filter(|slot| slot.get("day").and_then(Value::as_u64) == Some(day_index as u64))
                .map(|slot| {
                    format!(
                        "{} - {}",
                        clock_time(str_field(slot, "start").unwrap_or_default()),
                        clock_time(str_field(slot, "end").unwrap_or_default())
                    )
                })
                .collect();

            if times.is_empty() {
                format!("{}: Closed", day_name)
            } else {
                format!("{}: {}", day_name, times.join(", "))
            }
        })
        .collect()
}

/// `"1130"` -> `"11:30"`
fn clock_time(hhmm: &str) -> String {
    match (hhmm.get(..2), hhmm.get(2..)) {
        (Some(hours), Some(minutes)) => format!("{}:{}", hours, minutes),
        _ => hhmm.to_string(),
    }
}

/// Lowercased text of every review, joined for keyword matching
pub fn review_corpus(reviews: &[Value]) -> String {
    reviews
        .iter()
        .filter_map(|review| str_field(review, "text"))
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of reviews mentioning each term at least once, most mentioned first.
/// Terms nobody mentions are left out; ties keep the order of `terms`.
pub fn mention_counts<'t>(reviews: &[Value], terms: &[&'t str]) -> Vec<(&'t str, usize)> {
    let texts: Vec<String> = reviews
        .iter()
        .filter_map(|review| str_field(review, "text"))
        .map(str::to_lowercase)
        .collect();

    let mut counts: Vec<(&str, usize)> = terms
        .iter()
        .map(|term| (*term, texts.iter().filter(|text| text.contains(term)).count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Plain text from a Google Directions step instruction
pub fn strip_instruction_html(html: &str) -> String {
    html.replace("<b>", "")
        .replace("</b>", "")
        .replace("<div style=\"font-size:0.9em\">", " - ")
        .replace("</div>", "")
        .replace("<wbr/>", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        assert_eq!(price_display(Some(3)), "$$$");
        assert_eq!(price_display(Some(0)), "");
        assert_eq!(price_display(None), "N/A");
        assert_eq!(price_range(3), "1,2,3");
        // Out-of-range upstream levels are capped
        assert_eq!(price_display(Some(u64::MAX)), "$$$$");
        assert_eq!(price_display(Some(9)), "$$$$");
    }

    #[test]
    fn test_mention_counts() {
        let reviews = vec![
            json!({"text": "The Pizza was great, best pizza in town"}),
            json!({"text": "Loved the pizza and the tiramisu"}),
            json!({"text": "Tiramisu!"}),
            json!({"text": "Pasta was cold"}),
            json!({"rating": 5}),
        ];

        let counts = mention_counts(&reviews, &["tiramisu", "pasta", "pizza", "sushi"]);
        assert_eq!(counts, vec![("tiramisu", 2), ("pizza", 2), ("pasta", 1)]);
        assert!(review_corpus(&reviews).contains("pasta was cold"));
    }

    #[test]
    fn test_cuisine_types_skip_generic() {
        let types = json!(["restaurant", "italian_restaurant", "food", "meal_takeaway"]);
        assert_eq!(
            cuisine_types(Some(&types)),
            vec!["Italian Restaurant", "Meal Takeaway"]
        );
        assert!(cuisine_types(None).is_empty());
    }

    #[test]
    fn test_review_buckets() {
        let reviews = vec![
            json!({"rating": 5}),
            json!({"rating": 4}),
            json!({"rating": 3}),
            json!({"rating": 2}),
            json!({"text": "no rating"}),
        ];
        let buckets = ReviewBuckets::categorize(&reviews);
        assert_eq!(buckets.good.len(), 2);
        assert_eq!(buckets.neutral.len(), 1);
        assert_eq!(buckets.bad.len(), 2);
        assert_eq!(buckets.summary()["total_reviews"], 5);
    }

    #[test]
    fn test_truncate_text_is_char_aware() {
        assert_eq!(truncate_text("short", 200), "short");
        assert_eq!(truncate_text("crème brûlée", 5), "crème...");
    }

    #[test]
    fn test_yelp_hours() {
        let hours = json!([{
            "is_open_now": true,
            "open": [
                {"day": 0, "start": "1100", "end": "1430"},
                {"day": 0, "start": "1700", "end": "2200"},
                {"day": 4, "start": "1100", "end": "2300"}
            ]
        }]);

        let lines = format_hours(Some(&hours));
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "Monday: 11:00 - 14:30, 17:00 - 22:00");
        assert_eq!(lines[1], "Tuesday: Closed");
        assert_eq!(lines[4], "Friday: 11:00 - 23:00");
        assert!(format_hours(Some(&json!([]))).is_empty());
    }

    #[test]
    fn test_misc_helpers() {
        assert_eq!(meters_to_miles(1609.34), "1.0 miles");
        assert_eq!(
            display_address(&json!({"location": {"display_address": ["1 Main St", "Austin, TX"]}})),
            "1 Main St, Austin, TX"
        );
        assert_eq!(
            strip_instruction_html("Turn <b>left</b><div style=\"font-size:0.9em\">Toll road</div>"),
            "Turn left - Toll road"
        );
        assert_eq!(field_or(&json!({"rating": null}), "rating", json!("N/A")), "N/A");
    }
}
