use super::common::*;
use anyhow::Result;
use chrono::Duration;
use mockito::{Matcher, Server};
use restaurant_finder::providers::{BusinessProvider, PlacesProvider, UsageReporter};
use restaurant_finder::usage::UsageSummary;

#[tokio::test]
async fn test_expired_entries_are_fetched_again() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/geocode/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TIMES_SQUARE_GEOCODE)
        .expect(2)
        .create_async()
        .await;

    let env = TestEnvironment::new(&server);
    let client = env.places_client();

    client.geocode("Times Square").await?;
    env.clock.advance(Duration::hours(24));
    // Exactly at the TTL the entry is still valid
    client.geocode("Times Square").await?;
    env.clock.advance(Duration::seconds(1));
    client.geocode("Times Square").await?;

    mock.assert_async().await;
    let report = client.usage_report()?;
    assert_eq!(report.cache.api_calls_made, 2);
    assert_eq!(report.cache.api_calls_saved, 1);
    Ok(())
}

#[tokio::test]
async fn test_monthly_usage_rolls_over() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/geocode/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TIMES_SQUARE_GEOCODE)
        .expect_at_least(1)
        .create_async()
        .await;

    let env = TestEnvironment::new(&server);
    let client = env.places_client();

    client.geocode("Times Square").await?;
    client.geocode("Union Square").await?;

    env.clock.advance(Duration::days(20));
    let report = client.usage_report()?;
    match report.usage {
        UsageSummary::MeteredCost(summary) => {
            assert_eq!(summary.month, "2026-11");
            assert_eq!(summary.total_api_calls, 0);
            assert_eq!(summary.accumulated_cost, 0.0);
        }
        other => panic!("unexpected summary: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_daily_quota_warnings() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/businesses/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"businesses": []}"#)
        .expect_at_least(1)
        .create_async()
        .await;

    let mut env = TestEnvironment::new(&server);
    env.config.yelp.daily_limit = 4;
    let client = env.business_client();

    let search = |term: &str| restaurant_finder::providers::BusinessSearch {
        term: Some(term.to_string()),
        location: Some("Austin".to_string()),
        ..Default::default()
    };

    client.search(&search("a")).await?;
    client.search(&search("b")).await?;
    assert!(client.usage_report()?.warning.is_none());

    client.search(&search("c")).await?;
    let warning = client.usage_report()?.warning.expect("75% should warn");
    assert!(warning.message.contains("CAUTION"));

    client.search(&search("d")).await?;
    let report = client.usage_report()?;
    assert!(report
        .warning
        .as_ref()
        .expect("100% should warn")
        .message
        .contains("LIMIT REACHED"));
    let json = report.to_json();
    assert_eq!(json["usage"]["remaining_calls"], 0);
    // Using exactly the whole quota is still within it
    assert_eq!(json["usage"]["within_limit"], true);

    // Cache hits never count against the quota
    client.search(&search("a")).await?;
    assert_eq!(client.usage_report()?.to_json()["usage"]["total_api_calls"], 4);

    client.search(&search("e")).await?;
    let json = client.usage_report()?.to_json();
    assert_eq!(json["usage"]["total_api_calls"], 5);
    assert_eq!(json["usage"]["remaining_calls"], 0);
    assert_eq!(json["usage"]["within_limit"], false);

    // A new day starts from zero
    env.clock.advance(Duration::days(1));
    let report = client.usage_report()?;
    assert!(report.warning.is_none());
    assert_eq!(report.to_json()["usage"]["date"], "2026-10-18");
    Ok(())
}

#[tokio::test]
async fn test_disabled_tracking_reports_untracked() -> Result<()> {
    let server = Server::new_async().await;
    let mut env = TestEnvironment::new(&server);
    env.config.usage.enabled = false;

    let report = env.places_client().usage_report()?;
    assert!(matches!(report.usage, UsageSummary::Untracked { .. }));
    assert!(!env.cache_dir.path().join("google").join("usage.json").exists());
    Ok(())
}
