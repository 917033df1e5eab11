use super::common::*;
use anyhow::Result;
use mockito::{Matcher, Server};
use restaurant_finder::providers::{
    BusinessProvider, BusinessSearch, GoogleMapsClient, LatLng, NearbySearch, PlacesProvider,
    TravelMode, Waypoint, YelpClient,
};

#[tokio::test]
async fn test_google_geocode_returns_results() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = mock_google(
        &mut server,
        "geocode",
        vec![Matcher::UrlEncoded("address".into(), "Times Square".into())],
        TIMES_SQUARE_GEOCODE,
    )
    .await;

    let client = GoogleMapsClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let results = client.geocode("Times Square").await?;

    mock.assert_async().await;
    assert_eq!(results[0]["geometry"]["location"]["lat"], 40.758);
    Ok(())
}

#[tokio::test]
async fn test_google_nearby_sends_search_parameters() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = mock_google(
        &mut server,
        "place/nearbysearch",
        vec![
            Matcher::UrlEncoded("location".into(), "40.758,-73.9855".into()),
            Matcher::UrlEncoded("radius".into(), "1500".into()),
            Matcher::UrlEncoded("type".into(), "restaurant".into()),
            Matcher::UrlEncoded("keyword".into(), "pizza".into()),
        ],
        NEARBY_RESULTS,
    )
    .await;

    let client = GoogleMapsClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let request = NearbySearch::restaurants(LatLng::new(40.758, -73.9855), 1500)
        .with_keyword(Some("pizza".to_string()));
    let body = client.places_nearby(&request).await?;

    mock.assert_async().await;
    assert_eq!(body["results"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_google_distance_matrix_joins_waypoints() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = mock_google(
        &mut server,
        "distancematrix",
        vec![
            Matcher::UrlEncoded("origins".into(), "A|B".into()),
            Matcher::UrlEncoded("destinations".into(), "1,2".into()),
            Matcher::UrlEncoded("mode".into(), "walking".into()),
        ],
        r#"{"status": "OK", "rows": []}"#,
    )
    .await;

    let client = GoogleMapsClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    client
        .distance_matrix(
            &[Waypoint::Address("A".into()), Waypoint::Address("B".into())],
            &[Waypoint::Coordinates(LatLng::new(1.0, 2.0))],
            TravelMode::Walking,
        )
        .await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_google_request_denied_is_an_error() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_google(
        &mut server,
        "geocode",
        vec![],
        r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "results": []}"#,
    )
    .await;

    let client = GoogleMapsClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let err = client.geocode("Anywhere").await.unwrap_err();

    assert!(err.to_string().contains("REQUEST_DENIED"));
    assert!(err.to_string().contains("API key is invalid"));
    Ok(())
}

#[tokio::test]
async fn test_google_zero_results_is_not_an_error() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_google(&mut server, "directions", vec![], r#"{"status": "ZERO_RESULTS", "routes": []}"#).await;

    let client = GoogleMapsClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let routes = client.directions("Here", "Nowhere", TravelMode::Driving).await?;

    assert_eq!(routes, serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn test_google_http_failure_is_an_error() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/place/details/json")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let client = GoogleMapsClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let err = client.place_details("p1", &["name"]).await.unwrap_err();

    assert!(err.to_string().contains("500"));
    Ok(())
}

#[tokio::test]
async fn test_yelp_search_uses_bearer_auth() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/businesses/search")
        .match_header("authorization", format!("Bearer {}", TEST_KEY).as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("location".into(), "Austin, TX".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
            Matcher::UrlEncoded("sort_by".into(), "best_match".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"businesses": [{"id": "taco-shack"}], "total": 1}"#)
        .create_async()
        .await;

    let client = YelpClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let search = BusinessSearch {
        location: Some("Austin, TX".to_string()),
        ..Default::default()
    };
    let body = client.search(&search).await?;

    mock.assert_async().await;
    assert_eq!(body["businesses"][0]["id"], "taco-shack");
    Ok(())
}

#[tokio::test]
async fn test_yelp_reviews_path_and_errors() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/businesses/taco-shack/reviews")
        .match_query(Matcher::UrlEncoded("limit".into(), "3".into()))
        .with_status(403)
        .with_body(r#"{"error": {"code": "NOT_AUTHORIZED"}}"#)
        .create_async()
        .await;

    let client = YelpClient::new(TEST_KEY.to_string(), Some(server.url()))?;
    let err = client.reviews("taco-shack", 3).await.unwrap_err();

    assert!(err.to_string().contains("Yelp API error"));
    assert!(err.to_string().contains("NOT_AUTHORIZED"));
    Ok(())
}

#[tokio::test]
async fn test_caching_client_calls_upstream_once() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/geocode/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TIMES_SQUARE_GEOCODE)
        .expect(1)
        .create_async()
        .await;

    let env = TestEnvironment::new(&server);
    let client = env.places_client();

    let first = client.geocode("Times Square").await?;
    let second = client.geocode("Times Square").await?;

    mock.assert_async().await;
    assert_eq!(first, second);

    let stats = client.memo().cache_stats();
    assert_eq!((stats.calls_made, stats.calls_saved), (1, 1));
    assert!(env
        .cache_dir
        .path()
        .join("google")
        .join("responses")
        .join("stats.json")
        .exists());
    Ok(())
}
