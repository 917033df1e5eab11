use super::common::*;
use anyhow::Result;
use mockito::{Matcher, Server};
use restaurant_finder::mcp::McpServer;
use restaurant_finder::tools::ToolRegistry;
use rmcp::model::{CallToolRequestParam, ErrorCode, ErrorData, ProtocolVersion};
use rmcp::service::{RunningService, ServiceError};
use rmcp::{RoleClient, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use std::sync::Arc;

type Client = RunningService<RoleClient, ()>;

fn google_server(env: &TestEnvironment) -> McpServer {
    let client = Arc::new(env.places_client());
    McpServer::new("restaurant-finder-mcp", ToolRegistry::for_places(client.clone(), client))
}

fn yelp_server(env: &TestEnvironment) -> McpServer {
    let client = Arc::new(env.business_client());
    McpServer::new("yelp-finder-mcp", ToolRegistry::for_business(client.clone(), client))
}

/// Serve `server` on an in-memory pipe and connect an MCP client to it
async fn connect(server: McpServer) -> Client {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        if let Ok(running) = server.serve(server_io).await {
            let _ = running.waiting().await;
        }
    });
    ().serve(client_io).await.expect("client should complete the handshake")
}

/// Call a tool and parse the JSON text it returns
async fn call(client: &Client, name: &str, arguments: Value) -> Result<Value, ServiceError> {
    let result = client
        .call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: arguments.as_object().cloned(),
        })
        .await?;

    let rendered = serde_json::to_value(&result).unwrap();
    let text = rendered["content"][0]["text"]
        .as_str()
        .expect("tool call should return text content");
    Ok(serde_json::from_str(text).unwrap())
}

fn mcp_error(err: ServiceError) -> ErrorData {
    match err {
        ServiceError::McpError(error) => error,
        other => panic!("expected an MCP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_initialize_and_list_tools() -> Result<()> {
    let server = Server::new_async().await;
    let env = TestEnvironment::new(&server);

    let mcp = google_server(&env);
    let info = mcp.get_info();
    assert_eq!(info.protocol_version, ProtocolVersion::V_2024_11_05);
    assert_eq!(info.server_info.name, "restaurant-finder-mcp");
    assert!(info.capabilities.tools.is_some());

    let client = connect(mcp).await;
    let tools = client.list_all_tools().await?;
    assert_eq!(tools.len(), 13);
    assert!(tools.iter().all(|t| t.input_schema.get("type") == Some(&json!("object"))));
    for name in ["find_restaurants_along_route", "get_peak_hours", "extract_popular_dishes", "get_usage_stats"] {
        assert!(tools.iter().any(|t| t.name == name), "missing {}", name);
    }

    let yelp = connect(yelp_server(&env)).await;
    assert_eq!(yelp.list_all_tools().await?.len(), 7);
    Ok(())
}

#[tokio::test]
async fn test_tool_errors_map_to_protocol_codes() -> Result<()> {
    let server = Server::new_async().await;
    let env = TestEnvironment::new(&server);
    let client = connect(google_server(&env)).await;

    let unknown = mcp_error(call(&client, "book_a_table", json!({})).await.unwrap_err());
    assert_eq!(unknown.code, ErrorCode::METHOD_NOT_FOUND);
    assert!(unknown.message.contains("book_a_table"));

    let invalid = mcp_error(
        call(&client, "get_restaurant_hours", json!({"restaurant_name": 7}))
            .await
            .unwrap_err(),
    );
    assert_eq!(invalid.code, ErrorCode::INVALID_PARAMS);

    // The session survives failed calls
    let stats = call(&client, "get_usage_stats", json!({})).await?;
    assert_eq!(stats["cache"]["cache_hit_rate"], "0.0%");
    Ok(())
}

#[tokio::test]
async fn test_find_by_location_is_cached_and_metered() -> Result<()> {
    let mut server = Server::new_async().await;
    let geocode = mock_google(&mut server, "geocode", vec![], TIMES_SQUARE_GEOCODE).await;
    let nearby = mock_google(
        &mut server,
        "place/nearbysearch",
        vec![Matcher::UrlEncoded("type".into(), "restaurant".into())],
        NEARBY_RESULTS,
    )
    .await;
    let details = mock_google(
        &mut server,
        "place/details",
        vec![Matcher::UrlEncoded("place_id".into(), "p1".into())],
        JOES_DETAILS,
    )
    .await;

    let env = TestEnvironment::new(&server);
    let client = connect(google_server(&env)).await;
    let arguments = json!({"location": "Times Square", "min_rating": 4.5, "max_price_level": 2});

    let restaurants = call(&client, "find_restaurants_by_location", arguments.clone()).await?;
    assert_eq!(restaurants.as_array().map(Vec::len), Some(1));
    assert_eq!(restaurants[0]["name"], "Joe's Pizza");
    assert_eq!(restaurants[0]["price_level"], "$");
    assert_eq!(restaurants[0]["cuisine_types"], json!(["Pizza Restaurant"]));
    assert_eq!(restaurants[0]["reviews"][0]["author"], "Sam");

    // Identical call is answered from the cache
    let second = call(&client, "find_restaurants_by_location", arguments).await?;
    assert_eq!(second, restaurants);

    geocode.assert_async().await;
    nearby.assert_async().await;
    details.assert_async().await;

    let stats = call(&client, "get_usage_stats", json!({})).await?;
    assert_eq!(stats["cache"]["api_calls_made"], 3);
    assert_eq!(stats["cache"]["api_calls_saved"], 3);
    assert_eq!(stats["cache"]["cache_hit_rate"], "50.0%");
    assert_eq!(stats["usage"]["month"], "2026-10");
    assert_eq!(stats["usage"]["total_api_calls"], 3);
    assert_eq!(stats["usage"]["estimated_cost"], "$0.05");
    assert_eq!(stats["usage"]["calls_by_api"]["places_nearby"], 1);
    assert_eq!(stats["usage"]["within_free_tier"], true);
    assert!(stats["warning"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_unknown_location_is_a_domain_error() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_google(&mut server, "geocode", vec![], r#"{"status": "ZERO_RESULTS", "results": []}"#).await;

    let env = TestEnvironment::new(&server);
    let client = connect(google_server(&env)).await;

    // A domain miss is a successful call carrying an error field
    let response = call(&client, "recommend_restaurants", json!({"location": "Atlantis"})).await?;
    assert_eq!(response["error"], "Could not find location: Atlantis");
    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_is_internal_error_and_not_cached() -> Result<()> {
    let mut server = Server::new_async().await;
    let denied = server
        .mock("GET", "/geocode/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "OVER_QUERY_LIMIT", "results": []}"#)
        .expect(2)
        .create_async()
        .await;

    let env = TestEnvironment::new(&server);
    let client = connect(google_server(&env)).await;
    let arguments = json!({"location": "Times Square"});

    let first = mcp_error(
        call(&client, "find_restaurants_by_location", arguments.clone())
            .await
            .unwrap_err(),
    );
    assert_eq!(first.code, ErrorCode::INTERNAL_ERROR);
    assert!(first.message.starts_with("Internal error:"));
    assert!(first.message.contains("OVER_QUERY_LIMIT"));

    // The failure was not remembered, so the upstream is asked again
    assert!(call(&client, "find_restaurants_by_location", arguments).await.is_err());
    denied.assert_async().await;

    let stats = call(&client, "get_usage_stats", json!({})).await?;
    assert_eq!(stats["usage"]["total_api_calls"], 0);
    Ok(())
}

#[tokio::test]
async fn test_yelp_details_survive_review_failure() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/businesses/search")
        .match_query(Matcher::UrlEncoded("term".into(), "Taco Shack".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"businesses": [{"id": "taco-shack", "name": "Taco Shack", "distance": 804.67}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/businesses/taco-shack")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": "taco-shack",
                "name": "Taco Shack",
                "rating": 4.5,
                "review_count": 88,
                "price": "$",
                "url": "https://www.yelp.com/biz/taco-shack",
                "location": {"display_address": ["1 Main St", "Austin, TX"]},
                "hours": [{"is_open_now": true, "open": [{"day": 0, "start": "0800", "end": "1500"}]}]
            }"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/businesses/taco-shack/reviews")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let env = TestEnvironment::new(&server);
    let client = connect(yelp_server(&env)).await;
    let arguments = json!({"restaurant_name": "Taco Shack", "location": "Austin, TX"});

    let details = call(&client, "get_restaurant_details", arguments.clone()).await?;
    assert_eq!(details["name"], "Taco Shack");
    assert_eq!(details["address"], "1 Main St, Austin, TX");
    assert_eq!(details["hours"][0], "Monday: 08:00 - 15:00");
    assert_eq!(details["review_summary"]["total_reviews"], 0);
    assert!(details["note"].is_string());

    let hours = call(&client, "get_restaurant_hours", arguments).await?;
    assert_eq!(hours["open_now"], true);

    // One search and one details lookup reached the upstream; the failed reviews call did not count
    let stats = call(&client, "get_usage_stats", json!({})).await?;
    assert_eq!(stats["usage"]["date"], "2026-10-17");
    assert_eq!(stats["usage"]["total_api_calls"], 2);
    assert_eq!(stats["usage"]["remaining_calls"], 498);
    assert_eq!(stats["usage"]["usage_percentage"], "0.4%");
    Ok(())
}
