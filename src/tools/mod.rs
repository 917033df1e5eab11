use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::providers::{BusinessProvider, PlacesProvider, UsageReporter};

pub mod business;
pub mod format;
pub mod places;

/// Failures the protocol layer reports with their own error codes
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

/// Decode tool arguments, reporting failures as [`ToolError::InvalidArguments`]
pub fn parse_args<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T> {
    // Clients may omit `arguments` entirely for tools without required fields
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| {
        ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// A domain miss, returned to the caller as an `{"error": ...}` result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound(pub String);

impl NotFound {
    pub fn location(location: &str) -> Self {
        Self(format!("Could not find location: {}", location))
    }

    pub fn restaurant(name: &str) -> Self {
        Self(format!("Could not find restaurant: {}", name))
    }

    pub fn into_value(self) -> Value {
        json!({ "error": self.0 })
    }
}

/// Outcome of a lookup that may legitimately find nothing
pub type Lookup<T> = std::result::Result<T, NotFound>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, params: Value) -> Result<Value>;
}

/// Reports cache performance and free-tier usage
pub struct UsageStatsTool {
    reporter: Arc<dyn UsageReporter>,
}

impl UsageStatsTool {
    pub fn new(reporter: Arc<dyn UsageReporter>) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl Tool for UsageStatsTool {
    fn name(&self) -> &str {
        "get_usage_stats"
    }

    fn description(&self) -> &str {
        "Get API usage statistics, cache performance, and free tier status"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value) -> Result<Value> {
        Ok(self.reporter.usage_report()?.to_json())
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools backed by the geocoding/places provider
    pub fn for_places(places: Arc<dyn PlacesProvider>, reporter: Arc<dyn UsageReporter>) -> Self {
        use places::*;

        let mut registry = Self::new();
        registry.register(Box::new(FindByLocationTool::new(places.clone())));
        registry.register(Box::new(FindAlongRouteTool::new(places.clone())));
        registry.register(Box::new(RestaurantDetailsTool::new(places.clone())));
        registry.register(Box::new(CompareRestaurantsTool::new(places.clone())));
        registry.register(Box::new(RestaurantHoursTool::new(places.clone())));
        registry.register(Box::new(DirectionsTool::new(places.clone())));
        registry.register(Box::new(NearbyAlternativesTool::new(places.clone())));
        registry.register(Box::new(RecommendTool::new(places.clone())));
        registry.register(Box::new(ReviewLinkTool::new(places.clone())));
        registry.register(Box::new(PopularDishesTool::new(places.clone())));
        registry.register(Box::new(RestaurantFeaturesTool::new(places.clone())));
        registry.register(Box::new(PeakHoursTool::new(places)));
        registry.register(Box::new(UsageStatsTool::new(reporter)));
        registry
    }

    /// Tools backed by the business-search provider
    pub fn for_business(business: Arc<dyn BusinessProvider>, reporter: Arc<dyn UsageReporter>) -> Self {
        use business::*;

        let mut registry = Self::new();
        registry.register(Box::new(FindByLocationTool::new(business.clone())));
        registry.register(Box::new(RestaurantDetailsTool::new(business.clone())));
        registry.register(Box::new(CompareRestaurantsTool::new(business.clone())));
        registry.register(Box::new(RestaurantHoursTool::new(business.clone())));
        registry.register(Box::new(NearbyAlternativesTool::new(business.clone())));
        registry.register(Box::new(RecommendTool::new(business)));
        registry.register(Box::new(UsageStatsTool::new(reporter)));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tool descriptors in the shape `tools/list` returns
    pub fn tools_schema(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.parameters_schema()
                })
            })
            .collect()
    }

    pub async fn execute_tool(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tracing::debug!("Executing tool {}", name);
        tool.execute(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::UsageReport;
    use crate::usage::{NullMeter, UsageMeter};

    struct EmptyReporter;

    impl UsageReporter for EmptyReporter {
        fn usage_report(&self) -> Result<UsageReport> {
            let meter: &dyn UsageMeter = &NullMeter;
            UsageReport::collect(Default::default(), meter)
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct Args {
        #[allow(dead_code)]
        location: String,
    }

    #[test]
    fn test_parse_args_reports_invalid_arguments() {
        let err = parse_args::<Args>("find", json!({"radius": 5})).unwrap_err();
        let tool_err = err.downcast_ref::<ToolError>().unwrap();
        assert!(matches!(tool_err, ToolError::InvalidArguments { .. }));
        assert!(err.to_string().contains("location"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UsageStatsTool::new(Arc::new(EmptyReporter))));

        assert_eq!(registry.tool_names(), vec!["get_usage_stats"]);
        let err = registry.execute_tool("teleport", Value::Null).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolError>(),
            Some(ToolError::UnknownTool(name)) if name == "teleport"
        ));
    }

    #[tokio::test]
    async fn test_usage_stats_tool() {
        let tool = UsageStatsTool::new(Arc::new(EmptyReporter));
        let report = tool.execute(Value::Null).await.unwrap();

        assert_eq!(report["cache"]["cache_hit_rate"], "0.0%");
        assert!(report["usage"]["message"].is_string());
        assert!(report["warning"].is_null());
    }
}
