//! MCP server handler using the rmcp SDK.
//!
//! rmcp owns framing, the initialize handshake and notifications. This
//! handler advertises the registry's tools and runs tool calls one at a time
//! in the order they arrive.

use anyhow::{Context, Result};
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool as RmcpTool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde_json::Value;
use std::sync::Arc;

use crate::tools::{ToolError, ToolRegistry};

pub struct McpServer {
    name: String,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, registry: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Tool descriptors as advertised by `tools/list`
    pub fn tool_descriptors(&self) -> Vec<RmcpTool> {
        self.registry
            .tools_schema()
            .into_iter()
            .map(|schema| {
                let input_schema: JsonObject = match schema.get("inputSchema") {
                    Some(Value::Object(object)) => object.clone(),
                    _ => JsonObject::new(),
                };
                let name = schema["name"].as_str().unwrap_or_default().to_string();
                let description = schema["description"].as_str().unwrap_or_default().to_string();
                RmcpTool::new(name, description, Arc::new(input_schema))
            })
            .collect()
    }

    /// Run one tool call, translating tool failures into MCP errors
    pub async fn dispatch(&self, request: CallToolRequestParam) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);

        tracing::info!("Calling tool {}", request.name);
        match self.registry.execute_tool(&request.name, arguments).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Err(match e.downcast_ref::<ToolError>() {
                Some(ToolError::UnknownTool(_)) => {
                    McpError::new(ErrorCode::METHOD_NOT_FOUND, e.to_string(), None)
                }
                Some(ToolError::InvalidArguments { .. }) => {
                    McpError::new(ErrorCode::INVALID_PARAMS, e.to_string(), None)
                }
                None => {
                    tracing::warn!("Tool {} failed: {:#}", request.name, e);
                    McpError::new(ErrorCode::INTERNAL_ERROR, format!("Internal error: {:#}", e), None)
                }
            }),
        }
    }

    /// Serve requests on stdin/stdout until the client disconnects
    pub async fn serve_stdio(self) -> Result<()> {
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .context("Failed to start MCP server")?;

        let reason = service.waiting().await.context("MCP server task failed")?;
        tracing::info!("MCP session ended: {:?}", reason);
        Ok(())
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = Implementation::from_build_env();
        implementation.name = self.name.clone();
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: implementation,
            instructions: Some(
                "Restaurant search tools. Responses are cached and API usage is tracked; \
                 call get_usage_stats to see free-tier consumption."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_descriptors()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::UsageReport;
    use crate::providers::UsageReporter;
    use crate::tools::UsageStatsTool;
    use crate::usage::{NullMeter, UsageMeter};
    use serde_json::json;

    struct EmptyReporter;

    impl UsageReporter for EmptyReporter {
        fn usage_report(&self) -> anyhow::Result<UsageReport> {
            let meter: &dyn UsageMeter = &NullMeter;
            UsageReport::collect(Default::default(), meter)
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UsageStatsTool::new(Arc::new(EmptyReporter))));
        McpServer::new("test-mcp", registry)
    }

    #[test]
    fn test_server_info() {
        let info = server().get_info();
        assert_eq!(info.protocol_version, ProtocolVersion::V_2024_11_05);
        assert_eq!(info.server_info.name, "test-mcp");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_tool_descriptors_carry_input_schema() {
        let tools = server().tool_descriptors();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_usage_stats");
        assert_eq!(tools[0].input_schema.get("type"), Some(&json!("object")));
    }

    #[tokio::test]
    async fn test_dispatch_maps_errors() {
        let server = server();

        let unknown = server
            .dispatch(CallToolRequestParam {
                name: "teleport".into(),
                arguments: None,
            })
            .await
            .unwrap_err();
        assert_eq!(unknown.code, ErrorCode::METHOD_NOT_FOUND);

        let result = server
            .dispatch(CallToolRequestParam {
                name: "get_usage_stats".into(),
                arguments: None,
            })
            .await
            .unwrap();
        let rendered = serde_json::to_value(&result).unwrap();
        let text = rendered["content"][0]["text"].as_str().unwrap();
        let report: Value = serde_json::from_str(text).unwrap();
        assert_eq!(report["cache"]["cache_hit_rate"], "0.0%");
    }
}
