//! MCP (Model Context Protocol) server.
//!
//! Exposes a [`ToolRegistry`](crate::tools::ToolRegistry) to MCP clients
//! through the rmcp SDK, served over stdin/stdout.

pub mod server;

pub use server::McpServer;
