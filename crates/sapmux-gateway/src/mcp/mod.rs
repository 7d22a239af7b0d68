//! MCP Server Implementation
//!
//! - `handler`: rmcp `ServerHandler` over the tool registry
//! - `context`: credential extraction from the HTTP request behind a message

pub mod context;
pub mod handler;

pub use handler::SapMuxHandler;
