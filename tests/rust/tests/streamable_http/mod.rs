//! Streamable HTTP Transport Integration Tests
//!
//! Runs the gateway router on a random port and talks to it with an rmcp
//! client, the same way an MCP host would.

mod gateway_session;
