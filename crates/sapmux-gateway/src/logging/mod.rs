//! Tool call tracing
//!
//! Short trace ids correlate the entry and exit lines of one tool call.

mod trace_context;

pub use trace_context::{generate_trace_id, ToolCallTrace};
