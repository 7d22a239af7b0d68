//! Trace Context - per tool call correlation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

static CALL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Short trace id, 6 hex characters (e.g. "a1b2c3")
pub fn generate_trace_id() -> String {
    let counter = CALL_COUNTER.fetch_add(1, Ordering::Relaxed);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);

    format!("{:06x}", counter.wrapping_add(timestamp) & 0xFFFFFF)
}

/// One tool invocation from entry to result
#[derive(Debug, Clone)]
pub struct ToolCallTrace {
    pub trace_id: String,
    pub tool: String,
    /// `serviceId/entityName operation` when the call targets an entity
    pub target: Option<String>,
    pub started_at: Instant,
}

impl ToolCallTrace {
    pub fn new(tool: &str) -> Self {
        Self {
            trace_id: generate_trace_id(),
            tool: tool.to_string(),
            target: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn log_entry(&self) {
        match &self.target {
            Some(target) => info!(trace_id = %self.trace_id, "→ {} {}", self.tool, target),
            None => info!(trace_id = %self.trace_id, "→ {}", self.tool),
        }
    }

    /// `error` carries the failure kind when the call failed
    pub fn log_exit(&self, error: Option<&str>) {
        let elapsed = self.elapsed_ms();
        match error {
            Some(kind) => warn!(
                trace_id = %self.trace_id,
                "← {} failed: {} ({}ms)",
                self.tool,
                kind,
                elapsed
            ),
            None => info!(trace_id = %self.trace_id, "← {} ok ({}ms)", self.tool, elapsed),
        }
    }
}
