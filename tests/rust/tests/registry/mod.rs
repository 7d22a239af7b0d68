//! Tool registry integration tests
//!
//! The discover → getMetadata → executeOperation flow, per-session
//! credentials, and the per-entity (flat) tool surface.
