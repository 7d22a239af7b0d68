//! Domain entities and value objects
//!
//! This module contains all domain-level types for SapMux:
//! - Catalog entries (ServiceDescriptor, EntitySummary)
//! - Resolved schemas (EntitySchema, PropertyDescriptor, Capabilities, EdmType)
//! - Per-call requests (OperationRequest, Operation, QueryOptions)
//! - Authentication (AuthContext, Credential)
//! - Error kinds (SapMuxError, ErrorKind)

mod auth;
pub mod config;
mod entity;
mod error;
mod operation;
mod service;

pub use auth::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use operation::*;
pub use service::*;
