//! # SapMux Core Library
//!
//! Domain model, metadata parsing and the service catalog for SapMux.
//!
//! ## Modules
//!
//! - `domain` - Core entities (ServiceDescriptor, EntitySchema, OperationRequest, AuthContext)
//! - `edm` - OData EDM (EDMX) metadata parsing into normalized entity schemas
//! - `collaborator` - Traits for the external discovery, metadata and execution collaborators
//! - `service` - Service catalog cache and HTTP/file implementations of the collaborators

pub mod collaborator;
pub mod domain;
pub mod edm;
pub mod service;

// Re-export commonly used types
pub use collaborator::*;
pub use domain::*;
pub use service::*;
