//! Application services
//!
//! - `ServiceCatalog`: in-memory catalog of discovered services
//! - `SapCatalogDiscovery` / `FileCatalogDiscovery`: discovery collaborators
//! - `HttpMetadataSource`: `$metadata` fetch collaborator
//! - `SapHttpClient`: shared reqwest client with SAP conventions

mod catalog;
mod discovery;
mod http_client;
mod metadata_source;

pub use catalog::{CatalogMatch, CatalogQuery, CatalogSearch, ServiceCatalog};
pub use discovery::{categorize, FileCatalogDiscovery, SapCatalogDiscovery};
pub use http_client::SapHttpClient;
pub use metadata_source::HttpMetadataSource;
