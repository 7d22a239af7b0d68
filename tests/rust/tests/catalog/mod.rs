//! Service catalog integration tests
//!
//! Catalog search behaviour and startup population from discovery sources.

mod search;
