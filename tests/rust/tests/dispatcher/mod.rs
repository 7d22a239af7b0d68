//! Operation dispatcher integration tests
//!
//! Validation before any remote call, credential policy, and the request
//! shapes sent for each operation.

mod operations;
mod validation;
