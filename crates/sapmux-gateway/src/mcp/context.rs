//! Request context utilities

use rmcp::model::Extensions;

use sapmux_core::{AuthContext, Credential};

/// Credential from the `Authorization` header of the HTTP request carrying
/// this message; `None` on stdio or when the header is absent or malformed
pub fn extract_credential(extensions: &Extensions) -> Option<Credential> {
    extensions
        .get::<http::request::Parts>()
        .and_then(|parts| parts.headers.get(http::header::AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .and_then(Credential::from_authorization_header)
}

/// Per-call authentication context (anonymous when no credential was sent)
pub fn call_auth(extensions: &Extensions) -> AuthContext {
    extract_credential(extensions)
        .map(AuthContext::with_credential)
        .unwrap_or_default()
}
