//! reqwest-based execution collaborator
//!
//! Performs one OData exchange and classifies failures:
//! - transport errors and gateway timeouts → `RemoteUnavailable`
//! - error status with an OData error body → `RemoteFault`
//! - anything it cannot make sense of → `RemoteUnexpectedResponse`
//!
//! Modifying requests first fetch an `x-csrf-token` with the same credential.
//! Nothing is retried.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use sapmux_core::{
    Credential, ODataExecutor, ODataMethod, ODataRequest, ODataResponse, SapHttpClient,
    SapMuxError, SapMuxResult,
};

const CSRF_HEADER: &str = "x-csrf-token";
const BODY_EXCERPT: usize = 200;

pub struct HttpODataExecutor {
    http: SapHttpClient,
}

impl HttpODataExecutor {
    pub fn new(http: SapHttpClient) -> Self {
        Self { http }
    }

    async fn fetch_csrf_token(
        &self,
        service_url: &str,
        credential: Option<&Credential>,
    ) -> SapMuxResult<Option<String>> {
        let url = format!("{}/", service_url.trim_end_matches('/'));
        let response = self
            .http
            .request(Method::GET, &url, credential)?
            .header(CSRF_HEADER, "Fetch")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let token = csrf_token(response.headers());
        if token.is_none() {
            debug!(
                "[Dispatcher] No CSRF token returned by {} (HTTP {})",
                url,
                response.status()
            );
        }
        Ok(token)
    }
}

fn csrf_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.eq_ignore_ascii_case("required"))
        .map(str::to_string)
}

#[async_trait]
impl ODataExecutor for HttpODataExecutor {
    async fn execute(
        &self,
        request: ODataRequest,
        credential: Option<&Credential>,
    ) -> SapMuxResult<ODataResponse> {
        let mut url = request.resource_url();
        let query = request.query_string();
        if !query.is_empty() {
            url = format!("{}?{}", url, query);
        }

        let method = match request.method {
            ODataMethod::Get => Method::GET,
            ODataMethod::Post | ODataMethod::Merge => Method::POST,
            ODataMethod::Patch => Method::PATCH,
            ODataMethod::Delete => Method::DELETE,
        };

        let csrf = if request.method.is_modifying() {
            self.fetch_csrf_token(&request.service_url, credential).await?
        } else {
            None
        };

        debug!("[Dispatcher] {} {}", request.method, url);
        let mut builder = self
            .http
            .request(method, &url, credential)?
            .header(ACCEPT, "application/json");
        if request.method == ODataMethod::Merge {
            builder = builder.header("X-HTTP-Method", "MERGE");
        }
        if let Some(token) = csrf {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
                return Ok(ODataResponse::new(status.as_u16(), None));
            }
            return serde_json::from_str::<Value>(&text)
                .map(|body| ODataResponse::new(status.as_u16(), Some(body)))
                .map_err(|e| SapMuxError::RemoteUnexpectedResponse {
                    status: Some(status.as_u16()),
                    message: format!("response body is not JSON: {}", e),
                });
        }

        let error = classify_failure(status, &text);
        warn!("[Dispatcher] {} {} failed: {}", request.method, url, error);
        Err(error)
    }
}

fn transport_error(e: reqwest::Error) -> SapMuxError {
    let message = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    SapMuxError::RemoteUnavailable { message }
}

/// Map an error status and body onto the remote error kinds
pub fn classify_failure(status: StatusCode, body: &str) -> SapMuxError {
    if let Some((code, message)) = parse_odata_error(body) {
        return SapMuxError::RemoteFault {
            status: status.as_u16(),
            code,
            message,
        };
    }

    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        return SapMuxError::RemoteUnavailable {
            message: format!("HTTP {}", status),
        };
    }

    let excerpt: String = body.trim().chars().take(BODY_EXCERPT).collect();
    SapMuxError::RemoteUnexpectedResponse {
        status: Some(status.as_u16()),
        message: if excerpt.is_empty() {
            format!("HTTP {} without an OData error body", status)
        } else {
            format!("HTTP {} without an OData error body: {}", status, excerpt)
        },
    }
}

/// V2: `{"error":{"code","message":{"value"}}}`, V4: `{"error":{"code","message"}}`
fn parse_odata_error(body: &str) -> Option<(Option<String>, String)> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = match error.get("message")? {
        Value::String(s) => s.clone(),
        Value::Object(m) => m.get("value").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    Some((code, message))
}
