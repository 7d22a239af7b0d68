//! Shared HTTP plumbing for talking to the SAP system

use anyhow::{Context as _, Result};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::time::Duration;

use crate::domain::{Credential, SapMuxConfig, SapMuxError, SapMuxResult};

const USER_AGENT: &str = concat!("SapMux/", env!("CARGO_PKG_VERSION"));

/// reqwest client plus the system-wide technical credential and `sap-client`
#[derive(Clone)]
pub struct SapHttpClient {
    client: reqwest::Client,
    technical_credential: Option<Credential>,
    sap_client: Option<String>,
}

impl SapHttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            technical_credential: None,
            sap_client: None,
        })
    }

    pub fn from_config(config: &SapMuxConfig) -> Result<Self> {
        Ok(Self::new(config.request_timeout)?
            .with_technical_credential(config.technical_credential.clone())
            .with_sap_client(config.sap_client.clone()))
    }

    /// Create with a custom reqwest client (useful for testing)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            technical_credential: None,
            sap_client: None,
        }
    }

    pub fn with_technical_credential(mut self, credential: Option<Credential>) -> Self {
        self.technical_credential = credential;
        self
    }

    pub fn with_sap_client(mut self, sap_client: Option<String>) -> Self {
        self.sap_client = sap_client;
        self
    }

    pub fn technical_credential(&self) -> Option<&Credential> {
        self.technical_credential.as_ref()
    }

    /// Start a request, attaching `credential` and `sap-client`.
    ///
    /// A credential that cannot be encoded as a header value fails the
    /// request instead of being sent without authorization.
    pub fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        credential: Option<&Credential>,
    ) -> SapMuxResult<reqwest::RequestBuilder> {
        let mut value = None;
        if let Some(credential) = credential {
            let header = credential.authorization_header();
            let mut encoded = HeaderValue::from_str(&header).map_err(|_| {
                SapMuxError::AuthenticationRequired {
                    operation: method.to_string(),
                    reason: Some("credential is not a valid header value".into()),
                }
            })?;
            encoded.set_sensitive(true);
            value = Some(encoded);
        }

        let mut builder = self.client.request(method, url);
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(sap_client) = &self.sap_client {
            builder = builder.query(&[("sap-client", sap_client.as_str())]);
        }
        Ok(builder)
    }

    /// GET with the technical credential, returning the body as text
    pub async fn get_text(&self, url: &str, accept: &str) -> Result<String> {
        let response = self
            .request(reqwest::Method::GET, url, self.technical_credential.as_ref())?
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned HTTP {}", url, status);
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}
