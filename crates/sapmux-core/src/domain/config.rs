//! Runtime configuration
//!
//! Loaded from `SAPMUX_*` environment variables (usually populated from a
//! `.env` file by the binary). Parsing is done through a lookup function so
//! tests can feed values without touching the process environment.

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::time::Duration;

use super::Credential;

const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which tool surface the registry exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryMode {
    /// Three progressive-discovery tools
    #[default]
    Hierarchical,
    /// One CRUD tool per entity and operation
    Flat,
}

impl RegistryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::Flat => "flat",
        }
    }
}

impl std::str::FromStr for RegistryMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hierarchical" | "progressive" => Ok(Self::Hierarchical),
            "flat" | "crud" => Ok(Self::Flat),
            _ => Err(anyhow::anyhow!("Unknown SAPMUX_REGISTRY_MODE '{}'", s)),
        }
    }
}

/// Include/exclude glob filter on service ids
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
    pub max_services: Option<usize>,
}

impl ServiceFilter {
    pub fn new(include: &[&str], exclude: &[&str]) -> Result<Self> {
        Ok(Self {
            include: compile_patterns(include.iter().copied())?,
            exclude: compile_patterns(exclude.iter().copied())?,
            max_services: None,
        })
    }

    pub fn with_max_services(mut self, max: usize) -> Self {
        self.max_services = Some(max);
        self
    }

    /// An empty include list admits everything; exclusions always win
    pub fn matches(&self, service_id: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| p.matches_with(service_id, options));
        let excluded = self
            .exclude
            .iter()
            .any(|p| p.matches_with(service_id, options));
        included && !excluded
    }
}

fn compile_patterns<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<Vec<glob::Pattern>> {
    patterns
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid service pattern '{}'", p)))
        .collect()
}

/// SapMux runtime configuration
#[derive(Debug, Clone)]
pub struct SapMuxConfig {
    /// Base URL of the SAP system (catalog service and OData services)
    pub base_url: Option<String>,
    /// Static catalog file, used instead of the SAP catalog service when set
    pub catalog_file: Option<PathBuf>,
    pub service_filter: ServiceFilter,
    pub discovery_timeout: Duration,
    pub request_timeout: Duration,
    pub registry_mode: RegistryMode,
    /// Suppress every read-single shortcut tool at registration time
    pub disable_read_entity_tool: bool,
    /// Credential used for discovery, metadata and (optionally) reads
    pub technical_credential: Option<Credential>,
    /// Allow read/read-single to fall back to the technical credential
    pub allow_technical_read: bool,
    /// Session credential preset (stdio sessions)
    pub user_token: Option<String>,
    /// `sap-client` query parameter
    pub sap_client: Option<String>,
}

impl Default for SapMuxConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            catalog_file: None,
            service_filter: ServiceFilter::default(),
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            registry_mode: RegistryMode::default(),
            disable_read_entity_tool: false,
            technical_credential: None,
            allow_technical_read: true,
            user_token: None,
            sap_client: None,
        }
    }
}

impl SapMuxConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(base_url) = get("SAPMUX_BASE_URL") {
            url::Url::parse(&base_url)
                .with_context(|| format!("SAPMUX_BASE_URL is not a valid URL: {}", base_url))?;
            config.base_url = Some(base_url.trim_end_matches('/').to_string());
        }
        config.catalog_file = get("SAPMUX_CATALOG_FILE").map(PathBuf::from);

        let include = get("SAPMUX_SERVICE_PATTERNS").unwrap_or_default();
        let exclude = get("SAPMUX_SERVICE_EXCLUSIONS").unwrap_or_default();
        config.service_filter = ServiceFilter {
            include: compile_patterns(include.split(','))?,
            exclude: compile_patterns(exclude.split(','))?,
            max_services: get("SAPMUX_MAX_SERVICES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("SAPMUX_MAX_SERVICES must be a positive integer")?,
        };

        if let Some(secs) = get("SAPMUX_DISCOVERY_TIMEOUT_SECS") {
            config.discovery_timeout = Duration::from_secs(
                secs.parse()
                    .context("SAPMUX_DISCOVERY_TIMEOUT_SECS must be a number of seconds")?,
            );
        }
        if let Some(secs) = get("SAPMUX_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(
                secs.parse()
                    .context("SAPMUX_REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            );
        }

        if let Some(mode) = get("SAPMUX_REGISTRY_MODE") {
            config.registry_mode = mode.parse()?;
        }
        config.disable_read_entity_tool = parse_bool(get("SAPMUX_DISABLE_READ_ENTITY_TOOL"), false)?;
        config.allow_technical_read = parse_bool(get("SAPMUX_ALLOW_TECHNICAL_READ"), true)?;

        config.technical_credential = match (
            get("SAPMUX_TECHNICAL_TOKEN"),
            get("SAPMUX_TECHNICAL_USER"),
            get("SAPMUX_TECHNICAL_PASSWORD"),
        ) {
            (Some(token), _, _) => Some(Credential::bearer(token)),
            (None, Some(user), Some(password)) => Some(Credential::basic(user, password)),
            (None, Some(_), None) => {
                anyhow::bail!("SAPMUX_TECHNICAL_USER is set but SAPMUX_TECHNICAL_PASSWORD is missing")
            }
            _ => None,
        };

        config.user_token = get("SAPMUX_USER_TOKEN");
        config.sap_client = get("SAPMUX_SAP_CLIENT");

        Ok(config)
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("Invalid boolean value '{}'", other),
    }
}
