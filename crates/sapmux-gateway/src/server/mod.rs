//! Gateway Server
//!
//! Serves the tool registry over MCP, either as Streamable HTTP (axum, one
//! session per `Mcp-Session-Id`) or over stdio.

mod dependencies;
mod handlers;
mod service_container;
mod startup;

pub use dependencies::{DependenciesBuilder, GatewayDependencies};
pub use handlers::HealthResponse;
pub use service_container::ServiceContainer;
pub use startup::{CatalogLoadResult, StartupOrchestrator};

use anyhow::Context as _;
use axum::{routing::get, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use sapmux_core::SapMuxConfig;

use crate::mcp::SapMuxHandler;
use crate::registry::ToolRegistry;

pub const DEFAULT_GATEWAY_PORT: u16 = 3220;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Permissive CORS for browser-based MCP clients
    pub enable_cors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_GATEWAY_PORT,
            enable_cors: true,
        }
    }
}

impl GatewayConfig {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

pub struct GatewayServer {
    config: GatewayConfig,
    services: ServiceContainer,
    /// Credential preset for the stdio session only
    user_token: Option<String>,
}

impl GatewayServer {
    /// Populate the catalog, wire the services and register the tools
    pub async fn start(
        config: GatewayConfig,
        settings: &SapMuxConfig,
        dependencies: GatewayDependencies,
    ) -> Self {
        info!("[Gateway] Initializing...");

        let orchestrator =
            StartupOrchestrator::new(dependencies.discovery.clone(), settings.discovery_timeout);
        let loaded = orchestrator.populate_catalog().await;
        if let Some(reason) = &loaded.degraded {
            warn!("[Gateway] Serving with an empty catalog: {}", reason);
        }

        let services = ServiceContainer::initialize(&dependencies, loaded.catalog, settings);
        services.registry.register_all().await;

        info!("[Gateway] Services initialized successfully");
        Self {
            config,
            services,
            user_token: settings.user_token.clone(),
        }
    }

    pub fn services(&self) -> &ServiceContainer {
        &self.services
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.services.registry
    }

    /// Session registry for the single stdio client, carrying the preset
    /// user token. HTTP sessions never see it.
    pub fn stdio_registry(&self) -> ToolRegistry {
        let registry = self.services.registry.for_session();
        if self.user_token.is_some() {
            registry.set_credential(self.user_token.clone());
        }
        registry
    }

    /// `/health` plus the Streamable HTTP MCP endpoint at `/mcp`
    pub fn build_router(&self) -> Router {
        let registry = self.services.registry.clone();

        // Stateful: each session gets its own handler and credential slot
        let mcp_service = StreamableHttpService::new(
            move || {
                debug!("[Gateway] Creating handler instance for MCP session");
                Ok(SapMuxHandler::new(registry.for_session()))
            },
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                stateful_mode: true,
                sse_keep_alive: Some(std::time::Duration::from_secs(30)),
                sse_retry: Some(std::time::Duration::from_secs(3)),
                cancellation_token: CancellationToken::new(),
            },
        );

        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .with_state(self.services.catalog.clone())
            .nest_service("/mcp", mcp_service)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router
    }

    pub async fn run_http(self) -> anyhow::Result<()> {
        let addr = self.config.addr()?;

        info!("[Gateway] Starting on {}", addr);
        info!(
            "[Gateway] CORS: {}",
            if self.config.enable_cors {
                "enabled"
            } else {
                "disabled"
            }
        );

        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("[Gateway] Ready to accept connections on http://{}/mcp", addr);
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Serve a single session over stdin/stdout
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!("[Gateway] Serving MCP over stdio");
        let handler = SapMuxHandler::new(self.stdio_registry());
        let service = handler
            .serve(rmcp::transport::stdio())
            .await
            .context("Failed to start stdio MCP session")?;
        let reason = service.waiting().await?;
        info!("[Gateway] stdio session ended: {:?}", reason);
        Ok(())
    }

    /// Start the HTTP server in the background
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run_http().await })
    }
}
