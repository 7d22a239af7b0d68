//! sapmux binary
//!
//! Loads `.env`, initializes tracing and serves the gateway over stdio or
//! Streamable HTTP.

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use sapmux_core::SapMuxConfig;
use sapmux_gateway::{GatewayConfig, GatewayDependencies, GatewayServer};

const LOG_PREFIX: &str = "sapmux";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Parser)]
#[command(name = "sapmux", version, about = "Progressive-discovery MCP server for SAP OData services")]
struct Cli {
    /// MCP transport
    #[arg(long, value_enum, default_value = "stdio", env = "SAPMUX_TRANSPORT")]
    transport: Transport,

    /// Listen host (http transport)
    #[arg(long, default_value = "127.0.0.1", env = "SAPMUX_HOST")]
    host: String,

    /// Listen port (http transport)
    #[arg(long, default_value_t = sapmux_gateway::server::DEFAULT_GATEWAY_PORT, env = "SAPMUX_PORT")]
    port: u16,

    /// Disable permissive CORS on the http transport
    #[arg(long)]
    no_cors: bool,

    /// Also write daily-rotated log files (to SAPMUX_LOG_DIR or the user data directory)
    #[arg(long, env = "SAPMUX_LOG_TO_FILE")]
    log_to_file: bool,
}

fn logs_dir() -> Option<PathBuf> {
    std::env::var_os("SAPMUX_LOG_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::data_local_dir().map(|d| d.join(LOG_PREFIX).join("logs")))
}

/// Console layer on stderr (stdout carries the stdio transport), optional file layer
fn init_tracing(log_to_file: bool) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info,sapmux_core=debug,sapmux_gateway=debug,sapmux=debug")
            .context("Invalid default log filter")?,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let (file_layer, guard) = match logs_dir().filter(|_| log_to_file) {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_PREFIX)
                .filename_suffix("log")
                .build(&dir)
                .context("Failed to create log file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_tracing(cli.log_to_file)?;

    let settings = SapMuxConfig::from_env().context("Invalid SapMux configuration")?;
    info!(
        "[Startup] SapMux v{} ({} registry, {} transport)",
        env!("CARGO_PKG_VERSION"),
        settings.registry_mode.as_str(),
        match cli.transport {
            Transport::Stdio => "stdio",
            Transport::Http => "http",
        }
    );

    let dependencies = GatewayDependencies::from_config(&settings)?;
    let gateway_config = GatewayConfig {
        host: cli.host,
        port: cli.port,
        enable_cors: !cli.no_cors,
    };
    let server = GatewayServer::start(gateway_config, &settings, dependencies).await;

    match cli.transport {
        Transport::Stdio => server.run_stdio().await,
        Transport::Http => server.run_http().await,
    }
}
