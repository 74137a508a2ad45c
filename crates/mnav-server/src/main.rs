use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mnav_tracker::config::{RefreshMode, ResolvedConfig, DEFAULT_CONFIG_FILE};
use mnav_tracker::TrackerServiceBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Scheduled,
    OnDemand,
}

impl From<ModeArg> for RefreshMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Scheduled => RefreshMode::Scheduled,
            ModeArg::OnDemand => RefreshMode::OnDemand,
        }
    }
}

#[derive(Parser)]
#[command(name = "mnav-server")]
#[command(about = "HTTP API for the mNAV tracker")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Override the configured refresh mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = ResolvedConfig::load_or_default(&cli.config)?;
    if let Some(mode) = cli.mode {
        config.refresh.mode = mode.into();
    }

    let service = Arc::new(TrackerServiceBuilder::new(config).build().await?);
    let scheduler = service.coordinator().start();

    let app = mnav_server::app(service);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", cli.bind, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("mNAV tracker listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully stopping");
}
