use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mnav_tracker::config::ResolvedConfig;
use mnav_tracker::refresh::RefreshOutcome;
use mnav_tracker::TrackerServiceBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mnav-tracker")]
#[command(about = "Tracks mNAV for ETH treasury equities")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = mnav_tracker::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,
    /// Run one refresh cycle and print the resulting snapshot
    Refresh,
    /// Print the snapshot history
    History,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
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

    let config = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Some(Command::Refresh) => {
            let service = TrackerServiceBuilder::new(config).build().await?;
            match service.trigger_manual_refresh().await {
                RefreshOutcome::Completed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
                    if let Some(err) = report.storage_error {
                        anyhow::bail!("snapshot not stored: {err}");
                    }
                }
                RefreshOutcome::Skipped => println!("refresh skipped: another cycle is running"),
            }
        }
        Some(Command::History) => {
            let service = TrackerServiceBuilder::new(config).build().await?;
            let history = service.history().await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        None => {
            println!("mNAV Tracker");
            println!("============\n");
            println!("Config: {}", cli.config.display());
            println!("Data directory: {}\n", config.data_dir.display());
            println!("Commands:");
            println!("  config    Show current configuration");
            println!("  refresh   Run one refresh cycle");
            println!("  history   Print the snapshot history\n");
            println!("Run 'mnav-tracker --help' for more options.");
        }
    }

    Ok(())
}
