use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zeroday::config::{DetectorConfig, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "zeroday",
    about = "Streaming zero-day traffic anomaly detector",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to the traffic channel and detect anomalies until interrupted
    Run {
        /// Redis URL of the message bus
        #[arg(long)]
        redis_url: Option<String>,

        /// Channel carrying raw traffic records
        #[arg(long)]
        ingress_channel: Option<String>,

        /// Channel alerts are published to
        #[arg(long)]
        egress_channel: Option<String>,
    },

    /// Feed records from a file (or stdin) through the detector offline
    Replay {
        /// Input file with one `identifier|timestamp|feature_value` record per line
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Stderr subscriber used while the configuration itself is being resolved.
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        DetectorConfig::resolve(cli.config.as_deref())
    })?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Run {
            redis_url,
            ingress_channel,
            egress_channel,
        } => {
            if let Some(url) = redis_url {
                config.transport.url = url;
            }
            if let Some(channel) = ingress_channel {
                config.transport.ingress_channel = channel;
            }
            if let Some(channel) = egress_channel {
                config.transport.egress_channel = channel;
            }
            tracing::info!(url = %config.transport.url, "Starting zero-day detector");
            zeroday::run(config).await?;
        }
        Commands::Replay { input } => {
            tracing::info!(input = ?input, "Replaying records");
            let summary = zeroday::replay(config, input.as_deref()).await?;
            eprintln!("{}", summary);
        }
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&config).context("failed to render configuration")?;
            print!("{}", rendered);
        }
    }

    Ok(())
}
