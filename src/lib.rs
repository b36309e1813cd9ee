//! zeroday -- streaming zero-day traffic anomaly detector.
//!
//! Consumes `identifier|timestamp|feature_value` records from a pub/sub
//! channel, keeps a sliding window of recent feature values, periodically
//! retrains an isolation forest on that window, and publishes an alert for
//! every event the current model judges anomalous.

pub mod alert;
pub mod config;
pub mod detect;
pub mod ingest;
pub mod pipeline;
pub mod stats;
pub mod transport;

use std::path::Path;

use anyhow::{Context, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info, warn};

use crate::alert::StdoutSink;
use crate::config::DetectorConfig;
use crate::pipeline::Pipeline;
use crate::stats::StatsSummary;
use crate::transport::RedisBus;

/// Print the startup banner.
pub fn print_banner(config: &DetectorConfig) {
    println!();
    println!("  AI Zero-Day Detector");
    println!("  ====================");
    println!("  Message bus   : {}", config.transport.url);
    println!("  Ingress       : {}", config.transport.ingress_channel);
    println!("  Egress        : {}", config.transport.egress_channel);
    println!("  Window        : {} samples", config.window.capacity);
    println!("  Warm-up       : {} samples", config.window.warmup_threshold);
    println!("  Retrain every : {} records", config.model.retrain_interval);
    println!("  Contamination : {}", config.model.contamination);
    println!();
}

/// Run the detector against the configured message bus until interrupted.
///
/// Failing to reach the bus or subscribe is fatal; everything after that is
/// handled per record.
pub async fn run(config: DetectorConfig) -> Result<StatsSummary> {
    config.validate().context("invalid configuration")?;
    print_banner(&config);

    let bus = RedisBus::connect(&config.transport.url)
        .await
        .context("failed to connect to message bus")?;
    let records = bus
        .subscribe(&config.transport.ingress_channel)
        .await
        .context("failed to subscribe to ingress channel")?;
    let sink = bus
        .alert_sink(&config.transport.egress_channel)
        .await
        .context("failed to open alert publisher")?;

    info!("Listening for traffic... (Ctrl+C to stop)");

    let mut pipeline = Pipeline::new(&config, sink);
    let summary = pipeline
        .run(records, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for interrupt signal");
                futures::future::pending::<()>().await;
            }
        })
        .await;

    info!("Shutting down detector...");
    info!("Final stats: {}", summary);
    Ok(summary)
}

/// Yield lines from `reader` as they arrive. A read error ends the stream.
fn replay_lines(reader: Box<dyn AsyncRead + Unpin + Send>) -> BoxStream<'static, String> {
    let lines = BufReader::new(reader).lines();
    futures::stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "replay input read failed, stopping");
                None
            }
        }
    })
    .boxed()
}

/// Feed records from `input` (or stdin) through the pipeline offline.
///
/// Records are processed as each line arrives. Alerts are written to stdout
/// as JSON lines.
pub async fn replay(config: DetectorConfig, input: Option<&Path>) -> Result<StatsSummary> {
    config.validate().context("invalid configuration")?;

    let reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to read replay input: {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let records = replay_lines(reader);

    let mut pipeline = Pipeline::new(&config, StdoutSink);
    let summary = pipeline
        .run(records, futures::future::pending::<()>())
        .await;

    info!("Replay complete: {}", summary);
    Ok(summary)
}
