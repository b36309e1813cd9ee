//! Alert records for anomalous events and the channel they are published on.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::ingest::TrafficEvent;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode alert: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish alert on {channel}: {reason}")]
    Channel { channel: String, reason: String },
}

/// Alert category. Only zero-day detections exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ZeroDay,
}

/// Wire form: `{"ip", "payload_size", "timestamp", "type"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(rename = "ip")]
    pub source_identifier: String,
    #[serde(rename = "payload_size")]
    pub feature_value: i64,
    /// Wall-clock detection time, seconds since the epoch.
    #[serde(rename = "timestamp")]
    pub detected_at: i64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
}

impl AlertEvent {
    pub fn zero_day(event: &TrafficEvent, detected_at: i64) -> Self {
        Self {
            source_identifier: event.source_identifier.clone(),
            feature_value: event.feature_value,
            detected_at,
            kind: AlertKind::ZeroDay,
        }
    }

    pub fn to_json(&self) -> Result<String, PublishError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outbound channel for alerts. Delivery is fire-and-forget.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, alert: &AlertEvent) -> Result<(), PublishError>;
}

/// Writes each alert as one JSON line on stdout. Used by offline replay.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait::async_trait]
impl AlertSink for StdoutSink {
    async fn publish(&self, alert: &AlertEvent) -> Result<(), PublishError> {
        let line = alert.to_json()?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line).map_err(|e| PublishError::Channel {
            channel: "stdout".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Builds alerts for anomalous events and hands them to a sink.
///
/// Publish failures are logged and counted; they never stop the caller.
pub struct AlertEmitter<S> {
    sink: S,
    attempts: u64,
    failures: u64,
}

impl<S: AlertSink> AlertEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            attempts: 0,
            failures: 0,
        }
    }

    /// Emit one alert for `event`. Returns whether publishing succeeded.
    pub async fn emit(&mut self, event: &TrafficEvent) -> bool {
        let detected = chrono::Utc::now();
        let alert = AlertEvent::zero_day(event, detected.timestamp());

        warn!(
            "[{}] AI DETECTED ZERO-DAY ATTACK from IP: {} (payload_size={})",
            detected.format("%H:%M:%S"),
            alert.source_identifier,
            alert.feature_value
        );

        self.attempts += 1;
        match self.sink.publish(&alert).await {
            Ok(()) => true,
            Err(e) => {
                self.failures += 1;
                error!(ip = %alert.source_identifier, error = %e, "alert publish failed");
                false
            }
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
