//! Running counters and the periodic summary line.

use std::fmt;

use serde::Serialize;

/// Process-lifetime counters. Only ever increase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunningStats {
    processed: u64,
    anomalies: u64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one decoded event; returns the new processed count.
    pub fn record_processed(&mut self) -> u64 {
        self.processed += 1;
        self.processed
    }

    pub fn record_anomaly(&mut self) -> u64 {
        self.anomalies += 1;
        self.anomalies
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn summary(&self) -> StatsSummary {
        let anomaly_rate_pct = if self.processed > 0 {
            self.anomalies as f64 / self.processed as f64 * 100.0
        } else {
            0.0
        };
        StatsSummary {
            processed: self.processed,
            anomalies: self.anomalies,
            anomaly_rate_pct,
        }
    }
}

/// Point-in-time view of [`RunningStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub processed: u64,
    pub anomalies: u64,
    pub anomaly_rate_pct: f64,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed: {} | Anomalies: {} ({:.2}%)",
            self.processed, self.anomalies, self.anomaly_rate_pct
        )
    }
}

/// Decides when a summary is due.
#[derive(Debug, Clone, Copy)]
pub struct StatsTracker {
    stats: RunningStats,
    interval: u64,
}

impl StatsTracker {
    pub fn new(interval: u64) -> Self {
        Self {
            stats: RunningStats::new(),
            interval,
        }
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub fn record_processed(&mut self) -> u64 {
        self.stats.record_processed()
    }

    pub fn record_anomaly(&mut self) -> u64 {
        self.stats.record_anomaly()
    }

    /// True when the processed count sits on a reporting boundary.
    pub fn report_due(&self) -> bool {
        let n = self.stats.processed();
        self.interval > 0 && n > 0 && n % self.interval == 0
    }
}
