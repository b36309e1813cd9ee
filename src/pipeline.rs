//! Per-record orchestration: decode, buffer, retrain, score, alert, report.
//!
//! All worker state lives in one [`Pipeline`] value. Records are handled
//! strictly one at a time in arrival order; nothing here is shared across
//! tasks, so no locking is needed.

use std::future::Future;

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::alert::{AlertEmitter, AlertSink};
use crate::config::DetectorConfig;
use crate::detect::{
    IsolationForestTrainer, ModelLifecycle, ModelState, RetrainPolicy, Scorer, Trainer, Verdict,
    WindowBuffer,
};
use crate::ingest;
use crate::stats::{RunningStats, StatsSummary, StatsTracker};

/// What happened to one raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Malformed; dropped without touching any state.
    Dropped,
    /// Buffered; the window is still below the warm-up threshold.
    WarmingUp,
    /// Buffered and warm, but no model has been trained yet.
    AwaitingModel,
    Scored(Verdict),
}

pub struct Pipeline<S> {
    window: WindowBuffer,
    lifecycle: ModelLifecycle,
    scorer: Scorer,
    stats: StatsTracker,
    emitter: AlertEmitter<S>,
    progress_interval: u64,
    last_report: Option<StatsSummary>,
}

impl<S: AlertSink> Pipeline<S> {
    /// Build a pipeline backed by the isolation forest.
    pub fn new(config: &DetectorConfig, sink: S) -> Self {
        let trainer = IsolationForestTrainer::from_config(&config.model);
        Self::with_trainer(config, Box::new(trainer), sink)
    }

    pub fn with_trainer(config: &DetectorConfig, trainer: Box<dyn Trainer>, sink: S) -> Self {
        Self {
            window: WindowBuffer::new(config.window.capacity),
            lifecycle: ModelLifecycle::new(trainer, RetrainPolicy::from(config)),
            scorer: Scorer::new(),
            stats: StatsTracker::new(config.reporting.stats_interval),
            emitter: AlertEmitter::new(sink),
            progress_interval: config.reporting.progress_interval,
            last_report: None,
        }
    }

    /// Run one raw record through every stage.
    ///
    /// Retraining happens before scoring, so the record that lands on a
    /// retrain boundary is judged by the freshly trained model.
    pub async fn process(&mut self, raw: &str) -> Outcome {
        self.last_report = None;

        let event = match ingest::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "dropping malformed record");
                return Outcome::Dropped;
            }
        };

        self.window
            .push(event.feature_value, event.source_identifier.as_str());
        let processed = self.stats.record_processed();
        let window_len = self.window.len();

        let warmup = self.lifecycle.policy().warmup_threshold;
        if window_len < warmup {
            if self.progress_interval > 0 && processed % self.progress_interval == 0 {
                info!("Collecting baseline data... {}/{}", window_len, warmup);
            }
            return Outcome::WarmingUp;
        }
        self.lifecycle.observe_window(window_len);

        if self.lifecycle.retrain_due(processed, window_len) {
            let snapshot = self.window.snapshot();
            if let Ok(model) = self.lifecycle.retrain(&snapshot, processed) {
                self.scorer.install(model);
            }
        }

        let Some(verdict) = self.scorer.score(event.feature_value) else {
            return Outcome::AwaitingModel;
        };

        if verdict.is_anomalous() {
            self.stats.record_anomaly();
            self.emitter.emit(&event).await;
        }

        if self.stats.report_due() {
            let summary = self.stats.stats().summary();
            info!("{}", summary);
            self.last_report = Some(summary);
        }

        Outcome::Scored(verdict)
    }

    /// Consume `records` until the stream ends or `shutdown` resolves.
    ///
    /// Shutdown is checked before each record; the record in hand is always
    /// finished first.
    pub async fn run<R, F>(&mut self, mut records: R, shutdown: F) -> StatsSummary
    where
        R: Stream<Item = String> + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                next = records.next() => match next {
                    Some(raw) => {
                        self.process(&raw).await;
                    }
                    None => {
                        info!("ingress stream ended");
                        break;
                    }
                },
            }
        }

        self.stats.stats().summary()
    }

    pub fn stats(&self) -> &RunningStats {
        self.stats.stats()
    }

    pub fn state(&self) -> ModelState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &ModelLifecycle {
        &self.lifecycle
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn emitter(&self) -> &AlertEmitter<S> {
        &self.emitter
    }

    /// Summary emitted while handling the most recent record, if any.
    pub fn last_report(&self) -> Option<StatsSummary> {
        self.last_report
    }
}
