//! When to train, and what state the detector is in.
//!
//! ```text
//! Uninitialized --(window >= warm-up)--> Warm --(retrain boundary, fit ok)--> Trained
//!                                                                   ^            |
//!                                                                   +-- retrain -+
//! ```
//!
//! A failed fit leaves the state untouched: `Warm` stays `Warm`, and `Trained`
//! keeps serving the previous model.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{DetectorConfig, ModelConfig, WindowConfig};
use crate::detect::{DetectError, ScoringModel, Snapshot, Trainer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Window below the warm-up threshold. Only history is collected.
    Uninitialized,
    /// Enough history, but no model has been trained yet.
    Warm,
    /// A usable model exists.
    Trained,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Uninitialized => write!(f, "uninitialized"),
            ModelState::Warm => write!(f, "warm"),
            ModelState::Trained => write!(f, "trained"),
        }
    }
}

/// Warm-up gate and retrain cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrainPolicy {
    pub warmup_threshold: usize,
    pub retrain_interval: u64,
}

impl RetrainPolicy {
    pub fn new(window: &WindowConfig, model: &ModelConfig) -> Self {
        Self {
            warmup_threshold: window.warmup_threshold,
            retrain_interval: model.retrain_interval,
        }
    }

    pub fn is_warm(&self, window_len: usize) -> bool {
        window_len >= self.warmup_threshold
    }

    /// A retrain is due exactly when `processed` is a multiple of the interval
    /// and the window has reached the warm-up threshold.
    pub fn retrain_due(&self, processed: u64, window_len: usize) -> bool {
        self.is_warm(window_len)
            && self.retrain_interval > 0
            && processed > 0
            && processed % self.retrain_interval == 0
    }
}

impl From<&DetectorConfig> for RetrainPolicy {
    fn from(config: &DetectorConfig) -> Self {
        Self::new(&config.window, &config.model)
    }
}

/// Owns the trainer and the training policy; hands freshly trained models to
/// the caller for installation in the scorer.
pub struct ModelLifecycle {
    trainer: Box<dyn Trainer>,
    policy: RetrainPolicy,
    state: ModelState,
    generation: u64,
    failures: u64,
}

impl ModelLifecycle {
    pub fn new(trainer: Box<dyn Trainer>, policy: RetrainPolicy) -> Self {
        Self {
            trainer,
            policy,
            state: ModelState::Uninitialized,
            generation: 0,
            failures: 0,
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn policy(&self) -> &RetrainPolicy {
        &self.policy
    }

    /// Number of successful trainings so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of failed training attempts so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Record the current window length, promoting `Uninitialized` to `Warm`
    /// once the warm-up threshold is reached.
    pub fn observe_window(&mut self, window_len: usize) -> ModelState {
        if self.state == ModelState::Uninitialized && self.policy.is_warm(window_len) {
            info!(
                window = window_len,
                threshold = self.policy.warmup_threshold,
                "warm-up threshold reached"
            );
            self.state = ModelState::Warm;
        }
        self.state
    }

    pub fn retrain_due(&self, processed: u64, window_len: usize) -> bool {
        self.policy.retrain_due(processed, window_len)
    }

    /// Train a new model from `snapshot`.
    ///
    /// On success the state becomes `Trained` and the new model is returned.
    /// On failure nothing changes; the caller keeps its current model.
    pub fn retrain(
        &mut self,
        snapshot: &Snapshot,
        processed: u64,
    ) -> Result<Arc<dyn ScoringModel>, DetectError> {
        match self.trainer.train(snapshot) {
            Ok(model) => {
                self.generation += 1;
                self.state = ModelState::Trained;
                info!(
                    samples = snapshot.len(),
                    processed,
                    generation = self.generation,
                    "model retrained"
                );
                Ok(model)
            }
            Err(e) => {
                self.failures += 1;
                warn!(
                    samples = snapshot.len(),
                    processed,
                    state = %self.state,
                    error = %e,
                    "model training failed, keeping previous model"
                );
                Err(e)
            }
        }
    }
}

impl fmt::Debug for ModelLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLifecycle")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("failures", &self.failures)
            .finish()
    }
}
