//! Anomaly detection: the sliding window, the model lifecycle and scoring.

pub mod forest;
pub mod lifecycle;
pub mod scorer;
pub mod window;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use forest::{IsolationForestModel, IsolationForestTrainer};
pub use lifecycle::{ModelLifecycle, ModelState, RetrainPolicy};
pub use scorer::Scorer;
pub use window::{Snapshot, WindowBuffer};

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("cannot train on an empty snapshot")]
    EmptySnapshot,
}

/// Binary classification of one feature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Anomalous,
}

impl Verdict {
    pub fn is_anomalous(self) -> bool {
        matches!(self, Verdict::Anomalous)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Normal => write!(f, "normal"),
            Verdict::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// A trained artifact mapping a feature value to a verdict.
///
/// Implementations are immutable once built; the scorer shares them behind
/// an `Arc` so a replacement never exposes a partially built model.
pub trait ScoringModel: Send + Sync + fmt::Debug {
    fn predict(&self, value: i64) -> Verdict;
}

/// Builds a [`ScoringModel`] from a window snapshot.
pub trait Trainer: Send + Sync {
    fn train(&self, snapshot: &Snapshot) -> Result<Arc<dyn ScoringModel>, DetectError>;
}
