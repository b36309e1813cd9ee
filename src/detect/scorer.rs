use std::sync::Arc;

use crate::detect::{ScoringModel, Verdict};

/// Holds the active model and applies it to single values.
///
/// The model is swapped as a whole `Arc`, so a score always sees either the
/// old model or the new one.
#[derive(Debug, Default)]
pub struct Scorer {
    active: Option<Arc<dyn ScoringModel>>,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active model, returning the superseded one.
    pub fn install(&mut self, model: Arc<dyn ScoringModel>) -> Option<Arc<dyn ScoringModel>> {
        self.active.replace(model)
    }

    pub fn has_model(&self) -> bool {
        self.active.is_some()
    }

    /// Verdict for `value`, or `None` while no model is installed.
    pub fn score(&self, value: i64) -> Option<Verdict> {
        self.active.as_ref().map(|model| model.predict(value))
    }
}
