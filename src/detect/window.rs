//! Fixed-capacity FIFO history of recent feature values.

use std::collections::VecDeque;
use std::sync::Arc;

/// One retained observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEntry {
    pub feature_value: i64,
    pub source_identifier: String,
}

/// Bounded, arrival-ordered store of the most recent `capacity` entries.
///
/// Pushing into a full window evicts the oldest entry first. Values are stored
/// raw; no scaling is applied.
#[derive(Debug)]
pub struct WindowBuffer {
    entries: VecDeque<WindowEntry>,
    capacity: usize,
}

impl WindowBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an observation, evicting the oldest one if the window is full.
    /// Returns the evicted entry.
    pub fn push(
        &mut self,
        feature_value: i64,
        source_identifier: impl Into<String>,
    ) -> Option<WindowEntry> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(WindowEntry {
            feature_value,
            source_identifier: source_identifier.into(),
        });
        evicted
    }

    /// Copy the current feature values, oldest first.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            values: self.entries.iter().map(|e| e.feature_value).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &WindowEntry> {
        self.entries.iter()
    }
}

/// Immutable copy of the window's feature values at one instant.
///
/// Cheap to clone; later pushes to the window never affect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    values: Arc<[i64]>,
}

impl Snapshot {
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<i64>> for Snapshot {
    fn from(values: Vec<i64>) -> Self {
        Self {
            values: values.into(),
        }
    }
}
