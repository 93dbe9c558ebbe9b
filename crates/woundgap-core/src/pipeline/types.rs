use serde::{Deserialize, Serialize};

use crate::quantify::FrameResult;

/// Batch processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisStage {
    Enumerating,
    Analyzing,
    Reporting,
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enumerating => write!(f, "Scanning inputs"),
            Self::Analyzing => write!(f, "Analyzing"),
            Self::Reporting => write!(f, "Writing report"),
        }
    }
}

/// Thread-safe progress reporting for a batch.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g., source count), if known.
    fn begin_stage(&self, _stage: AnalysisStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Ordered rows of one batch: one per analyzed frame, failed frame or
/// failed file, numbered from 1 in processing order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    pub rows: Vec<FrameResult>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameResult> {
        self.rows.iter()
    }

    /// Rows that carry a measurement.
    pub fn measured(&self) -> impl Iterator<Item = &FrameResult> {
        self.rows.iter().filter(|r| !r.is_error())
    }

    /// Rows that carry an error.
    pub fn failures(&self) -> impl Iterator<Item = &FrameResult> {
        self.rows.iter().filter(|r| r.is_error())
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a FrameResult;
    type IntoIter = std::slice::Iter<'a, FrameResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
