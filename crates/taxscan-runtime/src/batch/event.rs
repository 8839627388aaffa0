//! Progress events yielded by a running batch.

use taxscan_core::{DocumentRef, Error, Result};
use taxscan_inference::Extraction;

use super::TaskState;

/// Outcome of one document, in the order documents completed.
#[derive(Debug)]
pub struct BatchEvent {
    /// Document this outcome belongs to.
    pub document: DocumentRef,
    /// Extracted records, or why the document produced none.
    pub outcome: Result<Extraction>,
    /// Number of documents completed so far, this one included.
    pub completed: usize,
    /// Number of documents in the batch.
    pub total: usize,
}

impl BatchEvent {
    /// Returns the terminal task state this outcome represents.
    pub fn state(&self) -> TaskState {
        TaskState::of_outcome(&self.outcome)
    }

    /// Returns true if the document was extracted.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// Returns the completed fraction of the batch, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}
