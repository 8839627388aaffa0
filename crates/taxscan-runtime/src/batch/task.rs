//! Per-document task lifecycle.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use taxscan_core::{DocumentRef, ErrorKind, Result};

/// Lifecycle of the extraction task owned by one document.
///
/// Tasks start `Pending`, become `Running` once they hold a concurrency
/// permit, and end in exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a concurrency permit.
    Pending,
    /// Extraction in progress.
    Running,
    /// Records extracted.
    Succeeded,
    /// Extraction failed; the failure is part of the outcome.
    Failed,
    /// The batch was cancelled before the task completed.
    Cancelled,
}

impl TaskState {
    /// Returns the terminal state an outcome represents.
    pub fn of_outcome<T>(outcome: &Result<T>) -> Self {
        match outcome {
            Ok(_) => Self::Succeeded,
            Err(error) if error.kind == ErrorKind::Cancelled => Self::Cancelled,
            Err(_) => Self::Failed,
        }
    }

    /// Returns true for states a task never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Task states of one batch, in submission order.
///
/// Written only by the orchestrator; readers get snapshots.
#[derive(Debug)]
pub struct TaskBoard {
    tasks: Mutex<Vec<(DocumentRef, TaskState)>>,
}

impl TaskBoard {
    /// Creates a board with every document pending.
    pub(crate) fn new(documents: impl IntoIterator<Item = DocumentRef>) -> Self {
        let tasks = documents
            .into_iter()
            .map(|document| (document, TaskState::Pending))
            .collect();

        Self {
            tasks: Mutex::new(tasks),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(DocumentRef, TaskState)>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the task at `index` to `state` unless it already finished.
    pub(crate) fn set(&self, index: usize, state: TaskState) {
        if let Some((_, current)) = self.lock().get_mut(index)
            && !current.is_terminal()
        {
            *current = state;
        }
    }

    /// Returns the state of every task in submission order.
    pub fn snapshot(&self) -> Vec<(DocumentRef, TaskState)> {
        self.lock().clone()
    }

    /// Returns how many tasks are in `state`.
    pub fn count(&self, state: TaskState) -> usize {
        self.lock().iter().filter(|(_, s)| *s == state).count()
    }
}

#[cfg(test)]
mod tests {
    use taxscan_core::Document;

    use super::*;

    #[test]
    fn test_terminal_states_stick() {
        let document = Document::new("a.jpg", "image/jpeg", vec![0]);
        let board = TaskBoard::new([document.reference()]);

        board.set(0, TaskState::Running);
        board.set(0, TaskState::Succeeded);
        board.set(0, TaskState::Cancelled);

        assert_eq!(board.snapshot()[0].1, TaskState::Succeeded);
        assert_eq!(board.count(TaskState::Succeeded), 1);
        assert_eq!(board.count(TaskState::Pending), 0);
    }
}
