//! Completion-ordered stream of batch outcomes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use taxscan_core::{DocumentRef, Result};
use taxscan_inference::Extraction;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{BatchEvent, TaskBoard};

/// Outcome sent by a task when its document completes.
#[derive(Debug)]
pub(crate) struct Completion {
    pub document: DocumentRef,
    pub outcome: Result<Extraction>,
}

/// Stream of [`BatchEvent`]s, one per submitted document.
///
/// Events arrive in completion order, not submission order. The completion
/// count is assigned as each event is yielded, so it increases by exactly one
/// per event and the last event reports `completed == total`.
///
/// Dropping the stream cancels the batch.
#[must_use = "a batch is cancelled when its stream is dropped"]
pub struct BatchStream {
    inner: ReceiverStream<Completion>,
    board: Arc<TaskBoard>,
    token: CancellationToken,
    completed: usize,
    total: usize,
    _guard: DropGuard,
}

impl std::fmt::Debug for BatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStream")
            .field("completed", &self.completed)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

impl BatchStream {
    pub(crate) fn new(
        receiver: mpsc::Receiver<Completion>,
        board: Arc<TaskBoard>,
        token: CancellationToken,
        total: usize,
    ) -> Self {
        Self {
            inner: ReceiverStream::new(receiver),
            board,
            _guard: token.clone().drop_guard(),
            token,
            completed: 0,
            total,
        }
    }

    /// Cancels the batch.
    ///
    /// Documents that have not completed yet still yield an event, with a
    /// `Cancelled` outcome.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the batch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the number of events yielded so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Returns the number of documents in the batch.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns the live task states of the batch.
    pub fn tasks(&self) -> &TaskBoard {
        &self.board
    }
}

impl Stream for BatchStream {
    type Item = BatchEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(completion)) => {
                this.completed += 1;
                Poll::Ready(Some(BatchEvent {
                    document: completion.document,
                    outcome: completion.outcome,
                    completed: this.completed,
                    total: this.total,
                }))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total.saturating_sub(self.completed);
        (0, Some(remaining))
    }
}
