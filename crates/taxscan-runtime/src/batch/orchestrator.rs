//! Semaphore-bounded dispatch of extraction tasks.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use taxscan_core::{Document, DocumentRef, Error, Result};
use taxscan_inference::{Extraction, ExtractionClient};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use super::stream::Completion;
use super::{BatchStream, TaskBoard, TaskState};
use crate::TRACING_TARGET_BATCH;

/// Fans out one extraction per document with bounded concurrency.
///
/// Each call to [`run`](Self::run) starts an independent batch with its own
/// semaphore and cancellation scope. Cancelling the orchestrator's token
/// cancels every batch it started.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    extraction: ExtractionClient,
    cancel_token: CancellationToken,
}

impl BatchOrchestrator {
    /// Creates an orchestrator over the given extraction client.
    pub fn new(extraction: ExtractionClient) -> Self {
        Self {
            extraction,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Ties every batch to `token`: cancelling it cancels running batches.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Starts extracting `documents`, at most `concurrency_limit` at a time.
    ///
    /// Returns immediately; outcomes arrive on the returned stream as
    /// documents complete. Must be called within a tokio runtime.
    ///
    /// Fails with a `Configuration` error if `concurrency_limit` is zero.
    pub fn run(&self, documents: Vec<Document>, concurrency_limit: usize) -> Result<BatchStream> {
        if concurrency_limit == 0 {
            return Err(Error::configuration().with_message("concurrency limit must be at least 1"));
        }

        let total = documents.len();
        let token = self.cancel_token.child_token();
        let board = Arc::new(TaskBoard::new(documents.iter().map(Document::reference)));
        let (sender, receiver) = mpsc::channel(total.max(1));

        tracing::info!(
            target: TRACING_TARGET_BATCH,
            total,
            concurrency_limit,
            "Starting batch"
        );

        let dispatcher = Dispatcher {
            extraction: self.extraction.clone(),
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            token: token.clone(),
            board: board.clone(),
            sender,
        };
        tokio::spawn(dispatcher.run(documents));

        Ok(BatchStream::new(receiver, board, token, total))
    }
}

/// Per-batch state moved into the dispatch task.
struct Dispatcher {
    extraction: ExtractionClient,
    semaphore: Arc<Semaphore>,
    token: CancellationToken,
    board: Arc<TaskBoard>,
    sender: mpsc::Sender<Completion>,
}

impl Dispatcher {
    /// Dispatches documents in submission order, waiting for permits as needed.
    async fn run(self, documents: Vec<Document>) {
        let mut documents = documents.into_iter().enumerate();

        while let Some((index, document)) = documents.next() {
            if !document.media_kind().is_supported() {
                let error = Error::unsupported_media_kind().with_message(format!(
                    "'{}' has unsupported media type '{}'",
                    document.name(),
                    document.media_type()
                ));
                self.complete(index, document.reference(), Err(error)).await;
                continue;
            }

            let Some(permit) = self.acquire().await else {
                self.complete(index, document.reference(), Err(cancelled()))
                    .await;
                for (index, document) in documents.by_ref() {
                    self.complete(index, document.reference(), Err(cancelled()))
                        .await;
                }
                break;
            };

            self.spawn(index, document, permit);
        }

        tracing::debug!(
            target: TRACING_TARGET_BATCH,
            "All documents dispatched"
        );
    }

    /// Waits for a concurrency permit, or `None` once the batch is cancelled.
    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;

            () = self.token.cancelled() => None,
            permit = self.semaphore.clone().acquire_owned() => permit.ok(),
        }
    }

    /// Runs one extraction in its own task, holding `permit` until it ends.
    fn spawn(&self, index: usize, document: Document, permit: OwnedSemaphorePermit) {
        let extraction = self.extraction.clone();
        let token = self.token.clone();
        let board = self.board.clone();
        let sender = self.sender.clone();

        board.set(index, TaskState::Running);

        tokio::spawn(async move {
            let _permit = permit;
            let reference = document.reference();

            let outcome = tokio::select! {
                biased;

                () = token.cancelled() => {
                    tracing::debug!(
                        target: TRACING_TARGET_BATCH,
                        document_id = %reference.id,
                        "Extraction abandoned on cancellation"
                    );
                    Err(cancelled())
                }
                result = AssertUnwindSafe(extraction.extract(&document)).catch_unwind() => {
                    result.unwrap_or_else(|_| {
                        tracing::error!(
                            target: TRACING_TARGET_BATCH,
                            document_id = %reference.id,
                            "Extraction task panicked"
                        );
                        Err(Error::internal().with_message(format!(
                            "extraction of '{}' panicked",
                            reference.name
                        )))
                    })
                }
            };

            board.set(index, TaskState::of_outcome(&outcome));
            let _ = sender.send(Completion { document: reference, outcome }).await;
        });
    }

    /// Records a terminal outcome produced without running an extraction.
    async fn complete(&self, index: usize, document: DocumentRef, outcome: Result<Extraction>) {
        self.board.set(index, TaskState::of_outcome(&outcome));
        let _ = self.sender.send(Completion { document, outcome }).await;
    }
}

fn cancelled() -> Error {
    Error::cancelled().with_message("batch cancelled before the document completed")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use taxscan_core::ErrorKind;
    use taxscan_test::{MockRecognitionProvider, SAMPLE_RECEIPTS};

    use super::*;
    use crate::BatchEvent;

    fn image(name: &str) -> Document {
        Document::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF])
    }

    #[tokio::test]
    async fn test_unsupported_document_is_isolated() {
        let documents = vec![
            image("1.jpg"),
            image("2.jpg"),
            Document::new("3.docx", "application/msword", vec![0]),
            Document::new("4.pdf", "application/pdf", b"%PDF".to_vec()),
            image("5.jpg"),
        ];

        let provider = MockRecognitionProvider::default();
        let stats = provider.stats();
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(provider));

        let events: Vec<_> = orchestrator.run(documents, 2).unwrap().collect().await;

        assert_eq!(events.len(), 5);
        assert_eq!(events.iter().filter(|e| e.is_success()).count(), 4);

        let failed: Vec<_> = events.iter().filter_map(BatchEvent::error).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].kind, ErrorKind::UnsupportedMediaKind);

        let counts: Vec<_> = events.iter().map(|e| e.completed).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5]);
        assert!(events.iter().all(|e| e.total == 5));

        assert_eq!(stats.calls(), 4);
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let documents: Vec<_> = (0..20).map(|i| image(&format!("{i}.jpg"))).collect();

        let provider = MockRecognitionProvider::default().with_delay(Duration::from_millis(15));
        let stats = provider.stats();
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(provider));

        let events: Vec<_> = orchestrator.run(documents, 3).unwrap().collect().await;

        assert_eq!(events.len(), 20);
        assert!(events.iter().all(BatchEvent::is_success));
        assert_eq!(stats.calls(), 20);
        assert!(stats.max_in_flight() <= 3, "max in flight {}", stats.max_in_flight());
        assert!(stats.max_in_flight() >= 2);
    }

    #[tokio::test]
    async fn test_outcomes_arrive_in_completion_order() {
        let slow = image("slow.jpg");
        let fast = image("fast.jpg");
        let slow_id = slow.id();

        let provider =
            MockRecognitionProvider::default().with_delay_for(slow_id, Duration::from_millis(100));
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(provider));

        let events: Vec<_> = orchestrator.run(vec![slow, fast], 2).unwrap().collect().await;

        assert_eq!(events[0].document.name, "fast.jpg");
        assert_eq!(events[1].document.id, slow_id);
        assert_eq!(events[1].completed, 2);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_siblings() {
        let broken = image("broken.jpg");
        let garbled = image("garbled.jpg");

        let provider = MockRecognitionProvider::default()
            .with_failure_for(broken.id(), ErrorKind::RecognitionTransport)
            .with_response_for(garbled.id(), "no receipt here");
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(provider));

        let documents = vec![broken, image("ok.jpg"), garbled];
        let mut events: Vec<_> = orchestrator.run(documents, 3).unwrap().collect().await;
        events.sort_by(|a, b| a.document.name.cmp(&b.document.name));

        assert_eq!(events[0].error().map(|e| e.kind), Some(ErrorKind::RecognitionTransport));
        assert_eq!(events[1].error().map(|e| e.kind), Some(ErrorKind::Schema));
        assert!(events[2].is_success());
        assert_eq!(
            events[2].outcome.as_ref().unwrap().records.len(),
            serde_count(SAMPLE_RECEIPTS)
        );
    }

    #[tokio::test]
    async fn test_panicking_extraction_yields_internal_error() {
        let bad = image("bad.jpg");
        let bad_id = bad.id();

        let provider = MockRecognitionProvider::default().with_panic_for(bad_id);
        let stats = provider.stats();
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(provider));

        let mut stream = orchestrator.run(vec![image("good.jpg"), bad], 2).unwrap();
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        let failed: Vec<_> = events.iter().filter(|e| !e.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].document.id, bad_id);
        assert_eq!(failed[0].error().map(|e| e.kind), Some(ErrorKind::Internal));
        assert_eq!(failed[0].state(), TaskState::Failed);

        assert!(stream.tasks().snapshot().iter().all(|(_, state)| state.is_terminal()));
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_yields_cancelled_outcomes() {
        let documents: Vec<_> = (0..6).map(|i| image(&format!("{i}.jpg"))).collect();

        let provider = MockRecognitionProvider::default().with_delay(Duration::from_secs(30));
        let stats = provider.stats();
        let token = CancellationToken::new();
        let orchestrator =
            BatchOrchestrator::new(ExtractionClient::new(provider)).with_cancellation(token.clone());

        let stream = orchestrator.run(documents, 2).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let events: Vec<_> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
            .await
            .expect("cancelled batch drains promptly");

        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.state() == TaskState::Cancelled));
        assert_eq!(stats.calls(), 2);
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_batch() {
        let documents: Vec<_> = (0..4).map(|i| image(&format!("{i}.jpg"))).collect();

        let provider = MockRecognitionProvider::default().with_delay(Duration::from_secs(30));
        let stats = provider.stats();
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(provider));

        let stream = orchestrator.run(documents, 4).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stats.in_flight(), 4);

        drop(stream);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_zero_limit_is_configuration_error() {
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(
            MockRecognitionProvider::default(),
        ));
        let error = orchestrator.run(vec![image("a.jpg")], 0).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_empty_batch_ends_immediately() {
        let orchestrator = BatchOrchestrator::new(ExtractionClient::new(
            MockRecognitionProvider::default(),
        ));
        let stream = orchestrator.run(Vec::new(), 3).unwrap();
        assert_eq!(stream.total(), 0);

        let events: Vec<_> = stream.collect().await;
        assert!(events.is_empty());
    }

    fn serde_count(list: &str) -> usize {
        list.matches("\"rnc\"").count()
    }
}
