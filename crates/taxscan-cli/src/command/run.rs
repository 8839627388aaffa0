//! The `run` command: extract, check and annotate a batch of documents.

use anyhow::Context;
use futures::StreamExt;
use taxscan_core::Document;
use taxscan_registry::reqwest::RegistryConfig;
use taxscan_runtime::Taxscan;
use tokio_util::sync::CancellationToken;

use super::create_taxscan;
use crate::config::RunArgs;
use crate::report::{BatchReport, ReportBuilder, write_json};
use crate::{TRACING_TARGET_COMMAND, input, shutdown};

pub async fn execute(args: RunArgs, registry: RegistryConfig) -> anyhow::Result<()> {
    // Fail on a missing API key before touching any input.
    let token = CancellationToken::new();
    let taxscan = create_taxscan(&args.gemini, registry)?
        .with_config(args.runtime)
        .context("invalid runtime configuration")?
        .with_cancellation(token.clone());

    let documents = input::read_documents(&args.inputs).await?;
    let signals = tokio::spawn(shutdown::cancel_on_signal(token.clone()));

    let report = process(&taxscan, documents, !args.no_lookup, &token).await;
    signals.abort();
    let report = report?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        documents = report.summary.documents,
        succeeded = report.summary.succeeded,
        failed = report.summary.failed,
        cancelled = report.summary.cancelled,
        records = report.summary.records,
        verified = report.summary.verified,
        "Batch finished"
    );

    write_json(&report, args.output.as_deref()).await
}

/// Runs the batch to completion and builds its report.
///
/// Registry lookups are skipped when `lookups` is false or `token` was
/// cancelled while extracting.
async fn process(
    taxscan: &Taxscan,
    documents: Vec<Document>,
    lookups: bool,
    token: &CancellationToken,
) -> anyhow::Result<BatchReport> {
    let mut builder = ReportBuilder::new(documents.iter().map(Document::reference));
    let mut stream = taxscan.submit(documents)?;

    while let Some(event) = stream.next().await {
        match event.error() {
            None => tracing::info!(
                target: TRACING_TARGET_COMMAND,
                document = %event.document.name,
                completed = event.completed,
                total = event.total,
                "Document extracted"
            ),
            Some(error) => tracing::warn!(
                target: TRACING_TARGET_COMMAND,
                document = %event.document.name,
                completed = event.completed,
                total = event.total,
                error = %error,
                "Document failed"
            ),
        }

        builder.push(event);
    }

    if !lookups || token.is_cancelled() {
        return Ok(builder.finish(None));
    }

    let annotations = taxscan.annotate(builder.records()).await;
    Ok(builder.finish(Some(annotations)))
}

#[cfg(test)]
mod tests {
    use taxscan_core::ErrorKind;
    use taxscan_inference::ExtractionClient;
    use taxscan_registry::RegistryClient;
    use taxscan_runtime::{RegistryStatus, TaskState};
    use taxscan_test::{MockRecognitionProvider, MockRegistryTransport};

    use super::*;

    fn documents() -> Vec<Document> {
        vec![
            Document::new("a.jpg", "image/jpeg", b"a".to_vec()),
            Document::new("b.docx", "application/octet-stream", b"b".to_vec()),
            Document::new("c.pdf", "application/pdf", b"c".to_vec()),
        ]
    }

    fn taxscan(token: &CancellationToken) -> (Taxscan, MockRegistryTransport) {
        let transport = MockRegistryTransport::new()
            .with_taxpayer("131563856", &[("Nombre/Razón Social", "ACME SRL"), ("Estado", "ACTIVO")]);
        let taxscan = Taxscan::new(
            ExtractionClient::new(MockRecognitionProvider::default()),
            RegistryClient::new(transport.clone()),
        )
        .with_cancellation(token.clone());
        (taxscan, transport)
    }

    #[tokio::test]
    async fn test_process_annotates_rows() {
        let token = CancellationToken::new();
        let (taxscan, transport) = taxscan(&token);

        let report = process(&taxscan, documents(), true, &token).await.unwrap();

        assert_eq!(report.summary.documents, 3);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.documents[1].state, TaskState::Failed);
        assert_eq!(
            report.documents[1].error.as_ref().map(|e| e.kind),
            Some(ErrorKind::UnsupportedMediaKind)
        );

        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|row| row.verified));
        assert!(matches!(report.rows[0].registry, Some(RegistryStatus::Found { .. })));
        assert_eq!(report.summary.verified, 2);

        // Both rows share one vendor, looked up once.
        assert_eq!(transport.sessions(), 1);
    }

    #[tokio::test]
    async fn test_process_without_lookups() {
        let token = CancellationToken::new();
        let (taxscan, transport) = taxscan(&token);

        let report = process(&taxscan, documents(), false, &token).await.unwrap();

        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|row| row.registry.is_none()));
        assert_eq!(transport.sessions(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_batch_still_reports() {
        let token = CancellationToken::new();
        let (taxscan, transport) = taxscan(&token);
        token.cancel();

        let report = process(&taxscan, documents(), true, &token).await.unwrap();

        assert_eq!(report.summary.documents, 3);
        assert_eq!(report.summary.succeeded, 0);
        assert_eq!(transport.sessions(), 0);
    }
}
