//! JSON reports printed by the commands.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use jiff::Timestamp;
use serde::Serialize;
use taxscan_core::{
    ConsistencyWarning, DocumentId, DocumentRef, Error, ErrorKind, ExtractedRecord, RecordCheck,
};
use taxscan_runtime::{AnnotatedRecord, BatchEvent, RegistryStatus, TaskState};

/// Report of one `run` invocation.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub generated_at: Timestamp,
    pub summary: Summary,
    /// One entry per input document, in input order.
    pub documents: Vec<DocumentReport>,
    /// One row per extracted receipt, grouped by document in input order.
    pub rows: Vec<ReportRow>,
}

/// Batch totals.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub records: usize,
    pub warnings: usize,
    /// Rows whose checks all passed and whose vendor the registry knows.
    pub verified: usize,
}

/// Outcome of one document.
#[derive(Debug, Serialize)]
pub struct DocumentReport {
    #[serde(flatten)]
    pub document: DocumentRef,
    pub state: TaskState,
    pub records: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ConsistencyWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// A failure as shown in the report.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    /// Unparseable service output, kept for diagnosis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl From<&Error> for ErrorReport {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind,
            message: error.to_string(),
            raw_response: error.raw_response().map(str::to_owned),
        }
    }
}

/// One extracted receipt with its checks.
#[derive(Debug, Serialize)]
pub struct ReportRow {
    /// Name of the source document.
    pub document: String,
    #[serde(flatten)]
    pub record: ExtractedRecord,
    pub check: RecordCheck,
    /// Registry status; absent when lookups were disabled or the batch was cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryStatus>,
    pub verified: bool,
}

struct Slot {
    report: DocumentReport,
    records: Vec<ExtractedRecord>,
}

/// Collects batch events into a [`BatchReport`].
pub struct ReportBuilder {
    slots: Vec<Slot>,
    positions: HashMap<DocumentId, usize>,
}

impl ReportBuilder {
    /// Prepares one pending entry per document, in input order.
    pub fn new(documents: impl IntoIterator<Item = DocumentRef>) -> Self {
        let slots: Vec<Slot> = documents
            .into_iter()
            .map(|document| Slot {
                report: DocumentReport {
                    document,
                    state: TaskState::Pending,
                    records: 0,
                    warnings: Vec::new(),
                    error: None,
                },
                records: Vec::new(),
            })
            .collect();

        let positions = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (slot.report.document.id, index))
            .collect();

        Self { slots, positions }
    }

    /// Records the outcome carried by `event`.
    pub fn push(&mut self, event: BatchEvent) {
        let state = event.state();
        let Some(&index) = self.positions.get(&event.document.id) else {
            return;
        };

        let slot = &mut self.slots[index];
        slot.report.state = state;

        match event.outcome {
            Ok(extraction) => {
                slot.report.records = extraction.records.len();
                slot.report.warnings = extraction.warnings;
                slot.records = extraction.records;
            }
            Err(error) => slot.report.error = Some(ErrorReport::from(&error)),
        }
    }

    /// Returns every extracted record, in row order.
    pub fn records(&self) -> Vec<ExtractedRecord> {
        self.slots
            .iter()
            .flat_map(|slot| slot.records.iter().cloned())
            .collect()
    }

    /// Builds the report, pairing rows with `annotations` when lookups ran.
    ///
    /// `annotations` must be in the order returned by [`Self::records`].
    pub fn finish(self, annotations: Option<Vec<AnnotatedRecord>>) -> BatchReport {
        let mut annotations = annotations.map(Vec::into_iter);
        let mut summary = Summary {
            documents: self.slots.len(),
            ..Summary::default()
        };
        let mut documents = Vec::with_capacity(self.slots.len());
        let mut rows = Vec::new();

        for slot in self.slots {
            match slot.report.state {
                TaskState::Succeeded => summary.succeeded += 1,
                TaskState::Failed => summary.failed += 1,
                TaskState::Cancelled | TaskState::Pending | TaskState::Running => {
                    summary.cancelled += 1
                }
            }
            summary.warnings += slot.report.warnings.len();

            for record in slot.records {
                let annotated = annotations.as_mut().and_then(Iterator::next);
                let row = match annotated {
                    Some(annotated) => ReportRow {
                        document: slot.report.document.name.clone(),
                        verified: annotated.is_verified(),
                        check: annotated.check,
                        registry: Some(annotated.registry),
                        record: annotated.record,
                    },
                    None => ReportRow {
                        document: slot.report.document.name.clone(),
                        check: RecordCheck::of(&record),
                        registry: None,
                        verified: false,
                        record,
                    },
                };

                summary.verified += usize::from(row.verified);
                rows.push(row);
            }

            documents.push(slot.report);
        }

        summary.records = rows.len();

        BatchReport {
            generated_at: Timestamp::now(),
            summary,
            documents,
            rows,
        }
    }
}

/// Registry answer for one tax ID, as printed by `lookup`.
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub tax_id: String,
    pub valid: bool,
    #[serde(flatten)]
    pub registry: RegistryStatus,
}

/// Offline checks for one value, as printed by `validate`.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub value: String,
    pub tax_id_valid: bool,
    pub ncf_valid: bool,
}

/// Writes `value` as pretty JSON to `output`, or to stdout when absent.
pub async fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    json.push('\n');

    match output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{json}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use taxscan_core::Document;
    use taxscan_inference::Extraction;

    use super::*;

    fn record(ncf: &str) -> ExtractedRecord {
        ExtractedRecord {
            rnc: "131563856".into(),
            ncf: ncf.into(),
            date: "09/08/2025".into(),
            subtotal: 1270.0,
            itbis: 188.0,
            isc: 0.0,
            other_taxes: 0.0,
            tips: 0.0,
        }
    }

    fn event(document: &Document, outcome: taxscan_core::Result<Extraction>) -> BatchEvent {
        BatchEvent {
            document: document.reference(),
            outcome,
            completed: 1,
            total: 1,
        }
    }

    #[test]
    fn test_report_keeps_input_order() {
        let first = Document::new("first.jpg", "image/jpeg", b"1".to_vec());
        let second = Document::new("second.jpg", "image/jpeg", b"2".to_vec());
        let mut builder = ReportBuilder::new([first.reference(), second.reference()]);

        builder.push(event(
            &second,
            Ok(Extraction {
                records: vec![record("B0100000002")],
                warnings: Vec::new(),
            }),
        ));
        builder.push(event(
            &first,
            Err(Error::schema("not json").with_message("unparseable answer")),
        ));

        let report = builder.finish(None);
        assert_eq!(report.documents[0].document.name, "first.jpg");
        assert_eq!(report.documents[0].state, TaskState::Failed);
        let error = report.documents[0].error.as_ref().unwrap();
        assert_eq!(error.raw_response.as_deref(), Some("not json"));

        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].document, "second.jpg");
        assert!(report.rows[0].registry.is_none());
        assert!(!report.rows[0].verified);
    }

    #[test]
    fn test_unreported_documents_count_as_cancelled() {
        let document = Document::new("late.pdf", "application/pdf", b"%PDF".to_vec());
        let report = ReportBuilder::new([document.reference()]).finish(None);

        assert_eq!(report.summary.cancelled, 1);
        assert_eq!(report.documents[0].state, TaskState::Pending);
    }

    #[test]
    fn test_rows_pair_with_annotations() {
        let document = Document::new("scan.png", "image/png", b"png".to_vec());
        let mut builder = ReportBuilder::new([document.reference()]);
        builder.push(event(
            &document,
            Ok(Extraction {
                records: vec![record("B0100000001"), record("B9900000001")],
                warnings: Vec::new(),
            }),
        ));

        let annotations = builder
            .records()
            .into_iter()
            .map(|record| AnnotatedRecord {
                check: RecordCheck::of(&record),
                record,
                registry: RegistryStatus::NotFound,
            })
            .collect();

        let report = builder.finish(Some(annotations));
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows[0].check.is_clean());
        assert!(!report.rows[1].check.ncf_valid);
        assert_eq!(report.rows[1].registry, Some(RegistryStatus::NotFound));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rows"][0]["ncf"], "B0100000001");
        assert_eq!(json["rows"][0]["registry"]["status"], "not_found");
        assert_eq!(json["documents"][0]["state"], "succeeded");
    }
}
