//! Registry annotation of extracted records.

use std::collections::HashMap;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use taxscan_core::{ErrorKind, ExtractedRecord, RecordCheck, RegistryRecord, normalize_tax_id};
use taxscan_registry::{LookupCache, RegistryClient};

use crate::TRACING_TARGET_ANNOTATE;

/// What the registry said about a record's vendor tax ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistryStatus {
    /// The registry lists the taxpayer.
    Found {
        /// Scraped registry record.
        record: RegistryRecord,
    },
    /// The registry has no taxpayer with this ID.
    NotFound,
    /// The tax ID is structurally invalid and was not looked up.
    Skipped,
    /// The lookup failed; the record is neither confirmed nor refuted.
    Failed {
        /// Kind of the lookup failure.
        kind: ErrorKind,
        /// Description of the failure.
        message: String,
    },
}

impl RegistryStatus {
    /// Returns the registry record when the taxpayer was found.
    pub fn record(&self) -> Option<&RegistryRecord> {
        match self {
            Self::Found { record } => Some(record),
            _ => None,
        }
    }

    /// Returns true when the registry confirmed the taxpayer exists.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// An extracted record with its structural checks and registry status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// The record as extracted.
    pub record: ExtractedRecord,
    /// Local structural checks.
    pub check: RecordCheck,
    /// Registry status of the vendor tax ID.
    pub registry: RegistryStatus,
}

impl AnnotatedRecord {
    /// Returns true if every check passed and the registry knows the vendor.
    pub fn is_verified(&self) -> bool {
        self.check.is_clean() && self.registry.is_found()
    }
}

/// Annotates `records`, keeping their order.
///
/// Each distinct, structurally valid tax ID is looked up once through `cache`,
/// at most `lookup_limit` lookups at a time. A lookup failure marks the
/// affected records as `Failed` without affecting the others.
pub async fn annotate(
    client: &RegistryClient,
    cache: &LookupCache,
    records: Vec<ExtractedRecord>,
    lookup_limit: usize,
) -> Vec<AnnotatedRecord> {
    let mut tax_ids: Vec<String> = records
        .iter()
        .filter_map(|record| normalize_tax_id(&record.rnc))
        .collect();
    tax_ids.sort_unstable();
    tax_ids.dedup();

    tracing::debug!(
        target: TRACING_TARGET_ANNOTATE,
        records = records.len(),
        tax_ids = tax_ids.len(),
        "Annotating records"
    );

    let statuses: HashMap<String, RegistryStatus> = futures::stream::iter(tax_ids)
        .map(|tax_id| async move {
            let status = match cache.lookup(client, &tax_id).await {
                Ok(Some(record)) => RegistryStatus::Found { record },
                Ok(None) => RegistryStatus::NotFound,
                Err(error) => RegistryStatus::Failed {
                    kind: error.kind,
                    message: error.to_string(),
                },
            };
            (tax_id, status)
        })
        .buffer_unordered(lookup_limit.max(1))
        .collect()
        .await;

    records
        .into_iter()
        .map(|record| {
            let registry = normalize_tax_id(&record.rnc)
                .and_then(|tax_id| statuses.get(&tax_id).cloned())
                .unwrap_or(RegistryStatus::Skipped);

            AnnotatedRecord {
                check: RecordCheck::of(&record),
                record,
                registry,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use taxscan_test::MockRegistryTransport;

    use super::*;

    fn record(rnc: &str, ncf: &str) -> ExtractedRecord {
        ExtractedRecord {
            rnc: rnc.to_owned(),
            ncf: ncf.to_owned(),
            date: "09/08/2025".to_owned(),
            subtotal: 100.0,
            itbis: 18.0,
            isc: 0.0,
            other_taxes: 0.0,
            tips: 10.0,
        }
    }

    #[tokio::test]
    async fn test_annotate() {
        let transport = MockRegistryTransport::new()
            .with_taxpayer("131563856", &[("Nombre/Razón Social", "ACME SRL"), ("Estado", "ACTIVO")])
            .with_failure_for("40212345678");
        let client = RegistryClient::new(transport.clone());
        let cache = LookupCache::new();

        let records = vec![
            record("131563856", "B0100055276"),
            record("101010101", "B0100000001"),
            record("1315", "B0100000002"),
            record("131-56385-6", "B9900000003"),
            record("40212345678", "E310000000001"),
        ];

        let annotated = annotate(&client, &cache, records, 2).await;

        assert_eq!(annotated.len(), 5);
        assert!(annotated[0].is_verified());
        assert_eq!(annotated[0].registry.record().and_then(RegistryRecord::name), Some("ACME SRL"));
        assert_eq!(annotated[1].registry, RegistryStatus::NotFound);
        assert_eq!(annotated[2].registry, RegistryStatus::Skipped);
        assert!(!annotated[2].check.tax_id_valid);
        assert!(annotated[3].registry.is_found());
        assert!(!annotated[3].check.ncf_valid);
        assert!(matches!(
            annotated[4].registry,
            RegistryStatus::Failed { kind: ErrorKind::RegistryTransport, .. }
        ));

        // Three distinct valid IDs, each looked up once.
        assert_eq!(transport.sessions(), 3);
    }

    #[tokio::test]
    async fn test_annotate_uses_cache() {
        let transport = MockRegistryTransport::new().with_taxpayer("131563856", &[("Estado", "ACTIVO")]);
        let client = RegistryClient::new(transport.clone());
        let cache = LookupCache::new();

        annotate(&client, &cache, vec![record("131563856", "B0100055276")], 4).await;
        annotate(&client, &cache, vec![record("131563856", "B0100055277")], 4).await;

        assert_eq!(transport.sessions(), 1);
    }
}
