//! The `lookup` command.

use taxscan_core::normalize_tax_id;
use taxscan_registry::{LookupCache, RegistryClient};
use taxscan_runtime::RegistryStatus;

use super::create_registry_client;
use crate::TRACING_TARGET_COMMAND;
use crate::config::LookupArgs;
use crate::report::{LookupReport, write_json};

pub async fn execute(
    args: LookupArgs,
    registry: taxscan_registry::reqwest::RegistryConfig,
) -> anyhow::Result<()> {
    let client = create_registry_client(registry)?;
    let reports = lookup_all(&client, args.tax_ids).await;
    write_json(&reports, None).await
}

/// Looks up each tax ID in turn; repeated IDs hit the cache.
async fn lookup_all(client: &RegistryClient, tax_ids: Vec<String>) -> Vec<LookupReport> {
    let cache = LookupCache::new();
    let mut reports = Vec::with_capacity(tax_ids.len());

    for tax_id in tax_ids {
        let Some(normalized) = normalize_tax_id(&tax_id) else {
            tracing::warn!(
                target: TRACING_TARGET_COMMAND,
                tax_id = %tax_id,
                "Skipping malformed tax ID"
            );
            reports.push(LookupReport {
                tax_id,
                valid: false,
                registry: RegistryStatus::Skipped,
            });
            continue;
        };

        let registry = match cache.lookup(client, &normalized).await {
            Ok(Some(record)) => RegistryStatus::Found { record },
            Ok(None) => RegistryStatus::NotFound,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_COMMAND,
                    tax_id = %normalized,
                    error = %error,
                    "Registry lookup failed"
                );
                RegistryStatus::Failed {
                    kind: error.kind,
                    message: error.to_string(),
                }
            }
        };

        reports.push(LookupReport {
            tax_id: normalized,
            valid: true,
            registry,
        });
    }

    reports
}
