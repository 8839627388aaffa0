//! The `health` command.

use taxscan_registry::reqwest::RegistryConfig;
use taxscan_runtime::{RuntimeHealth, Taxscan};

use super::create_taxscan;
use crate::TRACING_TARGET_COMMAND;
use crate::config::HealthArgs;
use crate::report::write_json;

pub async fn execute(args: HealthArgs, registry: RegistryConfig) -> anyhow::Result<()> {
    let taxscan = create_taxscan(&args.gemini, registry)?;
    let health = taxscan.health_check().await?;

    write_json(&health, None).await?;
    ensure_operational(&health)
}

/// Fails when either collaborator cannot take work.
fn ensure_operational(health: &RuntimeHealth) -> anyhow::Result<()> {
    for (service, report) in [
        ("recognition service", &health.recognition),
        ("registry", &health.registry),
    ] {
        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            service,
            status = %report.status,
            latency_ms = report.latency.map(|latency| latency.as_millis() as u64),
            "Health probe finished"
        );

        anyhow::ensure!(
            report.is_operational(),
            "{service} is unhealthy: {}",
            report.message.as_deref().unwrap_or("no details")
        );
    }

    Ok(())
}
