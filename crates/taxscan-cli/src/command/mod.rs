//! Command handlers.

mod health;
mod lookup;
mod run;
mod validate;

use anyhow::Context;
use taxscan_inference::gemini::{GeminiArgs, GeminiClient};
use taxscan_registry::RegistryClient;
use taxscan_registry::reqwest::{RegistryConfig, ReqwestTransport};
use taxscan_runtime::Taxscan;

use crate::config::{Cli, Command};

/// Runs the parsed command.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args, cli.registry).await,
        Command::Lookup(args) => lookup::execute(args, cli.registry).await,
        Command::Validate(args) => validate::execute(args).await,
        Command::Health(args) => health::execute(args, cli.registry).await,
    }
}

/// Builds the facade over the Gemini recognition client and the registry.
///
/// Fails on a missing API key before any network access.
fn create_taxscan(gemini: &GeminiArgs, registry: RegistryConfig) -> anyhow::Result<Taxscan> {
    let gemini = gemini
        .to_config()
        .context("invalid recognition service configuration")?;
    let extraction = GeminiClient::new(gemini)
        .context("failed to create recognition client")?
        .into_service();

    Ok(Taxscan::new(extraction, create_registry_client(registry)?))
}

fn create_registry_client(config: RegistryConfig) -> anyhow::Result<RegistryClient> {
    let transport = ReqwestTransport::new(config).context("failed to create registry client")?;
    Ok(transport.into_client())
}
