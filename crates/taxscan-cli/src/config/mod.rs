//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── registry: RegistryConfig      # Registry URL, timeout, user agent
//! └── command: Command
//!     ├── run                       # Extract, check and annotate documents
//!     │   ├── runtime: RuntimeConfig # Extraction and lookup concurrency
//!     │   └── gemini: GeminiArgs     # Recognition service credentials
//!     ├── lookup                    # Query the registry for tax IDs
//!     ├── validate                  # Offline tax ID and NCF checks
//!     └── health                    # Probe the recognition service and registry
//!         └── gemini: GeminiArgs
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! taxscan run receipts/*.jpg --concurrency 8 --output report.json
//!
//! # Or via environment variables
//! GEMINI_API_KEY="..." TAXSCAN_CONCURRENCY=8 taxscan run receipts/*.jpg
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use taxscan_inference::gemini::GeminiArgs;
use taxscan_registry::reqwest::RegistryConfig;
use taxscan_runtime::RuntimeConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "taxscan")]
#[command(about = "Extract and validate Dominican fiscal receipts")]
#[command(version)]
pub struct Cli {
    /// Fiscal registry connection settings.
    #[clap(flatten)]
    pub registry: RegistryConfig,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract receipts from documents, check them and look up every vendor.
    Run(RunArgs),
    /// Look up tax IDs in the fiscal registry.
    Lookup(LookupArgs),
    /// Check tax IDs and fiscal document numbers without network access.
    Validate(ValidateArgs),
    /// Check that the recognition service and the registry are reachable.
    Health(HealthArgs),
}

/// Arguments of the `run` command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Image or PDF files to extract; directories are read one level deep
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Write the JSON report to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Skip registry lookups
    #[arg(long)]
    pub no_lookup: bool,

    /// Extraction and lookup concurrency.
    #[clap(flatten)]
    pub runtime: RuntimeConfig,

    /// Recognition service settings.
    #[clap(flatten)]
    pub gemini: GeminiArgs,
}

/// Arguments of the `lookup` command.
#[derive(Debug, Clone, Args)]
pub struct LookupArgs {
    /// RNC or cédula numbers, separators allowed
    #[arg(required = true)]
    pub tax_ids: Vec<String>,
}

/// Arguments of the `validate` command.
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Tax IDs or NCFs to check
    #[arg(required = true)]
    pub values: Vec<String>,
}

/// Arguments of the `health` command.
#[derive(Debug, Clone, Args)]
pub struct HealthArgs {
    /// Recognition service settings.
    #[clap(flatten)]
    pub gemini: GeminiArgs,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments so that its values
    /// act as defaults for every `env`-backed flag.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs go to stderr so that stdout carries only the JSON output.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            registry_url = %self.registry.registry_url,
            registry_timeout_secs = self.registry.registry_timeout,
            accept_invalid_certs = self.registry.accept_invalid_certs,
            "Registry configuration"
        );

        if let Command::Run(args) = &self.command {
            tracing::debug!(
                target: TRACING_TARGET_CONFIG,
                inputs = args.inputs.len(),
                concurrency_limit = args.runtime.concurrency_limit,
                lookup_limit = args.runtime.lookup_limit,
                model = %args.gemini.gemini_model,
                api_key_set = args.gemini.gemini_api_key.is_some(),
                lookups = !args.no_lookup,
                "Run configuration"
            );
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "taxscan",
            "run",
            "a.jpg",
            "b.pdf",
            "-j",
            "2",
            "--no-lookup",
            "--gemini-api-key",
            "key",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.runtime.concurrency_limit, 2);
        assert!(args.no_lookup);
        assert_eq!(args.gemini.gemini_api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_parse_lookup_requires_tax_id() {
        assert!(Cli::try_parse_from(["taxscan", "lookup"]).is_err());

        let cli = Cli::try_parse_from(["taxscan", "lookup", "131563856"]).unwrap();
        assert!(matches!(cli.command, Command::Lookup(args) if args.tax_ids == ["131563856"]));
    }

    #[test]
    fn test_parse_health() {
        let cli = Cli::try_parse_from(["taxscan", "health", "--gemini-model", "gemini-2.5-pro"])
            .unwrap();

        let Command::Health(args) = cli.command else {
            panic!("expected health command");
        };
        assert_eq!(args.gemini.gemini_model, "gemini-2.5-pro");
    }
}
