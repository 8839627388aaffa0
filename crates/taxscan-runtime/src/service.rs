//! Caller-facing facade over extraction and registry lookups.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taxscan_core::{
    Document, ExtractedRecord, RegistryRecord, Result, ServiceHealth, is_valid_fiscal_document_number,
    is_valid_tax_id,
};
use taxscan_inference::ExtractionClient;
use taxscan_registry::{LookupCache, RegistryClient};
use tokio_util::sync::CancellationToken;

use crate::{AnnotatedRecord, BatchOrchestrator, BatchStream, RuntimeConfig, TRACING_TARGET, annotate};

/// Health of both external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeHealth {
    /// Recognition service health.
    pub recognition: ServiceHealth,
    /// Registry health.
    pub registry: ServiceHealth,
}

impl RuntimeHealth {
    /// Returns true when both collaborators can take work.
    pub fn is_operational(&self) -> bool {
        self.recognition.is_operational() && self.registry.is_operational()
    }
}

/// Entry point for extracting and validating receipts.
///
/// Owns the process-lifetime [`LookupCache`]; clones share it.
#[derive(Debug, Clone)]
pub struct Taxscan {
    orchestrator: BatchOrchestrator,
    extraction: ExtractionClient,
    registry: RegistryClient,
    cache: Arc<LookupCache>,
    config: RuntimeConfig,
}

impl Taxscan {
    /// Creates a facade with the default configuration.
    pub fn new(extraction: ExtractionClient, registry: RegistryClient) -> Self {
        Self {
            orchestrator: BatchOrchestrator::new(extraction.clone()),
            extraction,
            registry,
            cache: Arc::new(LookupCache::new()),
            config: RuntimeConfig::default(),
        }
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Ties every batch to `token`.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.orchestrator = self.orchestrator.with_cancellation(token);
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the registry lookup cache.
    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Starts extracting `documents`, at most `concurrency_limit` at a time.
    pub fn submit_batch(
        &self,
        documents: Vec<Document>,
        concurrency_limit: usize,
    ) -> Result<BatchStream> {
        self.orchestrator.run(documents, concurrency_limit)
    }

    /// Starts extracting `documents` with the configured concurrency limit.
    pub fn submit(&self, documents: Vec<Document>) -> Result<BatchStream> {
        self.submit_batch(documents, self.config.concurrency_limit)
    }

    /// Looks up a tax ID in the registry, memoized for the life of the facade.
    pub async fn lookup_tax_id(&self, tax_id: &str) -> Result<Option<RegistryRecord>> {
        self.cache.lookup(&self.registry, tax_id).await
    }

    /// Returns true for a 9-digit RNC or an 11-digit cédula.
    pub fn validate_tax_id(&self, value: &str) -> bool {
        is_valid_tax_id(value)
    }

    /// Returns true for a structurally valid NCF.
    pub fn validate_fiscal_document_number(&self, value: &str) -> bool {
        is_valid_fiscal_document_number(value)
    }

    /// Attaches structural checks and registry status to `records`.
    pub async fn annotate(&self, records: Vec<ExtractedRecord>) -> Vec<AnnotatedRecord> {
        annotate(&self.registry, &self.cache, records, self.config.lookup_limit).await
    }

    /// Checks both external collaborators.
    pub async fn health_check(&self) -> Result<RuntimeHealth> {
        let (recognition, registry) =
            tokio::join!(self.extraction.health_check(), self.registry.health_check());

        let health = RuntimeHealth {
            recognition: recognition?,
            registry: registry?,
        };

        tracing::debug!(
            target: TRACING_TARGET,
            recognition = ?health.recognition.status,
            registry = ?health.registry.status,
            "Health check completed"
        );

        Ok(health)
    }
}
