//! Mock registry transport for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taxscan_core::{Error, Result, ServiceHealth};
use taxscan_registry::{PostbackForm, RegistrySession, RegistryTransport};

/// Search page carrying the three form-state tokens.
pub const REGISTRY_SEARCH_PAGE: &str = r#"<html><body><form method="post" id="aspnetForm">
    <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="mock-view-state" />
    <input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="mock-generator" />
    <input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="mock-validation" />
</form></body></html>"#;

/// Postback answer without a result table.
const NOT_FOUND_PAGE: &str = "1|#||4|64|updatePanel|ctl00_cphMain_upBusqueda|\
    <span>No se encontraron registros.</span>|";

/// Renders a postback answer listing `fields` in the result table.
pub fn registry_result_page(fields: &[(&str, &str)]) -> String {
    let rows: String = fields
        .iter()
        .map(|(key, value)| format!("<tr><td>{key}:</td><td>{value}</td></tr>"))
        .collect();

    format!(
        "1|#||4|{}|updatePanel|ctl00_cphMain_upBusqueda|\
         <table id=\"cphMain_dvDatosContribuyentes\">{rows}</table>|",
        rows.len()
    )
}

#[derive(Debug, Default)]
struct Registry {
    taxpayers: HashMap<String, String>,
    failing: Vec<String>,
}

/// Mock registry transport for testing.
///
/// Serves [`REGISTRY_SEARCH_PAGE`] and answers postbacks for registered tax
/// IDs with a result table; any other ID gets an empty answer.
#[derive(Clone, Default, Debug)]
pub struct MockRegistryTransport {
    registry: Arc<Mutex<Registry>>,
    delay: Duration,
    health: Option<ServiceHealth>,
    sessions: Arc<AtomicUsize>,
}

impl MockRegistryTransport {
    /// Creates an empty mock registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a taxpayer with the given result table rows.
    #[must_use]
    pub fn with_taxpayer(self, tax_id: &str, fields: &[(&str, &str)]) -> Self {
        if let Ok(mut registry) = self.registry.lock() {
            registry
                .taxpayers
                .insert(tax_id.to_owned(), registry_result_page(fields));
        }
        self
    }

    /// Makes every postback for `tax_id` fail with a transport error.
    #[must_use]
    pub fn with_failure_for(self, tax_id: &str) -> Self {
        if let Ok(mut registry) = self.registry.lock() {
            registry.failing.push(tax_id.to_owned());
        }
        self
    }

    /// Delays each postback by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answers health checks with `health` instead of a healthy report.
    #[must_use]
    pub fn with_health(mut self, health: ServiceHealth) -> Self {
        self.health = Some(health);
        self
    }

    /// Returns the number of sessions opened, one per uncached lookup.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RegistryTransport for MockRegistryTransport {
    async fn open_session(&self) -> Result<Box<dyn RegistrySession>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockRegistrySession {
            registry: self.registry.clone(),
            delay: self.delay,
        }))
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(self.health.clone().unwrap_or_else(ServiceHealth::healthy))
    }
}

struct MockRegistrySession {
    registry: Arc<Mutex<Registry>>,
    delay: Duration,
}

#[async_trait::async_trait]
impl RegistrySession for MockRegistrySession {
    async fn fetch_search_page(&mut self) -> Result<String> {
        Ok(REGISTRY_SEARCH_PAGE.to_owned())
    }

    async fn submit_postback(&mut self, form: &PostbackForm) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let tax_id = form.tax_id().unwrap_or_default();
        let registry = self
            .registry
            .lock()
            .map_err(|_| Error::internal().with_message("mock registry poisoned"))?;

        if registry.failing.iter().any(|id| id == tax_id) {
            return Err(Error::registry_transport().with_message("scripted mock failure"));
        }

        Ok(registry
            .taxpayers
            .get(tax_id)
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_PAGE.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use taxscan_registry::RegistryClient;

    use super::*;

    #[tokio::test]
    async fn test_registered_taxpayer() {
        let transport = MockRegistryTransport::new()
            .with_taxpayer("131563856", &[("Nombre/Razón Social", "ACME SRL"), ("Estado", "ACTIVO")]);
        let client = RegistryClient::new(transport.clone());

        let record = client.lookup("131563856").await.unwrap().unwrap();
        assert_eq!(record.name(), Some("ACME SRL"));
        assert!(record.is_active());

        assert_eq!(client.lookup("101010101").await.unwrap(), None);
        assert_eq!(transport.sessions(), 2);
    }
}
