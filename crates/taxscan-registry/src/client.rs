//! Registry client wrapping a transport with the lookup protocol.

use std::sync::Arc;
use std::time::Instant;

use taxscan_core::normalize_tax_id;

use crate::{
    FormTokens, PostbackForm, RegistryRecord, RegistryTransport, Result, ServiceHealth,
    TRACING_TARGET, parse_result_table,
};

/// Looks up tax IDs in the fiscal registry.
///
/// Every lookup opens its own session, captures fresh form-state tokens and
/// replays them in a single postback. Sessions are never shared, so concurrent
/// lookups cannot mix cookies or tokens.
#[derive(Clone)]
pub struct RegistryClient {
    inner: Arc<dyn RegistryTransport>,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient").finish_non_exhaustive()
    }
}

impl RegistryClient {
    /// Creates a client over the given transport.
    pub fn new<T>(transport: T) -> Self
    where
        T: RegistryTransport + 'static,
    {
        Self {
            inner: Arc::new(transport),
        }
    }

    /// Creates a client from a shared transport.
    pub fn from_arc(transport: Arc<dyn RegistryTransport>) -> Self {
        Self { inner: transport }
    }

    /// Returns the value submitted to the registry for `tax_id`.
    ///
    /// Well-formed IDs are sent as bare digits; anything else is sent trimmed
    /// and left for the registry to reject.
    pub fn query_value(tax_id: &str) -> String {
        normalize_tax_id(tax_id).unwrap_or_else(|| tax_id.trim().to_owned())
    }

    /// Looks up a single tax ID.
    ///
    /// Returns `Ok(None)` when the registry answers without a result table.
    pub async fn lookup(&self, tax_id: &str) -> Result<Option<RegistryRecord>> {
        let query = Self::query_value(tax_id);
        let start = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            tax_id = %query,
            "Looking up tax ID"
        );

        let result = self.lookup_once(&query).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(Some(record)) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    tax_id = %query,
                    fields = record.len(),
                    status = record.status().unwrap_or_default(),
                    elapsed_ms = elapsed.as_millis(),
                    "Tax ID found"
                );
            }
            Ok(None) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    tax_id = %query,
                    elapsed_ms = elapsed.as_millis(),
                    "Tax ID not registered"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    tax_id = %query,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Registry lookup failed"
                );
            }
        }

        result
    }

    async fn lookup_once(&self, query: &str) -> Result<Option<RegistryRecord>> {
        let mut session = self.inner.open_session().await?;

        let page = session.fetch_search_page().await?;
        let tokens = FormTokens::from_search_page(&page)?;

        tracing::trace!(
            target: TRACING_TARGET,
            view_state_len = tokens.view_state.len(),
            "Captured form-state tokens"
        );

        let form = PostbackForm::search(&tokens, query);
        let body = session.submit_postback(&form).await?;

        Ok(parse_result_table(query, &body))
    }

    /// Performs a health check on the underlying transport.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{Error, ErrorKind, RegistrySession};

    pub(crate) const SEARCH_PAGE: &str = r#"<form>
        <input type="hidden" name="__VIEWSTATE" value="vs-token" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" value="gen-token" />
        <input type="hidden" name="__EVENTVALIDATION" value="ev-token" />
    </form>"#;

    pub(crate) const FOUND: &str = r#"1|#||4|300|updatePanel|ctl00_cphMain_upBusqueda|
        <table id="cphMain_dvDatosContribuyentes">
            <tr><td>Nombre/Razón Social:</td><td>ACME SRL</td></tr>
            <tr><td>Estado:</td><td>ACTIVO</td></tr>
        </table>|"#;

    /// Canned transport recording every postback it receives.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub page: String,
        pub result: String,
        pub fail_postback: bool,
        pub sessions: Arc<AtomicUsize>,
        pub forms: Arc<Mutex<Vec<PostbackForm>>>,
    }

    impl MockTransport {
        pub(crate) fn new(page: &str, result: &str) -> Self {
            Self {
                page: page.to_owned(),
                result: result.to_owned(),
                ..Default::default()
            }
        }
    }

    struct MockSession {
        page: String,
        result: String,
        fail_postback: bool,
        forms: Arc<Mutex<Vec<PostbackForm>>>,
    }

    #[async_trait::async_trait]
    impl RegistryTransport for MockTransport {
        async fn open_session(&self) -> Result<Box<dyn RegistrySession>> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockSession {
                page: self.page.clone(),
                result: self.result.clone(),
                fail_postback: self.fail_postback,
                forms: self.forms.clone(),
            }))
        }

        async fn health_check(&self) -> Result<ServiceHealth> {
            Ok(ServiceHealth::healthy())
        }
    }

    #[async_trait::async_trait]
    impl RegistrySession for MockSession {
        async fn fetch_search_page(&mut self) -> Result<String> {
            Ok(self.page.clone())
        }

        async fn submit_postback(&mut self, form: &PostbackForm) -> Result<String> {
            self.forms.lock().unwrap().push(form.clone());
            if self.fail_postback {
                return Err(Error::registry_transport().with_message("connection reset"));
            }
            Ok(self.result.clone())
        }
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let transport = MockTransport::new(SEARCH_PAGE, FOUND);
        let forms = transport.forms.clone();
        let client = RegistryClient::new(transport);

        let record = client.lookup("1-31-56385-6").await.unwrap().unwrap();
        assert_eq!(record.tax_id, "131563856");
        assert_eq!(record.name(), Some("ACME SRL"));
        assert_eq!(record.status(), Some("ACTIVO"));

        let forms = forms.lock().unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].tax_id(), Some("131563856"));
        assert_eq!(forms[0].get("__VIEWSTATE"), Some("vs-token"));
        assert_eq!(forms[0].get("__EVENTVALIDATION"), Some("ev-token"));
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let transport = MockTransport::new(SEARCH_PAGE, "1|#||4|0|updatePanel|x||");
        let client = RegistryClient::new(transport);

        assert_eq!(client.lookup("999999999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_without_tokens_never_posts() {
        let transport = MockTransport::new("<html><body>Access denied</body></html>", FOUND);
        let forms = transport.forms.clone();
        let client = RegistryClient::new(transport);

        let error = client.lookup("131563856").await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::RegistryProtocol);
        assert!(forms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_transport_failure() {
        let transport = MockTransport {
            fail_postback: true,
            ..MockTransport::new(SEARCH_PAGE, FOUND)
        };
        let client = RegistryClient::new(transport);

        let error = client.lookup("131563856").await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::RegistryTransport);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_query_value() {
        assert_eq!(RegistryClient::query_value(" 001-1234567-8 "), "00112345678");
        assert_eq!(RegistryClient::query_value(" ACME "), "ACME");
    }
}
