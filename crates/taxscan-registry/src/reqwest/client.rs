//! Reqwest-based HTTPS transport with a fresh cookie session per lookup.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Url};

use super::{Error, RegistryConfig, TRACING_TARGET};
use crate::{PostbackForm, RegistryClient, RegistrySession, RegistryTransport, ServiceHealth};

/// Headers a desktop-class mobile browser sends when navigating to the page.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,\
         image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("priority", "u=0, i"),
    ("referer", "https://www.google.com/"),
    (
        "sec-ch-ua",
        "\"Opera\";v=\"120\", \"Not-A.Brand\";v=\"8\", \"Chromium\";v=\"135\"",
    ),
    ("sec-ch-ua-mobile", "?1"),
    ("sec-ch-ua-platform", "\"Android\""),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "cross-site"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

/// Inner transport state shared between clones.
struct ReqwestTransportInner {
    config: RegistryConfig,
    url: Url,
}

/// Reqwest-based transport for the registry search page.
///
/// Every [`open_session`](RegistryTransport::open_session) builds a new HTTP
/// client with its own cookie jar, so the two protocol phases of one lookup
/// share cookies while concurrent lookups never do.
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: Arc<ReqwestTransportInner>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Creates a transport with the given configuration.
    pub fn new(config: RegistryConfig) -> crate::Result<Self> {
        let url = Url::parse(&config.registry_url)
            .map_err(|_| Error::InvalidUrl(config.registry_url.clone()))?;

        if config.accept_invalid_certs {
            tracing::warn!(
                target: TRACING_TARGET,
                url = %url,
                "Registry certificate verification is disabled"
            );
        }

        tracing::debug!(
            target: TRACING_TARGET,
            url = %url,
            timeout_ms = config.effective_timeout().as_millis(),
            "Created registry transport"
        );

        let inner = ReqwestTransportInner { config, url };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the transport configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Converts this transport into a [`RegistryClient`].
    pub fn into_client(self) -> RegistryClient {
        RegistryClient::new(self)
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len());
        for &(name, value) in BROWSER_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers
    }

    fn build_http(&self) -> Result<Client, Error> {
        let config = &self.inner.config;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.effective_timeout())
            .user_agent(config.effective_user_agent())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(http)
    }
}

#[async_trait::async_trait]
impl RegistryTransport for ReqwestTransport {
    async fn open_session(&self) -> crate::Result<Box<dyn RegistrySession>> {
        let http = self.build_http()?;
        Ok(Box::new(ReqwestSession {
            http,
            url: self.inner.url.clone(),
        }))
    }

    async fn health_check(&self) -> crate::Result<ServiceHealth> {
        let start = std::time::Instant::now();
        let http = self.build_http()?;

        let response = http
            .head(self.inner.url.clone())
            .headers(Self::browser_headers())
            .send()
            .await;
        let elapsed = start.elapsed();

        let health = match response {
            Ok(response) if response.status().is_success() => ServiceHealth::healthy(),
            Ok(response) => ServiceHealth::degraded(format!(
                "registry answered with status {}",
                response.status()
            )),
            Err(error) => ServiceHealth::unhealthy(error.to_string()),
        };

        Ok(health.with_latency(elapsed))
    }
}

/// One cookie-continuous conversation with the registry.
struct ReqwestSession {
    http: Client,
    url: Url,
}

#[async_trait::async_trait]
impl RegistrySession for ReqwestSession {
    async fn fetch_search_page(&mut self) -> crate::Result<String> {
        let response = self
            .http
            .get(self.url.clone())
            .headers(ReqwestTransport::browser_headers())
            .send()
            .await
            .map_err(Error::from)?;

        // A block page still carries a body; token capture reports it.
        let status = response.status();
        tracing::debug!(
            target: TRACING_TARGET,
            status = status.as_u16(),
            "Fetched registry search page"
        );

        let body = response.text().await.map_err(Error::from)?;
        Ok(body)
    }

    async fn submit_postback(&mut self, form: &PostbackForm) -> crate::Result<String> {
        let response = self
            .http
            .post(self.url.clone())
            .header("X-MicrosoftAjax", "Delta=true")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::REFERER, self.url.as_str())
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .form(form.fields())
            .send()
            .await
            .map_err(Error::from)?;

        let status = response.status();
        tracing::debug!(
            target: TRACING_TARGET,
            status = status.as_u16(),
            "Submitted registry postback"
        );

        if !status.is_success() {
            return Err(Error::Status(status).into());
        }

        let body = response.text().await.map_err(Error::from)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceStatus;

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let config = RegistryConfig::default().with_registry_url("not a url");
        let error = ReqwestTransport::new(config).unwrap_err();
        assert_eq!(error.kind, crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_browser_headers() {
        let headers = ReqwestTransport::browser_headers();
        assert_eq!(headers.len(), BROWSER_HEADERS.len());
        assert_eq!(headers["sec-fetch-mode"], "navigate");
    }

    #[tokio::test]
    async fn test_unreachable_registry_reports_unhealthy() {
        let config = RegistryConfig::default()
            .with_registry_url("http://127.0.0.1:9/rnc.aspx")
            .with_timeout(2);
        let transport = ReqwestTransport::new(config).unwrap();

        let health = transport.health_check().await.unwrap();
        assert_eq!(health.status, ServiceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_transport_error() {
        let config = RegistryConfig::default()
            .with_registry_url("http://127.0.0.1:9/rnc.aspx")
            .with_timeout(2);
        let client = ReqwestTransport::new(config).unwrap().into_client();

        let error = client.lookup("131563856").await.unwrap_err();
        assert_eq!(error.kind, crate::ErrorKind::RegistryTransport);
    }
}
