//! Reqwest-based client for the Gemini REST API.

use std::sync::Arc;
use std::time::Instant;

use reqwest::{Client, Response, Url};

use super::wire::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use super::{Error, GeminiConfig, TRACING_TARGET};
use crate::{
    ExtractionClient, RecognitionProvider, RecognitionRequest, RecognitionResponse, ServiceHealth,
};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Inner client that holds the HTTP client and configuration.
struct GeminiClientInner {
    http: Client,
    config: GeminiConfig,
    endpoint: Url,
}

/// Recognition provider backed by Google Gemini.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a new Gemini client with the given configuration.
    pub fn new(config: GeminiConfig) -> crate::Result<Self> {
        let endpoint = config.generate_content_url()?;

        tracing::debug!(
            target: TRACING_TARGET,
            model = %config.model,
            timeout_ms = config.timeout.as_millis(),
            "Creating Gemini client"
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("taxscan/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::from)?;

        let inner = GeminiClientInner {
            http,
            config,
            endpoint,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &GeminiConfig {
        &self.inner.config
    }

    /// Converts this client into an [`ExtractionClient`].
    pub fn into_service(self) -> ExtractionClient {
        ExtractionClient::new(self)
    }

    /// Turns a non-success answer into an error carrying the service's message.
    async fn status_error(response: Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => match envelope.error.status {
                Some(code) => format!("{code}: {}", envelope.error.message),
                None => envelope.error.message,
            },
            Err(_) => body,
        };

        Error::Status { status, message }
    }
}

#[async_trait::async_trait]
impl RecognitionProvider for GeminiClient {
    async fn recognize(&self, request: &RecognitionRequest) -> crate::Result<RecognitionResponse> {
        let start = Instant::now();
        let body = GenerateContentRequest::from(request);

        tracing::debug!(
            target: TRACING_TARGET,
            document_id = %request.document_id,
            model = %self.inner.config.model,
            media_type = %request.part.media_type(),
            "Sending generateContent request"
        );

        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .header(API_KEY_HEADER, &self.inner.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Error::from)?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(Self::status_error(response).await.into());
        }

        let raw = response.text().await.map_err(Error::from)?;

        tracing::debug!(
            target: TRACING_TARGET,
            document_id = %request.document_id,
            status_code,
            elapsed_ms = start.elapsed().as_millis(),
            "Received generateContent response"
        );

        let envelope: GenerateContentResponse = serde_json::from_str(&raw).map_err(|e| {
            crate::Error::schema(raw.as_str())
                .with_message(format!("unexpected response envelope: {e}"))
                .with_source(e)
        })?;

        let Some(text) = envelope.text() else {
            return Err(crate::Error::schema(raw.as_str()).with_message(envelope.empty_reason()));
        };

        let mut response = RecognitionResponse::new(text);
        if let Some(model) = envelope.model_version {
            response = response.with_model(model);
        }

        Ok(response)
    }

    async fn health_check(&self) -> crate::Result<ServiceHealth> {
        let start = Instant::now();
        let url = self.inner.config.model_url()?;

        let result = self
            .inner
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.inner.config.api_key)
            .send()
            .await;
        let elapsed = start.elapsed();

        let health = match result {
            Ok(response) if response.status().is_success() => ServiceHealth::healthy(),
            Ok(response) => {
                ServiceHealth::unhealthy(Self::status_error(response).await.to_string())
            }
            Err(error) => ServiceHealth::unhealthy(error.to_string()),
        };

        Ok(health.with_latency(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use taxscan_core::Document;

    use super::*;
    use crate::{ErrorKind, ServiceStatus};

    fn unreachable_config() -> GeminiConfig {
        GeminiConfig::builder()
            .with_api_key("test-key")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new(unreachable_config()).unwrap();
        assert_eq!(
            client.inner.endpoint.as_str(),
            "http://127.0.0.1:9/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client = GeminiClient::new(unreachable_config()).unwrap();
        let document = Document::new("a.jpg", "image/jpeg", vec![0xFF]);
        let request = RecognitionRequest::for_document(&document).unwrap();

        let error = client.recognize(&request).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::RecognitionTransport);
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unhealthy() {
        let client = GeminiClient::new(unreachable_config()).unwrap();
        let health = client.health_check().await.unwrap();
        assert_eq!(health.status, ServiceStatus::Unhealthy);
    }
}
