use super::{GatewayError, HttpMethod, ProviderId};
use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A fully resolved call against one upstream provider.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub provider: ProviderId,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub query: Vec<(&'static str, String)>,
    pub form: Vec<(&'static str, String)>,
}

// Header values carry the API key, so only their names are printed.
impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("UpstreamRequest")
            .field("provider", &self.provider)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("query", &self.query)
            .field("form", &self.form)
            .finish()
    }
}

/// Outbound HTTP used by the gateway.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Metadata call against an extraction provider.
    async fn call(&self, request: UpstreamRequest) -> Result<Value, GatewayError>;

    /// Binary fetch of a resolved media URL. The whole body is buffered.
    async fn fetch_media(&self, url: &str) -> Result<Bytes, GatewayError>;
}

pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, request: UpstreamRequest) -> Result<Value, GatewayError> {
        let provider = request.provider;
        let unavailable = |reason: String| GatewayError::UpstreamUnavailable { provider, reason };

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("status {status}")));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| unavailable(format!("invalid JSON body: {e}")))?;

        tracing::debug!(%provider, "Upstream response: {}", body);
        Ok(body)
    }

    async fn fetch_media(&self, url: &str) -> Result<Bytes, GatewayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Delivery(format!("status {status} for {url}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Delivery(e.to_string()))?;

        tracing::info!("Fetched {} bytes of media", bytes.len());
        Ok(bytes)
    }
}
