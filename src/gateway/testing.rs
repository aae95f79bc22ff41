//! Test doubles for the gateway.

use super::{GatewayError, ProviderId, ProviderTable, Upstream, UpstreamRequest};
use crate::config::Config;
use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub fn test_providers(api_key: Option<&str>) -> ProviderTable {
    let mut config = Config::default();
    config.api_key = api_key.map(str::to_string);
    ProviderTable::from_config(&config)
}

/// Canned upstream that records every call it receives.
#[derive(Default)]
pub struct MockUpstream {
    responses: HashMap<ProviderId, Value>,
    media: Option<Bytes>,
    calls: Mutex<Vec<UpstreamRequest>>,
    fetches: Mutex<Vec<String>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self {
            media: Some(Bytes::new()),
            ..Default::default()
        }
    }

    pub fn with_response(mut self, provider: ProviderId, body: Value) -> Self {
        self.responses.insert(provider, body);
        self
    }

    pub fn with_media(mut self, bytes: &'static [u8]) -> Self {
        self.media = Some(Bytes::from_static(bytes));
        self
    }

    pub fn failing_media(mut self) -> Self {
        self.media = None;
        self
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn call(&self, request: UpstreamRequest) -> Result<Value, GatewayError> {
        let provider = request.provider;
        self.calls.lock().unwrap().push(request);
        self.responses
            .get(&provider)
            .cloned()
            .ok_or_else(|| GatewayError::UpstreamUnavailable {
                provider,
                reason: "status 503 Service Unavailable".to_string(),
            })
    }

    async fn fetch_media(&self, url: &str) -> Result<Bytes, GatewayError> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.media
            .clone()
            .ok_or_else(|| GatewayError::Delivery(format!("status 404 Not Found for {url}")))
    }
}
