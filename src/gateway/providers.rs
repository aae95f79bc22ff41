use super::{GatewayError, PlatformHint, ProviderPreference, UpstreamRequest};
use crate::config::{Config, EndpointConfig};
use std::collections::HashMap;
use std::fmt;

const API_KEY_HEADER: &str = "X-RapidAPI-Key";
const API_HOST_HEADER: &str = "X-RapidAPI-Host";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Twitter,
    TikTokPrimary,
    TikTokSecondary,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderId::Twitter => "twitter",
            ProviderId::TikTokPrimary => "tiktok-primary",
            ProviderId::TikTokSecondary => "tiktok-secondary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Where the source URL goes in the upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    Query { param: &'static str },
    Form { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderTemplate {
    Literal(String),
    /// Replaced by the configured API key when a request is built.
    ApiKey,
}

/// Static description of one upstream endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamProviderConfig {
    pub id: ProviderId,
    pub method: HttpMethod,
    pub base_url: String,
    pub headers: Vec<(&'static str, HeaderTemplate)>,
    pub shape: RequestShape,
    pub supports_audio: bool,
}

impl UpstreamProviderConfig {
    fn rapidapi(
        id: ProviderId,
        method: HttpMethod,
        endpoint: &EndpointConfig,
        shape: RequestShape,
        supports_audio: bool,
    ) -> Self {
        Self {
            id,
            method,
            base_url: endpoint.base_url.clone(),
            headers: vec![
                (API_KEY_HEADER, HeaderTemplate::ApiKey),
                (API_HOST_HEADER, HeaderTemplate::Literal(endpoint.host.clone())),
            ],
            shape,
            supports_audio,
        }
    }

    /// Fills the templates in for one source URL.
    pub fn request(&self, source_url: &str, api_key: &str) -> UpstreamRequest {
        let headers = self
            .headers
            .iter()
            .map(|(name, template)| {
                let value = match template {
                    HeaderTemplate::Literal(value) => value.clone(),
                    HeaderTemplate::ApiKey => api_key.to_string(),
                };
                (*name, value)
            })
            .collect();

        let mut request = UpstreamRequest {
            provider: self.id,
            method: self.method,
            url: self.base_url.clone(),
            headers,
            query: Vec::new(),
            form: Vec::new(),
        };
        match self.shape {
            RequestShape::Query { param } => request.query.push((param, source_url.to_string())),
            RequestShape::Form { field } => request.form.push((field, source_url.to_string())),
        }
        request
    }
}

/// Process-wide routing table from `(platform, preference)` to an upstream.
/// Built once at startup and never mutated.
pub struct ProviderTable {
    providers: HashMap<ProviderId, UpstreamProviderConfig>,
    routes: HashMap<(PlatformHint, ProviderPreference), ProviderId>,
    api_key: Option<String>,
}

impl ProviderTable {
    pub fn from_config(config: &Config) -> Self {
        let endpoints = &config.providers;
        let providers = [
            UpstreamProviderConfig::rapidapi(
                ProviderId::Twitter,
                HttpMethod::Post,
                &endpoints.twitter,
                RequestShape::Form { field: "url" },
                true,
            ),
            UpstreamProviderConfig::rapidapi(
                ProviderId::TikTokPrimary,
                HttpMethod::Get,
                &endpoints.tiktok_primary,
                RequestShape::Query { param: "url" },
                true,
            ),
            UpstreamProviderConfig::rapidapi(
                ProviderId::TikTokSecondary,
                HttpMethod::Get,
                &endpoints.tiktok_secondary,
                RequestShape::Query { param: "url" },
                false,
            ),
        ];

        // Twitter has a single upstream; the preference is ignored.
        let routes = HashMap::from([
            ((PlatformHint::Twitter, ProviderPreference::Primary), ProviderId::Twitter),
            ((PlatformHint::Twitter, ProviderPreference::Secondary), ProviderId::Twitter),
            ((PlatformHint::TikTok, ProviderPreference::Primary), ProviderId::TikTokPrimary),
            ((PlatformHint::TikTok, ProviderPreference::Secondary), ProviderId::TikTokSecondary),
        ]);

        Self {
            providers: providers.into_iter().map(|p| (p.id, p)).collect(),
            routes,
            api_key: config.api_key().map(str::to_string),
        }
    }

    pub fn select(
        &self,
        platform: PlatformHint,
        preference: ProviderPreference,
    ) -> Result<&UpstreamProviderConfig, GatewayError> {
        self.routes
            .get(&(platform, preference))
            .and_then(|id| self.providers.get(id))
            .ok_or_else(|| {
                GatewayError::Configuration(format!(
                    "no upstream provider for {platform} with {preference:?} preference"
                ))
            })
    }

    pub fn api_key(&self) -> Result<&str, GatewayError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Configuration("API key not found".to_string()))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
