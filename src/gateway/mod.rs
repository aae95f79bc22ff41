//! The extraction gateway.
//!
//! A request flows through four stages: the URL is classified into a
//! platform, the provider table picks the upstream endpoint for that platform,
//! the upstream JSON is normalised into an [`ExtractionResult`], and the
//! delivery stage either returns that result or fetches the video bytes.

mod classifier;
mod delivery;
mod normalizer;
mod providers;
mod upstream;

#[cfg(test)]
pub mod testing;

pub use classifier::classify;
pub use delivery::{content_disposition, deliver, sanitize_filename, Delivery};
pub use normalizer::{normalize, normalize_audio, FileNaming};
pub use providers::{
    HeaderTemplate, HttpMethod, ProviderId, ProviderTable, RequestShape, UpstreamProviderConfig,
};
pub use upstream::{HttpUpstream, Upstream, UpstreamRequest};

use axum::body::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Platform a source URL belongs to. Derived once per request by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformHint {
    TikTok,
    Twitter,
    Unknown,
}

impl PlatformHint {
    /// Prefix used when synthesising download filenames.
    pub fn filename_prefix(self) -> &'static str {
        match self {
            PlatformHint::TikTok => "tiktok",
            PlatformHint::Twitter => "twitter",
            PlatformHint::Unknown => "video",
        }
    }
}

impl fmt::Display for PlatformHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformHint::TikTok => "tiktok",
            PlatformHint::Twitter => "twitter",
            PlatformHint::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderPreference {
    #[default]
    Primary,
    Secondary,
}

impl ProviderPreference {
    /// Maps the client's `apiProvider` field. Absent or empty means primary;
    /// anything other than `"primary"` selects the secondary provider.
    pub fn from_client(value: Option<&str>) -> Self {
        match value {
            None | Some("") | Some("primary") => ProviderPreference::Primary,
            Some(_) => ProviderPreference::Secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Fetch the media bytes and hand them to the caller.
    Direct,
    /// Hand back the upstream URLs; the caller fetches them.
    Indirect,
}

impl From<bool> for DeliveryMode {
    fn from(direct: bool) -> Self {
        if direct {
            DeliveryMode::Direct
        } else {
            DeliveryMode::Indirect
        }
    }
}

/// One incoming extraction call. The platform is fixed at construction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    source_url: String,
    platform: PlatformHint,
    preference: ProviderPreference,
    delivery: DeliveryMode,
    requested_filename: Option<String>,
}

impl ExtractionRequest {
    pub fn new(
        source_url: &str,
        preference: ProviderPreference,
        delivery: DeliveryMode,
        requested_filename: Option<String>,
    ) -> Result<Self, GatewayError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(GatewayError::MissingInput);
        }

        Ok(Self {
            platform: classify(source_url),
            source_url: source_url.to_string(),
            preference,
            delivery,
            requested_filename: requested_filename.filter(|name| !name.trim().is_empty()),
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn platform(&self) -> PlatformHint {
        self.platform
    }

    pub fn preference(&self) -> ProviderPreference {
        self.preference
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    pub fn requested_filename(&self) -> Option<&str> {
        self.requested_filename.as_deref()
    }
}

/// An audio track and the filename it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub url: String,
    pub filename: String,
}

/// Canonical output of the normaliser.
///
/// Audio URL and filename travel together in [`AudioTrack`], so a filename
/// can never exist without a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub video_url: String,
    pub video_filename: String,
    pub audio: Option<AudioTrack>,
}

impl ExtractionResult {
    pub fn audio_url(&self) -> Option<&str> {
        self.audio.as_ref().map(|track| track.url.as_str())
    }

    pub fn audio_filename(&self) -> Option<&str> {
        self.audio.as_ref().map(|track| track.filename.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("video URL not found")]
    VideoNotFound,
}

/// A successful upstream response that did not contain what we needed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} response unusable: {reason}")]
pub struct ExtractionError {
    pub provider: ProviderId,
    pub reason: ExtractionReason,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("source URL is required")]
    MissingInput,
    #[error("{0}")]
    Configuration(String),
    #[error("upstream {provider} unavailable: {reason}")]
    UpstreamUnavailable { provider: ProviderId, reason: String },
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("media fetch failed: {0}")]
    Delivery(String),
}

pub type Clock = fn() -> i64;

fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Stateless orchestration over a read-only provider table.
pub struct Gateway {
    providers: ProviderTable,
    upstream: Arc<dyn Upstream>,
    clock: Clock,
}

impl Gateway {
    pub fn new(providers: ProviderTable, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            providers,
            upstream,
            clock: epoch_millis,
        }
    }

    /// Replaces the millisecond clock used for synthesised filenames.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Resolves the request into canonical media URLs. Performs exactly one
    /// upstream call.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, GatewayError> {
        let api_key = self.providers.api_key()?;
        let provider = self
            .providers
            .select(request.platform(), request.preference())?;

        tracing::info!(
            platform = %request.platform(),
            provider = %provider.id,
            "Extracting media for {}",
            request.source_url()
        );

        let raw = self
            .upstream
            .call(provider.request(request.source_url(), api_key))
            .await?;

        let naming = FileNaming::new(
            request.platform(),
            (self.clock)(),
            request.requested_filename(),
        );
        let result = normalize(provider.id, &raw, &naming)?;

        tracing::debug!(
            provider = %provider.id,
            has_audio = result.audio.is_some(),
            "Normalised upstream response"
        );
        Ok(result)
    }

    /// Extracts, then delivers according to the request's delivery mode.
    pub async fn run(&self, request: &ExtractionRequest) -> Result<Delivery, GatewayError> {
        let result = self.extract(request).await?;
        deliver(result, request.delivery(), self.upstream.as_ref()).await
    }

    /// Looks up only the audio track. Providers without audio support answer
    /// `None` without any upstream call.
    pub async fn audio_info(
        &self,
        request: &ExtractionRequest,
    ) -> Result<Option<AudioTrack>, GatewayError> {
        let api_key = self.providers.api_key()?;
        let provider = self
            .providers
            .select(request.platform(), request.preference())?;

        if !provider.supports_audio {
            tracing::debug!(provider = %provider.id, "Provider has no audio track support");
            return Ok(None);
        }

        let raw = self
            .upstream
            .call(provider.request(request.source_url(), api_key))
            .await?;

        let naming = FileNaming::new(request.platform(), (self.clock)(), None);
        Ok(normalize_audio(provider.id, &raw, &naming))
    }

    /// Downloads the bytes of a previously resolved audio track.
    pub async fn fetch_audio(&self, track: &AudioTrack) -> Result<Bytes, GatewayError> {
        self.upstream.fetch_media(&track.url).await
    }
}
