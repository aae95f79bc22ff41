use crate::gateway::{
    AudioTrack, DeliveryMode, ExtractionRequest, ExtractionResult, GatewayError,
    ProviderPreference,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// === API Request/Response Models ===

/// The JSON body for a `POST /download` request.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default, deserialize_with = "string_field")]
    pub url: Option<String>,
    /// Mobile clients ask for the bytes instead of a URL.
    #[serde(default, deserialize_with = "truthy")]
    pub direct: bool,
    #[serde(default, deserialize_with = "string_field")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "string_field")]
    pub api_provider: Option<String>,
}

impl DownloadRequest {
    pub fn into_extraction(self) -> Result<ExtractionRequest, GatewayError> {
        ExtractionRequest::new(
            self.url.as_deref().unwrap_or_default(),
            ProviderPreference::from_client(self.api_provider.as_deref()),
            DeliveryMode::from(self.direct),
            self.filename,
        )
    }
}

/// The JSON body for a `POST /video-info` request.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoRequest {
    #[serde(default, deserialize_with = "string_field")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "string_field")]
    pub api_provider: Option<String>,
}

impl VideoInfoRequest {
    pub fn into_extraction(self) -> Result<ExtractionRequest, GatewayError> {
        ExtractionRequest::new(
            self.url.as_deref().unwrap_or_default(),
            ProviderPreference::from_client(self.api_provider.as_deref()),
            DeliveryMode::Indirect,
            None,
        )
    }
}

/// Indirect `/download` response.
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub url: String,
    pub filename: String,
    pub music_url: Option<String>,
    pub music_filename: Option<String>,
}

impl From<ExtractionResult> for DownloadResponse {
    fn from(result: ExtractionResult) -> Self {
        let (music_url, music_filename) = match result.audio {
            Some(AudioTrack { url, filename }) => (Some(url), Some(filename)),
            None => (None, None),
        };
        Self {
            url: result.video_url,
            filename: result.video_filename,
            music_url,
            music_filename,
        }
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub music_url: Option<String>,
    pub music_filename: Option<String>,
}

impl From<Option<AudioTrack>> for VideoInfoResponse {
    fn from(track: Option<AudioTrack>) -> Self {
        match track {
            Some(AudioTrack { url, filename }) => Self {
                music_url: Some(url),
                music_filename: Some(filename),
            },
            None => Self {
                music_url: None,
                music_filename: None,
            },
        }
    }
}

#[derive(Serialize, Debug)]
pub struct DeprecatedResponse {
    pub error: &'static str,
    pub message: &'static str,
}

// A field of the wrong type is dropped on its own; it never rejects the body.

fn string_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Loose client flags: `null`, `0`, `""` and `false` are off, anything else is on.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Parses a request body, treating anything unparseable as an empty object.
pub fn lenient_json<T>(body: &[u8]) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!("Ignoring unparseable request body: {}", e);
        T::default()
    })
}
