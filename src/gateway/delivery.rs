use super::{DeliveryMode, ExtractionResult, GatewayError, Upstream};
use axum::body::Bytes;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._\-() ]").unwrap());

const FALLBACK_FILENAME: &str = "video.mp4";

#[derive(Debug)]
pub enum Delivery {
    /// The caller fetches the URLs itself.
    Reference(ExtractionResult),
    /// Video bytes fetched on the caller's behalf. Audio is never inlined.
    Media { filename: String, bytes: Bytes },
}

/// `Indirect` performs no network I/O. `Direct` performs exactly one fetch,
/// of `result.video_url`, and returns nothing unless it fully succeeds.
pub async fn deliver(
    result: ExtractionResult,
    mode: DeliveryMode,
    upstream: &dyn Upstream,
) -> Result<Delivery, GatewayError> {
    match mode {
        DeliveryMode::Indirect => Ok(Delivery::Reference(result)),
        DeliveryMode::Direct => {
            let bytes = upstream.fetch_media(&result.video_url).await?;
            Ok(Delivery::Media {
                filename: result.video_filename,
                bytes,
            })
        }
    }
}

/// Reduces a filename to characters that are safe in a header or a path.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// `attachment; filename="..."`, plus an RFC 5987 `filename*` when the
/// name had to be altered to fit in the quoted form.
pub fn content_disposition(filename: &str) -> String {
    let safe = sanitize_filename(filename);
    if safe == filename {
        format!("attachment; filename=\"{safe}\"")
    } else {
        format!(
            "attachment; filename=\"{safe}\"; filename*=UTF-8''{}",
            utf8_percent_encode(filename, NON_ALPHANUMERIC)
        )
    }
}
