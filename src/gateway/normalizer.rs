//! Maps provider-specific JSON onto [`ExtractionResult`].
//!
//! | provider          | video                    | audio                          |
//! |-------------------|--------------------------|--------------------------------|
//! | twitter           | `url`                    | best `formats[]` "audio only"  |
//! | tiktok-primary    | `video` (string/array)   | `music` (string/array)         |
//! | tiktok-secondary  | `data.play`              | none                           |

use super::{
    AudioTrack, ExtractionError, ExtractionReason, ExtractionResult, PlatformHint, ProviderId,
};
use serde_json::{Map, Value};

const AUDIO_ONLY: &str = "audio only";
const STREAMING_PLAYLIST: &str = ".m3u8";

/// Filenames for one request. Video and audio share a single timestamp.
#[derive(Debug, Clone)]
pub struct FileNaming<'a> {
    prefix: &'static str,
    millis: i64,
    video_override: Option<&'a str>,
}

impl<'a> FileNaming<'a> {
    pub fn new(platform: PlatformHint, millis: i64, video_override: Option<&'a str>) -> Self {
        Self {
            prefix: platform.filename_prefix(),
            millis,
            video_override,
        }
    }

    pub fn video(&self) -> String {
        match self.video_override {
            Some(name) => name.to_string(),
            None => format!("{}-{}.mp4", self.prefix, self.millis),
        }
    }

    pub fn audio(&self) -> String {
        format!("{}-audio-{}.mp3", self.prefix, self.millis)
    }

    fn track(&self, url: Option<String>) -> Option<AudioTrack> {
        url.map(|url| AudioTrack {
            url,
            filename: self.audio(),
        })
    }
}

pub fn normalize(
    provider: ProviderId,
    raw: &Value,
    naming: &FileNaming<'_>,
) -> Result<ExtractionResult, ExtractionError> {
    let fail = |reason| ExtractionError { provider, reason };
    let object = raw
        .as_object()
        .ok_or_else(|| fail(ExtractionReason::MissingField("result")))?;

    let (video, audio) = match provider {
        ProviderId::Twitter => {
            let video = required(object, "url").map_err(fail)?;
            (non_empty_str(video), best_audio_format(object.get("formats")))
        }
        ProviderId::TikTokPrimary => {
            let video = required(object, "video").map_err(fail)?;
            (first_url(video), object.get("music").and_then(first_url))
        }
        ProviderId::TikTokSecondary => {
            let data = required(object, "data").map_err(fail)?;
            (data.get("play").and_then(non_empty_str), None)
        }
    };

    let video_url = video.ok_or_else(|| fail(ExtractionReason::VideoNotFound))?;
    Ok(ExtractionResult {
        video_url,
        video_filename: naming.video(),
        audio: naming.track(audio),
    })
}

/// Audio-only pass used by the info lookup. Never fails; an unusable
/// response simply has no audio.
pub fn normalize_audio(
    provider: ProviderId,
    raw: &Value,
    naming: &FileNaming<'_>,
) -> Option<AudioTrack> {
    let audio = match provider {
        ProviderId::Twitter => best_audio_format(raw.get("formats")),
        ProviderId::TikTokPrimary => raw.get("music").and_then(first_url),
        ProviderId::TikTokSecondary => None,
    };
    naming.track(audio)
}

fn required<'v>(
    object: &'v Map<String, Value>,
    field: &'static str,
) -> Result<&'v Value, ExtractionReason> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ExtractionReason::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A string, or the first element of an array of strings.
fn first_url(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(non_empty_str),
        other => non_empty_str(other),
    }
}

/// Picks the audio-only format to offer.
///
/// Downloadable files always win over `.m3u8` playlists, whatever their
/// bitrate; a playlist is used only when no file candidate exists. Within a
/// group the highest `abr` wins, and the earlier entry wins a tie.
fn best_audio_format(formats: Option<&Value>) -> Option<String> {
    let candidates: Vec<(f64, &str)> = formats
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(audio_candidate)
        .collect();

    let files = candidates
        .iter()
        .filter(|(_, url)| !url.contains(STREAMING_PLAYLIST));

    highest_bitrate(files)
        .or_else(|| highest_bitrate(candidates.iter()))
        .map(str::to_string)
}

fn audio_candidate(format: &Value) -> Option<(f64, &str)> {
    if format.get("resolution")?.as_str()? != AUDIO_ONLY {
        return None;
    }
    let url = format.get("url")?.as_str().filter(|url| !url.is_empty())?;
    let abr = bitrate(format.get("abr")?).filter(|abr| *abr > 0.0)?;
    Some((abr, url))
}

/// Some providers send `abr` as a numeric string.
fn bitrate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn highest_bitrate<'a>(candidates: impl Iterator<Item = &'a (f64, &'a str)>) -> Option<&'a str> {
    candidates
        .fold(None::<&(f64, &str)>, |best, candidate| match best {
            Some(current) if current.0 >= candidate.0 => Some(current),
            _ => Some(candidate),
        })
        .map(|(_, url)| *url)
}
