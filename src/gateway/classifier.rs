use super::PlatformHint;

const TWITTER_MARKERS: [&str; 2] = ["x.com", "twitter.com"];

/// Classifies a source URL by plain, case-sensitive substring match.
///
/// Anything that is not recognisably Twitter/X is routed as TikTok. The URL
/// is not validated here; a malformed one fails later at the upstream call.
pub fn classify(url: &str) -> PlatformHint {
    if TWITTER_MARKERS.iter().any(|marker| url.contains(marker)) {
        PlatformHint::Twitter
    } else {
        PlatformHint::TikTok
    }
}
