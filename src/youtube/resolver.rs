use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

use crate::http::HttpClient;
use crate::TranscriptError;

use super::WATCH_URL;

const VIDEO_ID_LEN: usize = 11;

/// Path prefixes whose next segment is the video id
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// The one rule for locating the page-embedded API key. The page's init script
/// has spelled this key a few different ways over the years; when it drifts
/// again, this pattern and its fixtures are the only things to change.
static API_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?(?:INNERTUBE_API_KEY|innertubeApiKey)["']?\s*:\s*["']([A-Za-z0-9_-]+)["']"#)
        .expect("api key pattern is a valid regex")
});

/// An 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a string only if it is exactly 11 URL-safe characters
    pub fn parse(candidate: &str) -> Option<Self> {
        let valid = candidate.len() == VIDEO_ID_LEN
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        valid.then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("{}?v={}", WATCH_URL, self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anti-abuse key scraped from the watch page, required by the player endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Derive the video id from a YouTube URL.
///
/// Recognised shapes are `watch?v=ID` (with any other query parameters),
/// `youtu.be/ID` and `/embed|shorts|live|v/ID` on youtube.com hosts. A scheme
/// is optional.
pub fn resolve(url: &str) -> Result<VideoId, TranscriptError> {
    let trimmed = url.trim();
    let invalid = || TranscriptError::InvalidUrl(format!("no video id found in '{}'", trimmed));

    let parsed = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{}", trimmed)))
        .map_err(|_| invalid())?;

    let host = parsed.host_str().ok_or_else(invalid)?.to_ascii_lowercase();

    let candidate = if host == "youtu.be" {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        id_from_query(&parsed).or_else(|| id_from_path(&parsed))
    } else {
        None
    };

    let video_id = candidate
        .as_deref()
        .and_then(VideoId::parse)
        .ok_or_else(invalid)?;

    tracing::debug!("Resolved video id {} from {}", video_id, trimmed);
    Ok(video_id)
}

fn id_from_query(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

fn id_from_path(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    let prefix = segments.next()?;

    if ID_PATH_PREFIXES.contains(&prefix) {
        segments.next().map(str::to_string)
    } else {
        None
    }
}

/// Fetch the watch page for a video and pull the API key out of its markup
pub async fn fetch_page_credential<C>(client: &C, video_id: &VideoId) -> Result<ApiKey, TranscriptError>
where
    C: HttpClient + ?Sized,
{
    let page_url = video_id.watch_url();
    tracing::info!("Fetching watch page: {}", page_url);

    let html = client
        .get_text(&page_url)
        .await
        .map_err(|e| TranscriptError::PageFetchFailed(format!("{:#}", e)))?;

    extract_api_key(&html).ok_or_else(|| {
        let hint = if html.contains("g-recaptcha") {
            " (YouTube served a captcha page; too many requests from this IP)"
        } else {
            ""
        };
        TranscriptError::CredentialExtractionFailed(format!(
            "INNERTUBE_API_KEY not present in the page for video {}{}",
            video_id, hint
        ))
    })
}

/// Find the embedded API key in watch page markup
pub fn extract_api_key(html: &str) -> Option<ApiKey> {
    API_KEY_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| ApiKey(m.as_str().to_string()))
}
