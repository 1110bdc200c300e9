use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod captions;
pub mod entities;
pub mod resolver;

pub use captions::{CaptionTrack, ClientContext, TrackKind, VideoMetadata};
pub use resolver::{resolve, ApiKey, VideoId};

use crate::http::{HttpClient, ReqwestClient};
use crate::TranscriptError;

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
pub const WATCH_URL: &str = "https://www.youtube.com/watch";
pub const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
pub const CHANNEL_URL: &str = "https://www.youtube.com/channel";
pub const THUMBNAIL_URL: &str = "https://i.ytimg.com/vi";

/// Language requested when the caller does not name one
pub const DEFAULT_LANGUAGE: &str = "en";

/// One timed caption line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub text: String,
    pub offset_ms: u64,
    pub duration_ms: u64,
}

impl TranscriptLine {
    pub fn end_ms(&self) -> u64 {
        self.offset_ms.saturating_add(self.duration_ms)
    }
}

/// Everything extracted for one video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// URL as given by the caller
    pub url: String,
    pub video_id: String,
    pub title: String,
    pub author: String,
    /// Canonical channel URL, empty when the response carried no channel id
    pub channel_url: String,
    /// Language code of the caption track that was used
    pub language_code: String,
    pub track_kind: TrackKind,
    /// Caption lines in document order; never empty
    pub lines: Vec<TranscriptLine>,
}

impl TranscriptResult {
    /// Transcript as plain text, one space between lines
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// End of the last caption in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.lines.iter().map(TranscriptLine::end_ms).max().unwrap_or(0)
    }

    pub fn is_auto_generated(&self) -> bool {
        self.track_kind == TrackKind::Asr
    }
}

/// Runs the transcript pipeline for one video at a time.
///
/// Holds no per-call state, so one fetcher can serve sequential calls or be
/// created fresh for each.
pub struct TranscriptFetcher<C> {
    client: C,
    context: ClientContext,
}

impl<C: HttpClient> TranscriptFetcher<C> {
    pub fn new(client: C) -> Self {
        Self::with_context(client, ClientContext::default())
    }

    pub fn with_context(client: C, context: ClientContext) -> Self {
        Self { client, context }
    }

    /// Resolve the URL, scrape the API key, pick a caption track and parse it
    pub async fn fetch(&self, url: &str, lang: &str) -> Result<TranscriptResult, TranscriptError> {
        let video_id = resolve(url)?;
        let api_key = resolver::fetch_page_credential(&self.client, &video_id).await?;

        let player = captions::fetch_player_response(&self.client, &video_id, &api_key, &self.context).await?;
        player.check_playability()?;

        let tracks = player.caption_tracks()?;
        let track = captions::select_track(&tracks, lang)?;

        let document = captions::fetch_caption_document(&self.client, track).await?;
        let lines = captions::parse_caption_document(&document)?;

        let metadata = player.metadata();
        tracing::info!(
            "Extracted {} caption lines for '{}' ({})",
            lines.len(),
            metadata.title,
            video_id
        );

        Ok(TranscriptResult {
            url: url.to_string(),
            video_id: video_id.to_string(),
            title: metadata.title,
            author: metadata.author,
            channel_url: metadata.channel_url,
            language_code: track.language_code.clone(),
            track_kind: track.kind,
            lines,
        })
    }
}

/// Fetch the transcript for a YouTube URL with a default HTTP client.
///
/// `lang` defaults to English.
pub async fn fetch_transcript(url: &str, lang: Option<&str>) -> Result<TranscriptResult, TranscriptError> {
    let client = ReqwestClient::from_config(&crate::config::YoutubeConfig::default())
        .map_err(|e| TranscriptError::PageFetchFailed(format!("could not build HTTP client: {:#}", e)))?;

    TranscriptFetcher::new(client)
        .fetch(url, lang.unwrap_or(DEFAULT_LANGUAGE))
        .await
}

/// Thumbnail sizes published for every video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailQuality {
    Default,
    Medium,
    High,
    Standard,
    #[default]
    Maxres,
}

impl ThumbnailQuality {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ThumbnailQuality::Default => "default",
            ThumbnailQuality::Medium => "mqdefault",
            ThumbnailQuality::High => "hqdefault",
            ThumbnailQuality::Standard => "sddefault",
            ThumbnailQuality::Maxres => "maxresdefault",
        }
    }
}

/// Thumbnail image URL for a video id. No network access.
pub fn get_thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    format!("{}/{}/{}.jpg", THUMBNAIL_URL, video_id, quality.file_stem())
}

/// Quick check for the two YouTube host names
pub fn is_youtube_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use crate::ErrorKind;

    const URL: &str = "https://www.youtube.com/watch?v=abc12345678&t=42";
    const WATCH_PAGE: &str = r#"<html><script>ytcfg.set({"INNERTUBE_API_KEY":"AIzaTestKey"});</script></html>"#;
    const MANUAL_URL: &str = "https://www.youtube.com/api/timedtext?v=abc12345678&lang=en";
    const ASR_URL: &str = "https://www.youtube.com/api/timedtext?v=abc12345678&lang=en&kind=asr";
    const CAPTIONS: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">First line</text><text start="1.5" dur="2">Rock &amp; roll</text></transcript>"#;

    fn player_json(status: &str, tracks: &str) -> String {
        format!(
            r#"{{
                "playabilityStatus": {{"status": "{status}", "reason": "reason text"}},
                "videoDetails": {{"videoId": "abc12345678", "title": "Test Video", "author": "Test Channel", "channelId": "UCtest"}},
                "captions": {{"playerCaptionsTracklistRenderer": {{"captionTracks": [{tracks}]}}}}
            }}"#
        )
    }

    fn two_english_tracks() -> String {
        format!(
            r#"{{"baseUrl": "{ASR_URL}", "languageCode": "en", "kind": "asr"}},
               {{"baseUrl": "{MANUAL_URL}", "languageCode": "en"}}"#
        )
    }

    fn mock_with_player(player: String) -> MockHttpClient {
        let mut client = MockHttpClient::new();
        client
            .expect_get_text()
            .withf(|url| url == "https://www.youtube.com/watch?v=abc12345678")
            .times(1)
            .returning(|_| Ok(WATCH_PAGE.to_string()));
        client
            .expect_post_text()
            .withf(|url, headers, body| {
                url == "https://www.youtube.com/youtubei/v1/player?key=AIzaTestKey"
                    && headers.iter().any(|(k, v)| k == "Content-Type" && v == "application/json")
                    && body.contains("\"videoId\":\"abc12345678\"")
            })
            .times(1)
            .returning(move |_, _, _| Ok(player.clone()));
        client
    }

    #[tokio::test]
    async fn test_end_to_end_prefers_manual_track() {
        let mut client = mock_with_player(player_json("OK", &two_english_tracks()));
        client
            .expect_get_text()
            .withf(|url| url == MANUAL_URL)
            .times(1)
            .returning(|_| Ok(CAPTIONS.to_string()));

        let result = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap();

        assert_eq!(result.url, URL);
        assert_eq!(result.video_id, "abc12345678");
        assert_eq!(result.title, "Test Video");
        assert_eq!(result.author, "Test Channel");
        assert_eq!(result.channel_url, "https://www.youtube.com/channel/UCtest");
        assert_eq!(result.track_kind, TrackKind::Manual);
        assert!(!result.is_auto_generated());
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[1].text, "Rock & roll");
        assert_eq!(result.lines[1].offset_ms, 1500);
        assert_eq!(result.text(), "First line Rock & roll");
        assert_eq!(result.duration_ms(), 3500);
    }

    #[tokio::test]
    async fn test_end_to_end_login_required_stops_before_captions() {
        // The watch page is the only GET allowed; a caption fetch would fail the expectation.
        let client = mock_with_player(player_json("LOGIN_REQUIRED", &two_english_tracks()));

        let err = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AgeRestricted);
    }

    #[tokio::test]
    async fn test_end_to_end_error_status_is_unavailable() {
        let client = mock_with_player(player_json("ERROR", ""));

        let err = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VideoUnavailable);
        assert_eq!(err.message(), "reason text");
    }

    #[tokio::test]
    async fn test_end_to_end_empty_track_list() {
        let client = mock_with_player(player_json("OK", ""));

        let err = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptsDisabled);
    }

    #[tokio::test]
    async fn test_end_to_end_caption_fetch_failure() {
        let mut client = mock_with_player(player_json("OK", &two_english_tracks()));
        client
            .expect_get_text()
            .withf(|url| url == MANUAL_URL)
            .returning(|_| Err(anyhow::anyhow!("GET returned HTTP 429")));

        let err = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CaptionFetchFailed);
    }

    #[tokio::test]
    async fn test_end_to_end_empty_caption_document() {
        let mut client = mock_with_player(player_json("OK", &two_english_tracks()));
        client
            .expect_get_text()
            .withf(|url| url == MANUAL_URL)
            .returning(|_| Ok(String::new()));

        let err = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CaptionParseFailed);
    }

    #[tokio::test]
    async fn test_player_request_failure() {
        let mut client = MockHttpClient::new();
        client
            .expect_get_text()
            .returning(|_| Ok(WATCH_PAGE.to_string()));
        client
            .expect_post_text()
            .returning(|_, _, _| Err(anyhow::anyhow!("POST returned HTTP 403")));

        let err = TranscriptFetcher::new(client).fetch(URL, "en").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PageFetchFailed);
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_requests() {
        let client = MockHttpClient::new();

        let err = TranscriptFetcher::new(client)
            .fetch("https://example.com/video", "en")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }

    #[test]
    fn test_line_end_saturates() {
        let line = TranscriptLine { text: "late".to_string(), offset_ms: u64::MAX - 10, duration_ms: 500 };
        assert_eq!(line.end_ms(), u64::MAX);
    }

    #[test]
    fn test_thumbnail_urls() {
        assert_eq!(
            get_thumbnail_url("abc12345678", ThumbnailQuality::High),
            "https://i.ytimg.com/vi/abc12345678/hqdefault.jpg"
        );
        assert_eq!(
            get_thumbnail_url("abc12345678", ThumbnailQuality::default()),
            "https://i.ytimg.com/vi/abc12345678/maxresdefault.jpg"
        );
        assert!(get_thumbnail_url("abc12345678", ThumbnailQuality::Default).ends_with("/default.jpg"));
        assert!(get_thumbnail_url("abc12345678", ThumbnailQuality::Medium).ends_with("/mqdefault.jpg"));
        assert!(get_thumbnail_url("abc12345678", ThumbnailQuality::Standard).ends_with("/sddefault.jpg"));
    }

    #[test]
    fn test_is_youtube_url() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=abc12345678"));
        assert!(is_youtube_url("https://youtu.be/abc12345678"));
        assert!(is_youtube_url("HTTPS://M.YOUTUBE.COM/watch?v=abc12345678"));
        assert!(!is_youtube_url("https://vimeo.com/12345"));
        assert!(!is_youtube_url(""));
    }
}
