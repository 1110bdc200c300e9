use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use crate::http::HttpClient;
use crate::TranscriptError;

use super::entities::decode_entities;
use super::resolver::{ApiKey, VideoId};
use super::{TranscriptLine, CHANNEL_URL, PLAYER_URL, YOUTUBE_BASE_URL};

static CLASSIC_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("classic cue pattern is a valid regex")
});

static FORMAT3_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<p\b([^>]*?)(?:/>|>(.*?)</p>)").expect("format 3 cue pattern is a valid regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern is a valid regex")
});

static INNER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("inner tag pattern is a valid regex"));

/// Client identity sent in the player request context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub name: String,
    pub version: String,
    pub hl: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            name: "ANDROID".to_string(),
            version: "20.10.38".to_string(),
            hl: "en".to_string(),
        }
    }
}

// Player endpoint response. Everything is optional: the payload comes from an
// undocumented API and is validated field by field before use.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<RawCaptionTrack>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: Option<String>,
    language_code: Option<String>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    title: Option<String>,
    author: Option<String>,
    channel_id: Option<String>,
}

/// Whether a caption track was authored or generated by speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Asr,
    Manual,
}

/// One available transcript for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub kind: TrackKind,
    pub source_url: String,
}

impl CaptionTrack {
    fn has_language(&self, lang: &str) -> bool {
        self.language_code.eq_ignore_ascii_case(lang)
    }

    fn extends_language(&self, lang: &str) -> bool {
        let code = self.language_code.to_ascii_lowercase();
        let lang = lang.to_ascii_lowercase();
        code.strip_prefix(lang.as_str())
            .is_some_and(|rest| rest.starts_with(['-', '_']))
    }

    fn shares_base_language(&self, lang: &str) -> bool {
        primary_subtag(&self.language_code).eq_ignore_ascii_case(primary_subtag(lang))
    }
}

fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Title, author and channel taken from the player response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    pub channel_url: String,
}

/// A named tier in the track preference order
pub struct PreferenceRule {
    pub name: &'static str,
    pub matches: fn(&CaptionTrack, &str) -> bool,
}

fn exact_manual(track: &CaptionTrack, lang: &str) -> bool {
    track.has_language(lang) && track.kind == TrackKind::Manual
}

fn exact_any_kind(track: &CaptionTrack, lang: &str) -> bool {
    track.has_language(lang)
}

fn language_prefix(track: &CaptionTrack, lang: &str) -> bool {
    track.extends_language(lang)
}

fn same_base_language(track: &CaptionTrack, lang: &str) -> bool {
    track.shares_base_language(lang)
}

fn any_track(_track: &CaptionTrack, _lang: &str) -> bool {
    true
}

/// Track preferences in priority order; the first rule with a match wins
pub static TRACK_PREFERENCES: &[PreferenceRule] = &[
    PreferenceRule { name: "exact language, manual", matches: exact_manual },
    PreferenceRule { name: "exact language", matches: exact_any_kind },
    PreferenceRule { name: "language prefix", matches: language_prefix },
    PreferenceRule { name: "same base language", matches: same_base_language },
    PreferenceRule { name: "first available", matches: any_track },
];

/// Pick the caption track to use for the requested language
pub fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Result<&'a CaptionTrack, TranscriptError> {
    for rule in TRACK_PREFERENCES {
        if let Some(track) = tracks.iter().find(|track| (rule.matches)(track, lang)) {
            tracing::info!(
                "Selected {} caption track ({:?}) by rule '{}'",
                track.language_code,
                track.kind,
                rule.name
            );
            return Ok(track);
        }
    }

    Err(TranscriptError::NoMatchingTrack(format!(
        "none of {} tracks can serve language '{}'",
        tracks.len(),
        lang
    )))
}

/// JSON body for the player endpoint
pub fn player_request_body(video_id: &VideoId, client: &ClientContext) -> String {
    serde_json::json!({
        "context": {
            "client": {
                "clientName": client.name,
                "clientVersion": client.version,
                "hl": client.hl,
            }
        },
        "videoId": video_id.as_str(),
    })
    .to_string()
}

/// Query the player endpoint for a video's metadata and caption tracks
pub async fn fetch_player_response<C>(
    client: &C,
    video_id: &VideoId,
    api_key: &ApiKey,
    context: &ClientContext,
) -> Result<PlayerResponse, TranscriptError>
where
    C: HttpClient + ?Sized,
{
    let url = format!("{}?key={}", PLAYER_URL, urlencoding::encode(api_key.as_str()));
    let headers = vec![("Content-Type".to_string(), "application/json".to_string())];

    tracing::info!("Requesting player metadata for {}", video_id);

    let body = client
        .post_text(&url, headers, player_request_body(video_id, context))
        .await
        .map_err(|e| TranscriptError::PageFetchFailed(format!("player request failed: {:#}", e)))?;

    parse_player_response(&body)
}

pub fn parse_player_response(body: &str) -> Result<PlayerResponse, TranscriptError> {
    serde_json::from_str(body)
        .map_err(|e| TranscriptError::PageFetchFailed(format!("malformed player response: {}", e)))
}

impl PlayerResponse {
    /// Fail early for videos that cannot be played without a login or at all
    pub fn check_playability(&self) -> Result<(), TranscriptError> {
        let Some(playability) = &self.playability_status else {
            return Ok(());
        };

        let reason = || {
            playability
                .reason
                .clone()
                .unwrap_or_else(|| "no reason given".to_string())
        };

        match playability.status.as_deref() {
            None | Some("OK") => Ok(()),
            Some("LOGIN_REQUIRED") => Err(TranscriptError::AgeRestricted(reason())),
            Some("ERROR") | Some("UNPLAYABLE") => Err(TranscriptError::VideoUnavailable(reason())),
            Some(other) => {
                tracing::warn!("Unrecognised playability status '{}', continuing", other);
                Ok(())
            }
        }
    }

    /// Valid caption tracks in the order the response lists them
    pub fn caption_tracks(&self) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let raw_tracks = self
            .captions
            .as_ref()
            .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
            .and_then(|r| r.caption_tracks.as_ref())
            .ok_or_else(|| TranscriptError::TranscriptsDisabled("no caption track list in response".to_string()))?;

        let tracks: Vec<CaptionTrack> = raw_tracks.iter().filter_map(validate_track).collect();

        if tracks.is_empty() {
            return Err(TranscriptError::TranscriptsDisabled(
                "caption track list is empty".to_string(),
            ));
        }

        tracing::debug!("Found {} caption tracks", tracks.len());
        Ok(tracks)
    }

    pub fn metadata(&self) -> VideoMetadata {
        let Some(details) = &self.video_details else {
            return VideoMetadata::default();
        };

        let channel_url = details
            .channel_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}/{}", CHANNEL_URL, id))
            .unwrap_or_default();

        VideoMetadata {
            title: details.title.clone().unwrap_or_default(),
            author: details.author.clone().unwrap_or_default(),
            channel_url,
        }
    }
}

fn validate_track(raw: &RawCaptionTrack) -> Option<CaptionTrack> {
    let (Some(base_url), Some(language_code)) = (&raw.base_url, &raw.language_code) else {
        tracing::debug!("Skipping caption track without url or language: {:?}", raw);
        return None;
    };

    let source_url = match Url::parse(base_url) {
        Ok(url) => url,
        Err(_) => Url::parse(YOUTUBE_BASE_URL).and_then(|base| base.join(base_url)).ok()?,
    };

    let kind = match raw.kind.as_deref() {
        Some("asr") => TrackKind::Asr,
        _ => TrackKind::Manual,
    };

    Some(CaptionTrack {
        language_code: language_code.clone(),
        kind,
        source_url: source_url.to_string(),
    })
}

/// Download the raw caption document for a track
pub async fn fetch_caption_document<C>(client: &C, track: &CaptionTrack) -> Result<String, TranscriptError>
where
    C: HttpClient + ?Sized,
{
    tracing::info!("Downloading {} captions", track.language_code);

    client
        .get_text(&track.source_url)
        .await
        .map_err(|e| TranscriptError::CaptionFetchFailed(format!("{:#}", e)))
}

/// Parse a timed-text document into transcript lines.
///
/// Accepts the classic `<transcript><text start dur>` layout (seconds) and the
/// format 3 `<timedtext><body><p t d>` layout (milliseconds). Cues keep their
/// document order.
pub fn parse_caption_document(document: &str) -> Result<Vec<TranscriptLine>, TranscriptError> {
    let trimmed = document.trim_start_matches('\u{feff}').trim();

    if trimmed.is_empty() {
        return Err(TranscriptError::CaptionParseFailed(
            "caption document is empty".to_string(),
        ));
    }
    if !trimmed.starts_with('<') {
        return Err(TranscriptError::CaptionParseFailed(
            "caption document is not markup".to_string(),
        ));
    }

    let lines = if trimmed.contains("<transcript") {
        parse_cues(trimmed, &CLASSIC_CUE, CueTiming::Seconds)?
    } else if trimmed.contains("<timedtext") {
        parse_cues(trimmed, &FORMAT3_CUE, CueTiming::Milliseconds)?
    } else {
        return Err(TranscriptError::CaptionParseFailed(
            "unrecognised caption document root".to_string(),
        ));
    };

    if lines.is_empty() {
        return Err(TranscriptError::CaptionParseFailed(
            "caption document has no cues".to_string(),
        ));
    }

    Ok(lines)
}

#[derive(Clone, Copy)]
enum CueTiming {
    /// `start` / `dur` in fractional seconds
    Seconds,
    /// `t` / `d` in milliseconds
    Milliseconds,
}

impl CueTiming {
    fn attribute_names(self) -> (&'static str, &'static str) {
        match self {
            CueTiming::Seconds => ("start", "dur"),
            CueTiming::Milliseconds => ("t", "d"),
        }
    }

    fn to_millis(self, value: f64) -> Option<u64> {
        match self {
            CueTiming::Seconds => seconds_to_millis(value),
            CueTiming::Milliseconds => whole_millis(value),
        }
    }
}

/// Latest cue time accepted, about 31 years
const MAX_CUE_MILLIS: f64 = 1e12;

/// Whole milliseconds, rounding halves away from zero. `None` past the
/// latest accepted cue time.
pub fn seconds_to_millis(seconds: f64) -> Option<u64> {
    whole_millis(seconds * 1000.0)
}

fn whole_millis(millis: f64) -> Option<u64> {
    let millis = millis.round();
    (millis <= MAX_CUE_MILLIS).then_some(millis as u64)
}

fn parse_cues(document: &str, cue: &Regex, timing: CueTiming) -> Result<Vec<TranscriptLine>, TranscriptError> {
    let (start_attr, duration_attr) = timing.attribute_names();
    let mut lines = Vec::new();

    for caps in cue.captures_iter(document) {
        let attributes = caps.get(1).map_or("", |m| m.as_str());
        let raw_text = caps.get(2).map_or("", |m| m.as_str());

        let text = clean_cue_text(raw_text);
        // Format 3 append markers only carry the line break between rolling cues
        if text.is_empty() && attribute(attributes, "a").as_deref() == Some("1") {
            continue;
        }

        let start = attribute(attributes, start_attr)
            .as_deref()
            .and_then(parse_time)
            .ok_or_else(|| {
                TranscriptError::CaptionParseFailed(format!(
                    "cue without a valid '{}' attribute: {}",
                    start_attr,
                    caps.get(0).map_or("", |m| m.as_str())
                ))
            })?;

        let duration = match attribute(attributes, duration_attr) {
            Some(value) => parse_time(&value).ok_or_else(|| {
                TranscriptError::CaptionParseFailed(format!(
                    "cue with an invalid '{}' attribute: {}",
                    duration_attr, value
                ))
            })?,
            None => 0.0,
        };

        let (Some(offset_ms), Some(duration_ms)) = (timing.to_millis(start), timing.to_millis(duration)) else {
            return Err(TranscriptError::CaptionParseFailed(format!(
                "cue time out of range: {}",
                caps.get(0).map_or("", |m| m.as_str())
            )));
        };

        lines.push(TranscriptLine { text, offset_ms, duration_ms });
    }

    Ok(lines)
}

fn attribute(attributes: &str, name: &str) -> Option<String> {
    ATTRIBUTE
        .captures_iter(attributes)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|value| value.as_str().to_string())
}

fn parse_time(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn clean_cue_text(raw: &str) -> String {
    let without_tags = INNER_TAG.replace_all(raw, "");
    decode_entities(&without_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
