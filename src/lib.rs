//! YT Summarizer - extract YouTube transcripts and turn them into summarized notes
//!
//! The core of this library is the transcript pipeline in [`youtube`]: resolve a
//! watch URL to its video id, scrape the page-embedded API key, query the player
//! endpoint, pick a caption track and parse it into timed lines. Everything around
//! it (language-model summaries, note rendering, settings) is host glue.

pub mod cli;
pub mod config;
pub mod http;
pub mod output;
pub mod summarize;
pub mod utils;
pub mod youtube;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use http::{HttpClient, ReqwestClient};
pub use summarize::{SummaryError, SummaryProvider};
pub use youtube::{
    fetch_transcript, get_thumbnail_url, is_youtube_url, ThumbnailQuality, TranscriptFetcher,
    TranscriptLine, TranscriptResult,
};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Coarse classification of a transcript pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    PageFetchFailed,
    CredentialExtractionFailed,
    AgeRestricted,
    VideoUnavailable,
    TranscriptsDisabled,
    NoMatchingTrack,
    CaptionFetchFailed,
    CaptionParseFailed,
}

/// Error types raised by the transcript pipeline. All of them are terminal.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch video page: {0}")]
    PageFetchFailed(String),

    #[error("Could not find the API key in the video page: {0}")]
    CredentialExtractionFailed(String),

    #[error("Video is age restricted: {0}")]
    AgeRestricted(String),

    #[error("Video is unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Transcripts are disabled for this video: {0}")]
    TranscriptsDisabled(String),

    #[error("No caption track matches the request: {0}")]
    NoMatchingTrack(String),

    #[error("Failed to fetch captions: {0}")]
    CaptionFetchFailed(String),

    #[error("Failed to parse captions: {0}")]
    CaptionParseFailed(String),
}

impl TranscriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranscriptError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            TranscriptError::PageFetchFailed(_) => ErrorKind::PageFetchFailed,
            TranscriptError::CredentialExtractionFailed(_) => ErrorKind::CredentialExtractionFailed,
            TranscriptError::AgeRestricted(_) => ErrorKind::AgeRestricted,
            TranscriptError::VideoUnavailable(_) => ErrorKind::VideoUnavailable,
            TranscriptError::TranscriptsDisabled(_) => ErrorKind::TranscriptsDisabled,
            TranscriptError::NoMatchingTrack(_) => ErrorKind::NoMatchingTrack,
            TranscriptError::CaptionFetchFailed(_) => ErrorKind::CaptionFetchFailed,
            TranscriptError::CaptionParseFailed(_) => ErrorKind::CaptionParseFailed,
        }
    }

    /// Human-readable detail without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            TranscriptError::InvalidUrl(m)
            | TranscriptError::PageFetchFailed(m)
            | TranscriptError::CredentialExtractionFailed(m)
            | TranscriptError::AgeRestricted(m)
            | TranscriptError::VideoUnavailable(m)
            | TranscriptError::TranscriptsDisabled(m)
            | TranscriptError::NoMatchingTrack(m)
            | TranscriptError::CaptionFetchFailed(m)
            | TranscriptError::CaptionParseFailed(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_message() {
        let err = TranscriptError::AgeRestricted("Sign in to confirm your age".to_string());
        assert_eq!(err.kind(), ErrorKind::AgeRestricted);
        assert_eq!(err.message(), "Sign in to confirm your age");
        assert_eq!(
            err.to_string(),
            "Video is age restricted: Sign in to confirm your age"
        );
    }

    #[test]
    fn test_error_converts_into_anyhow() {
        fn fails() -> Result<()> {
            let step: std::result::Result<(), TranscriptError> =
                Err(TranscriptError::TranscriptsDisabled("no tracks".to_string()));
            step?;
            Ok(())
        }

        let err = fails().unwrap_err();
        let inner = err.downcast_ref::<TranscriptError>().unwrap();
        assert_eq!(inner.kind(), ErrorKind::TranscriptsDisabled);
    }
}
