//! Language-model summaries of extracted transcripts.
//!
//! The model is an external collaborator: this module renders the prompt,
//! hands it to a [`SummaryProvider`] and validates whatever comes back.

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SummaryConfig;
use crate::youtube::TranscriptResult;

pub mod prompt;
pub mod providers;

pub use prompt::{parse_response, render_prompt, Summary, DEFAULT_PROMPT_TEMPLATE, TRANSCRIPT_SLOT};
pub use providers::{OllamaProvider, OpenAiProvider};

/// Errors from the summary collaborator
#[derive(thiserror::Error, Debug)]
pub enum SummaryError {
    #[error("No API key configured for {0}")]
    MissingApiKey(String),

    #[error("Summary request failed: {0}")]
    RequestFailed(String),

    #[error("Model returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Supported language model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ProviderKind {
    /// OpenAI or any OpenAI-compatible chat completions API
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
    /// Local Ollama server
    #[serde(rename = "ollama")]
    #[value(name = "ollama")]
    Ollama,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// Shape the model is asked to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free-form markdown, used as-is
    Markdown,
    /// JSON with `summary` and `keyPoints`, validated before use
    Structured,
}

/// A backend that turns a prompt into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Provider name for logs and messages
    fn name(&self) -> &'static str;

    /// Send one prompt and return the raw model output
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, SummaryError>;
}

/// Build the provider selected in the configuration
pub fn build_provider(config: &SummaryConfig) -> Result<Box<dyn SummaryProvider>, SummaryError> {
    let provider: Box<dyn SummaryProvider> = match config.provider {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(config)?),
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config)?),
    };

    tracing::debug!("Using {} provider with model {}", provider.name(), config.model);
    Ok(provider)
}

/// Render the prompt for a transcript, ask the provider and validate the answer
pub async fn summarize(
    provider: &dyn SummaryProvider,
    transcript: &TranscriptResult,
    config: &SummaryConfig,
    timestamps: bool,
) -> Result<Summary, SummaryError> {
    let prompt = render_prompt(&config.prompt_template, transcript, config.response_format, timestamps);

    tracing::info!(
        "Requesting summary from {} ({} prompt characters)",
        provider.name(),
        prompt.len()
    );

    let raw = provider.complete(&prompt, config.response_format).await?;
    parse_response(&raw, config.response_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{TrackKind, TranscriptLine};

    fn transcript() -> TranscriptResult {
        TranscriptResult {
            url: "https://youtu.be/abc12345678".to_string(),
            video_id: "abc12345678".to_string(),
            title: "Rust in 100 seconds".to_string(),
            author: "Fireship".to_string(),
            channel_url: String::new(),
            language_code: "en".to_string(),
            track_kind: TrackKind::Manual,
            lines: vec![TranscriptLine {
                text: "Rust is a memory-safe language".to_string(),
                offset_ms: 0,
                duration_ms: 2000,
            }],
        }
    }

    #[tokio::test]
    async fn test_summarize_markdown() {
        let mut provider = MockSummaryProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_complete()
            .withf(|prompt, format| {
                prompt.contains("Rust in 100 seconds")
                    && prompt.contains("Rust is a memory-safe language")
                    && *format == ResponseFormat::Markdown
            })
            .times(1)
            .returning(|_, _| Ok("  Rust is fast and safe.  ".to_string()));

        let summary = summarize(&provider, &transcript(), &SummaryConfig::default(), false)
            .await
            .unwrap();
        assert_eq!(summary.text, "Rust is fast and safe.");
        assert!(summary.key_points.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_structured_rejects_bad_shape() {
        let mut provider = MockSummaryProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_complete()
            .returning(|_, _| Ok(r#"{"keyPoints": ["no summary"]}"#.to_string()));

        let config = SummaryConfig {
            response_format: ResponseFormat::Structured,
            ..SummaryConfig::default()
        };

        let err = summarize(&provider, &transcript(), &config, false).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_summarize_propagates_provider_errors() {
        let mut provider = MockSummaryProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_complete()
            .returning(|_, _| Err(SummaryError::RequestFailed("HTTP 500".to_string())));

        let err = summarize(&provider, &transcript(), &SummaryConfig::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::RequestFailed(_)));
    }

    #[test]
    fn test_build_provider_requires_openai_key() {
        let config = SummaryConfig::default();
        let err = build_provider(&config).err().unwrap();
        assert!(matches!(err, SummaryError::MissingApiKey(_)));

        let config = SummaryConfig {
            api_key: Some("sk-test".to_string()),
            ..SummaryConfig::default()
        };
        assert_eq!(build_provider(&config).unwrap().name(), "openai");
    }

    #[test]
    fn test_build_ollama_provider_without_key() {
        let config = SummaryConfig {
            provider: ProviderKind::Ollama,
            ..SummaryConfig::default()
        };
        assert_eq!(build_provider(&config).unwrap().name(), "ollama");
    }
}
