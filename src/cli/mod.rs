use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::summarize::{ProviderKind, ResponseFormat};
use crate::youtube::ThumbnailQuality;

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "YT Summarizer - Extract YouTube transcripts and turn them into summarized notes",
    version,
    long_about = "A CLI tool that pulls the caption track of a YouTube video straight from YouTube, then asks a language model (OpenAI-compatible or Ollama) to summarize it into a markdown note."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to the config file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript of a YouTube video
    Transcript {
        /// YouTube video URL (watch, youtu.be, shorts, embed or live)
        #[arg(value_name = "URL")]
        url: String,

        /// Preferred caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include timestamps in text and markdown output
        #[arg(long)]
        timestamps: bool,
    },

    /// Summarize a YouTube video and write the result into a note
    Summarize {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Preferred caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Document to insert the note into (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Language model backend
        #[arg(long, value_enum)]
        provider: Option<ProviderKind>,

        /// Model name
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// API key for hosted providers
        #[arg(long, env = "YTSUM_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Answer shape requested from the model
        #[arg(long, value_enum)]
        response_format: Option<ResponseFormat>,

        /// Append the full transcript to the note
        #[arg(long)]
        with_transcript: bool,
    },

    /// Print the thumbnail URL of a video
    Thumbnail {
        /// Video URL or bare 11-character video id
        #[arg(value_name = "URL_OR_ID")]
        video: String,

        /// Thumbnail size
        #[arg(short = 'Q', long, value_enum, default_value = "maxres")]
        quality: ThumbnailQuality,
    },

    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config path
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// Markdown with timestamp links
    Markdown,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
