use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::summarize::{ProviderKind, ResponseFormat, DEFAULT_PROMPT_TEMPLATE, TRANSCRIPT_SLOT};
use crate::youtube::{ClientContext, ThumbnailQuality, DEFAULT_LANGUAGE};

const LOCAL_CONFIG_FILE: &str = "ytsum.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript extraction settings
    pub youtube: YoutubeConfig,

    /// Language model settings
    pub summary: SummaryConfig,

    /// Note rendering settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Preferred caption language
    pub language: String,

    /// Client name sent to the player endpoint
    pub client_name: String,

    /// Client version sent to the player endpoint
    pub client_version: String,

    pub user_agent: String,

    pub accept_language: String,

    /// Thumbnail size embedded in notes
    pub thumbnail_quality: ThumbnailQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Which backend answers the prompt
    pub provider: ProviderKind,

    pub model: String,

    /// API base URL; the provider default is used when empty
    pub base_url: Option<String>,

    /// API key for hosted providers
    pub api_key: Option<String>,

    /// Prompt with `{{title}}`, `{{author}}`, `{{url}}`, `{{language}}` and `{{transcript}}` slots
    pub prompt_template: String,

    /// Free-form markdown or validated JSON
    pub response_format: ResponseFormat,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Request timeout for the language model call
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append the full transcript below the summary
    pub include_transcript: bool,

    /// Prefix transcript lines with their start time
    pub timestamps: bool,

    /// Embed the video thumbnail at the top of the note
    pub include_thumbnail: bool,

    /// Line in the target document that gets replaced by the note
    pub insert_marker: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        let client = ClientContext::default();
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            client_name: client.name,
            client_version: client.version,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            thumbnail_quality: ThumbnailQuality::Maxres,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4.1-mini".to_string(),
            base_url: None,
            api_key: None,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            response_format: ResponseFormat::Markdown,
            temperature: 0.3,
            max_tokens: 1500,
            timeout_secs: 120,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_transcript: false,
            timestamps: true,
            include_thumbnail: true,
            insert_marker: "<!-- ytsum -->".to_string(),
        }
    }
}

impl YoutubeConfig {
    pub fn client_context(&self) -> ClientContext {
        ClientContext {
            name: self.client_name.clone(),
            version: self.client_version.clone(),
            hl: self.language.clone(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the default location.
    ///
    /// Missing keys fall back to their defaults. When no file exists at the
    /// default location the defaults are used as-is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            Self::load_from(&config_path)
        } else if path.is_some() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        } else {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to an empty mapping
        let config: Config = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse config file")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-summarizer").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.youtube.language.trim().is_empty() {
            anyhow::bail!("youtube.language must not be empty");
        }

        if !(0.0..=2.0).contains(&self.summary.temperature) {
            anyhow::bail!(
                "summary.temperature must be between 0.0 and 2.0, got {}",
                self.summary.temperature
            );
        }

        if self.summary.prompt_template.trim().is_empty() {
            anyhow::bail!("summary.prompt_template must not be empty");
        }

        if !self.summary.prompt_template.contains(TRANSCRIPT_SLOT) {
            anyhow::bail!("summary.prompt_template must contain {}", TRANSCRIPT_SLOT);
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Language: {}", self.youtube.language);
        println!(
            "  Player Client: {} {}",
            self.youtube.client_name, self.youtube.client_version
        );
        println!("  Thumbnail Quality: {:?}", self.youtube.thumbnail_quality);
        println!("  Provider: {}", self.summary.provider);
        println!("  Model: {}", self.summary.model);
        if let Some(base_url) = &self.summary.base_url {
            println!("  Base URL: {}", base_url);
        }
        println!(
            "  API Key: {}",
            if self.summary.api_key.is_some() { "set" } else { "not set" }
        );
        println!("  Response Format: {:?}", self.summary.response_format);
        println!("  Include Transcript: {}", self.output.include_transcript);
        println!("  Timestamps: {}", self.output.timestamps);
        println!("  Insert Marker: {}", self.output.insert_marker);
    }
}
