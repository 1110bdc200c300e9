use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ResponseFormat, SummaryError, SummaryProvider};
use crate::config::SummaryConfig;

const SYSTEM_PROMPT: &str = "You write accurate, well-structured summaries of video transcripts.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn conversation(prompt: &str) -> Vec<Self> {
        vec![
            Self { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
            Self { role: "user".to_string(), content: prompt.to_string() },
        ]
    }
}

fn http_client(timeout_secs: u64) -> Result<Client, SummaryError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SummaryError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

async fn send_json<T: Serialize>(request: reqwest::RequestBuilder, body: &T) -> Result<String, SummaryError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| SummaryError::RequestFailed(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SummaryError::RequestFailed(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(SummaryError::RequestFailed(format!("HTTP {}: {}", status, text)));
    }

    Ok(text)
}

// =============================================================================
// OpenAI-compatible chat completions
// =============================================================================

/// OpenAI, or any server speaking the chat completions API
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonObjectFormat>,
}

#[derive(Debug, Serialize)]
struct JsonObjectFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

impl OpenAiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(config: &SummaryConfig) -> Result<Self, SummaryError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SummaryError::MissingApiKey("openai".to_string()))?;

        Ok(Self {
            api_key,
            base_url: base_url(config, Self::DEFAULT_BASE_URL),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http_client(config.timeout_secs)?,
        })
    }

    fn build_request(&self, prompt: &str, format: ResponseFormat) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: ChatMessage::conversation(prompt),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: match format {
                ResponseFormat::Structured => Some(JsonObjectFormat { kind: "json_object" }),
                ResponseFormat::Markdown => None,
            },
        }
    }
}

fn parse_chat_completion(body: &str) -> Result<String, SummaryError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| SummaryError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| SummaryError::InvalidResponse("response has no choices".to_string()))
}

#[async_trait]
impl SummaryProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, SummaryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.client.post(&url).bearer_auth(&self.api_key);

        let body = send_json(request, &self.build_request(prompt, format)).await?;
        parse_chat_completion(&body)
    }
}

// =============================================================================
// Ollama
// =============================================================================

/// Local Ollama server
pub struct OllamaProvider {
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

impl OllamaProvider {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    pub fn new(config: &SummaryConfig) -> Result<Self, SummaryError> {
        Ok(Self {
            base_url: base_url(config, Self::DEFAULT_BASE_URL),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http_client(config.timeout_secs)?,
        })
    }

    fn build_request(&self, prompt: &str, format: ResponseFormat) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: ChatMessage::conversation(prompt),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
            format: match format {
                ResponseFormat::Structured => Some("json"),
                ResponseFormat::Markdown => None,
            },
        }
    }
}

fn parse_ollama_chat(body: &str) -> Result<String, SummaryError> {
    let response: OllamaChatResponse = serde_json::from_str(body)
        .map_err(|e| SummaryError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(response.message.content)
}

#[async_trait]
impl SummaryProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, SummaryError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = self.client.post(&url);

        let body = send_json(request, &self.build_request(prompt, format)).await?;
        parse_ollama_chat(&body)
    }
}

fn base_url(config: &SummaryConfig, default: &str) -> String {
    config
        .base_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}
