use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;

use crate::config::YoutubeConfig;
use crate::Result;

/// Extra request headers as name/value pairs
pub type Headers = Vec<(String, String)>;

/// Minimal HTTP capability the transcript pipeline needs from its host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a URL and return the body text. Non-2xx responses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;

    /// POST a body with custom headers and return the body text. Non-2xx responses are errors.
    async fn post_text(&self, url: &str, headers: Headers, body: String) -> Result<String>;
}

/// reqwest-backed client with browser-like default headers
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(user_agent: &str, accept_language: &str) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(accept_language)?);

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &YoutubeConfig) -> Result<Self> {
        Self::new(&config.user_agent, &config.accept_language)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("GET {} returned HTTP {}", url, response.status());
        }

        Ok(response.text().await?)
    }

    async fn post_text(&self, url: &str, headers: Headers, body: String) -> Result<String> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).body(body);
        for (name, value) in &headers {
            request = request.header(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            anyhow::bail!("POST {} returned HTTP {}", url, response.status());
        }

        Ok(response.text().await?)
    }
}
