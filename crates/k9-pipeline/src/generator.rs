//! External text generator
//!
//! Only the LLM leaf talks to a generator. One blocking request per call,
//! no retries; failures come back as [`GeneratorError`] and the caller
//! degrades.

use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Produces free text for a prompt
#[cfg_attr(test, mockall::automock)]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion
    ///
    /// # Errors
    /// Any transport, status or empty-response failure.
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

/// Largest error body kept in [`GeneratorError::Status`]
const BODY_EXCERPT: usize = 200;

/// Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    http: Client,
    url: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpGenerator {
    /// Create client with an explicit key
    ///
    /// # Errors
    /// Returns [`GeneratorError::Disabled`] when the config disables the
    /// generator, or [`GeneratorError::Http`] if the client cannot be built.
    pub fn new(config: &GeneratorConfig, api_key: impl Into<String>) -> Result<Self, GeneratorError> {
        if !config.enabled {
            return Err(GeneratorError::Disabled);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: format!(
                "{}/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model.trim_start_matches('/')
            ),
            api_key: api_key.into(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Create client with the key from the configured environment variable
    ///
    /// # Errors
    /// Returns [`GeneratorError::MissingApiKey`] if the variable is unset or
    /// empty, otherwise as [`Self::new`].
    pub fn from_env(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        if !config.enabled {
            return Err(GeneratorError::Disabled);
        }
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GeneratorError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, key)
    }

    /// Request URL
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TextGenerator for HttpGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    GeneratorError::Timeout(self.timeout_secs)
                } else {
                    GeneratorError::Http(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body: text.chars().take(BODY_EXCERPT).collect(),
            });
        }

        let parsed: GenerateResponse = response.json()?;
        parsed.text().ok_or(GeneratorError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
