//! Generative text provider boundary
//!
//! Everything that talks to the text-generation API goes through [`TextGenerator`].
//! Failures are classified into a [`ProviderErrorKind`] here, once, so callers
//! branch on the kind instead of inspecting messages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::GenAiConfig;
use crate::error::{GenerationError, Result};

pub mod content;
pub mod fallback;
pub mod prompts;

pub use content::{ContentGenerator, RetryPolicy};

/// Kind of failure reported by the text-generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Transient unavailability (HTTP 503). Worth retrying.
    Overloaded,
    /// Quota exhausted (HTTP 429). Retrying in the same window cannot help.
    QuotaExceeded,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(kind: ProviderErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Overloaded, Some(503), message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::QuotaExceeded, Some(429), message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, None, message)
    }

    /// Classify a provider reply by HTTP status, then by the provider's status string,
    /// then by message text
    pub fn classify(status: Option<u16>, provider_status: Option<&str>, message: &str) -> Self {
        let lowered = message.to_lowercase();
        let kind = match (status, provider_status) {
            (Some(503), _) => ProviderErrorKind::Overloaded,
            (Some(429), _) => ProviderErrorKind::QuotaExceeded,
            (_, Some("UNAVAILABLE")) => ProviderErrorKind::Overloaded,
            (_, Some("RESOURCE_EXHAUSTED")) => ProviderErrorKind::QuotaExceeded,
            _ if lowered.contains("overloaded") => ProviderErrorKind::Overloaded,
            _ if lowered.contains("quota") => ProviderErrorKind::QuotaExceeded,
            _ => ProviderErrorKind::Other,
        };
        Self::new(kind, status, message)
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}] {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// One text-completion call: prompt in, free text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderFailure>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &GenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Failed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build from config, reading the key from the configured environment variable
    pub fn from_config(config: &GenAiConfig) -> Result<Self> {
        Self::new(config.api_key()?, config)
    }

    /// Point the client at a different host (used by tests against a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ProviderFailure> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderFailure::other(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, provider_status) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.message, envelope.error.status),
                Err(_) => (body, None),
            };
            let message = if message.is_empty() {
                status.to_string()
            } else {
                message
            };
            return Err(ProviderFailure::classify(
                Some(status.as_u16()),
                provider_status.as_deref(),
                &message,
            ));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::other(format!("invalid response body: {}", e)))?;

        debug!(model = %self.model, "generateContent succeeded");

        parsed
            .text()
            .ok_or_else(|| ProviderFailure::other("No content generated"))
    }
}
