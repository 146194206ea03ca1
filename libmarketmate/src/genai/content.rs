//! Content generation on top of a [`TextGenerator`], with the retry and fallback policy

use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::fallback::FallbackDescriptions;
use super::prompts;
use super::{ProviderErrorKind, ProviderFailure, TextGenerator};
use crate::config::GenAiConfig;
use crate::error::{GenerationError, Result};
use crate::types::{AdBrief, AdCopy, ContentCategory};

/// Exponential backoff: attempt `n` (1-based) waits `base_delay * 2^(n-1)` before attempt `n+1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GenAiConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(2u32.pow(exponent))
            .unwrap_or(Duration::MAX)
    }
}

/// Outcome of the shared retry loop
enum Attempted {
    Text(String),
    /// Overload signals on every attempt
    Exhausted(u32),
    Failed(ProviderFailure),
}

pub struct ContentGenerator {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    fallback: FallbackDescriptions,
}

impl ContentGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            policy: RetryPolicy::default(),
            fallback: FallbackDescriptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackDescriptions) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> &FallbackDescriptions {
        &self.fallback
    }

    async fn complete_with_retry(&self, prompt: &str, what: &str) -> Attempted {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.generator.complete(prompt).await {
                Ok(text) => {
                    debug!(attempt, what, "Generation succeeded");
                    return Attempted::Text(text);
                }
                Err(failure) if failure.kind == ProviderErrorKind::Overloaded => {
                    if attempt == max_attempts {
                        break;
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        what,
                        "Provider overloaded, retrying: {}",
                        failure
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Attempted::Failed(failure),
            }
        }

        Attempted::Exhausted(max_attempts)
    }

    /// Generate post copy. Empty prompts fail before any provider call.
    pub async fn generate_text(&self, prompt: &str, category: ContentCategory) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt.into());
        }

        let request = prompts::post_copy(prompt, category);
        match self.complete_with_retry(&request, "post copy").await {
            Attempted::Text(text) => {
                let cleaned = strip_formatting(&text);
                if cleaned.is_empty() {
                    return Err(GenerationError::EmptyResponse.into());
                }
                Ok(cleaned)
            }
            Attempted::Exhausted(attempts) => Err(GenerationError::Overloaded { attempts }.into()),
            Attempted::Failed(failure) => Err(match failure.kind {
                ProviderErrorKind::QuotaExceeded => GenerationError::QuotaExceeded,
                _ => GenerationError::Failed(failure.message),
            }
            .into()),
        }
    }

    /// Generate a description of the image to pair with a post
    ///
    /// Overload exhaustion and quota exhaustion fall back to the local table
    /// instead of failing.
    pub async fn generate_image_description(
        &self,
        prompt: &str,
        category: ContentCategory,
    ) -> Result<String> {
        let request = prompts::image_description(prompt, category);
        match self.complete_with_retry(&request, "image description").await {
            Attempted::Text(text) => {
                let description = text.trim().to_string();
                if description.is_empty() {
                    return Err(GenerationError::EmptyResponse.into());
                }
                Ok(description)
            }
            Attempted::Exhausted(attempts) => {
                info!(attempts, "Provider overloaded, using local image description");
                Ok(self.fallback.describe(prompt, category).to_string())
            }
            Attempted::Failed(failure) if failure.kind == ProviderErrorKind::QuotaExceeded => {
                info!("Provider quota exceeded, using local image description");
                Ok(self.fallback.describe(prompt, category).to_string())
            }
            Attempted::Failed(failure) => Err(GenerationError::Failed(failure.message).into()),
        }
    }

    /// Generate structured ad copy. Single attempt, no retry.
    pub async fn generate_ad_copy(&self, brief: &AdBrief) -> Result<AdCopy> {
        if brief.product.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt.into());
        }

        let reply = self
            .generator
            .complete(&prompts::ad_copy(brief))
            .await
            .map_err(|failure| match failure.kind {
                ProviderErrorKind::QuotaExceeded => GenerationError::QuotaExceeded,
                ProviderErrorKind::Overloaded => GenerationError::Overloaded { attempts: 1 },
                ProviderErrorKind::Other => GenerationError::Failed(failure.message),
            })?;

        Ok(parse_ad_copy(&reply)?)
    }
}

fn asterisks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*").expect("valid asterisk regex"))
}

fn repeated_hashes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#{2,}").expect("valid hash regex"))
}

fn json_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid json object regex"))
}

fn hashtag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("valid hashtag regex"))
}

/// Remove asterisks and collapse runs of `#` into one
pub fn strip_formatting(text: &str) -> String {
    let without_stars = asterisks().replace_all(text, "");
    repeated_hashes()
        .replace_all(&without_stars, "#")
        .trim()
        .to_string()
}

/// Hashtags appearing in generated copy, in order, without duplicates
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for m in hashtag().find_iter(text) {
        let tag = m.as_str().to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Pull the first `{...}` span out of a model reply and read it as ad copy
pub fn parse_ad_copy(reply: &str) -> std::result::Result<AdCopy, GenerationError> {
    let span = json_object()
        .find(reply)
        .ok_or_else(|| GenerationError::InvalidResponse("no JSON object in reply".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(span.as_str())
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    let caption = value
        .get("caption")
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty());
    let lists = ["hashtags", "keywords", "targetingTips"];
    let missing = lists
        .iter()
        .find(|field| value.get(**field).map_or(true, |v| v.is_null()));

    match (caption, missing) {
        (Some(caption), None) => Ok(AdCopy {
            caption: caption.to_string(),
            hashtags: string_list(&value["hashtags"]),
            keywords: string_list(&value["keywords"]),
            targeting_tips: string_list(&value["targetingTips"]),
        }),
        (None, _) => Err(GenerationError::InvalidResponse(
            "incomplete ad data: missing caption".to_string(),
        )),
        (_, Some(field)) => Err(GenerationError::InvalidResponse(format!(
            "incomplete ad data: missing {}",
            field
        ))),
    }
}
