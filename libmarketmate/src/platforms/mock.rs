//! Mock publisher for testing
//!
//! Configurable to pass or fail validation and publishing, and records every call so
//! tests can assert that a provider was (or was not) contacted.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use super::{CredentialCheck, PublishContent, Publisher};
use crate::credentials::AccessToken;
use crate::types::{Platform, PublishResult};

/// Configuration for mock publisher behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub platform: Platform,

    /// Permissions reported as missing by `validate_credentials`
    pub missing_permissions: Vec<String>,

    /// Error reported by `validate_credentials`
    pub validation_error: Option<String>,

    /// Error reported by `publish`; `None` means publishing succeeds
    pub publish_error: Option<String>,

    /// Post id returned on success; a generated id when `None`
    pub post_id: Option<String>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    pub validate_call_count: Arc<Mutex<usize>>,
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Content that has been published, with the target id it went to
    pub published: Arc<Mutex<Vec<(String, PublishContent)>>>,
}

impl MockConfig {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            missing_permissions: Vec::new(),
            validation_error: None,
            publish_error: None,
            post_id: None,
            delay: Duration::from_millis(0),
            validate_call_count: Arc::new(Mutex::new(0)),
            publish_call_count: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MockPublisher {
    config: MockConfig,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A publisher that validates and publishes successfully
    pub fn success(platform: Platform) -> Self {
        Self::new(MockConfig::new(platform))
    }

    /// A publisher that returns a fixed post id
    pub fn with_post_id(platform: Platform, post_id: &str) -> Self {
        Self::new(MockConfig {
            post_id: Some(post_id.to_string()),
            ..MockConfig::new(platform)
        })
    }

    /// A publisher whose provider rejects every post
    pub fn publish_failure(platform: Platform, error: &str) -> Self {
        Self::new(MockConfig {
            publish_error: Some(error.to_string()),
            ..MockConfig::new(platform)
        })
    }

    /// A publisher whose token lacks the given permissions
    pub fn missing_permissions(platform: Platform, missing: &[&str]) -> Self {
        Self::new(MockConfig {
            missing_permissions: missing.iter().map(|p| p.to_string()).collect(),
            ..MockConfig::new(platform)
        })
    }

    pub fn with_delay(platform: Platform, delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..MockConfig::new(platform)
        })
    }

    pub fn validate_call_count(&self) -> usize {
        *lock(&self.config.validate_call_count)
    }

    pub fn publish_call_count(&self) -> usize {
        *lock(&self.config.publish_call_count)
    }

    pub fn published(&self) -> Vec<(String, PublishContent)> {
        lock(&self.config.published).clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn platform(&self) -> Platform {
        self.config.platform
    }

    async fn validate_credentials(&self, _token: &AccessToken, target_id: &str) -> CredentialCheck {
        *lock(&self.config.validate_call_count) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if let Some(error) = &self.config.validation_error {
            return CredentialCheck::failed(error.clone());
        }
        if !self.config.missing_permissions.is_empty() {
            return CredentialCheck::missing(self.config.missing_permissions.clone());
        }
        CredentialCheck::passed(Some(target_id.to_string()))
    }

    async fn publish(
        &self,
        content: &PublishContent,
        _token: &AccessToken,
        target_id: &str,
    ) -> PublishResult {
        *lock(&self.config.publish_call_count) += 1;

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if let Some(error) = &self.config.publish_error {
            return PublishResult::failed(error.clone());
        }

        lock(&self.config.published).push((target_id.to_string(), content.clone()));

        let post_id = self.config.post_id.clone().unwrap_or_else(|| {
            format!("{}:mock-{}", self.config.platform, uuid::Uuid::new_v4())
        });
        PublishResult::published(post_id)
    }
}
