//! Provider publishers
//!
//! Each provider validates a token against the provider, then publishes content to
//! it. Provider failures never escape as errors: they come back as a failed
//! [`PublishResult`] or a failed [`CredentialCheck`], with the best message the
//! provider gave.
//!
//! # Examples
//!
//! ```no_run
//! use libmarketmate::config::Config;
//! use libmarketmate::credentials::AccessToken;
//! use libmarketmate::platforms::{Publishers, PublishContent};
//! use libmarketmate::types::Platform;
//!
//! # async fn example() -> libmarketmate::Result<()> {
//! let publishers = Publishers::from_config(&Config::default_config())?;
//! let linkedin = publishers.get(Platform::LinkedIn)?;
//!
//! let token = AccessToken::new("token");
//! let check = linkedin.validate_credentials(&token, "abc123").await;
//! if check.ok {
//!     let content = PublishContent::text("Hello, network!");
//!     let result = linkedin.publish(&content, &token, "abc123").await;
//!     println!("{:?}", result);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::credentials::AccessToken;
use crate::error::{MarketMateError, Result};
use crate::types::{Platform, PublishResult};

pub mod facebook;
pub mod http;
pub mod instagram;
pub mod linkedin;

// Available outside tests so integration tests and dry runs can use it
pub mod mock;

pub use facebook::FacebookPublisher;
pub use instagram::InstagramPublisher;
pub use linkedin::LinkedInPublisher;

/// What gets published: copy plus an optional image URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishContent {
    pub caption: String,
    pub image_url: Option<String>,
}

impl PublishContent {
    pub fn new(caption: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            caption: caption.into(),
            image_url: image_url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn text(caption: impl Into<String>) -> Self {
        Self::new(caption, None)
    }
}

/// Result of checking a token against a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialCheck {
    pub ok: bool,
    /// Required permissions the token was not granted
    pub missing_permissions: Vec<String>,
    pub error: Option<String>,
    /// Human-readable account the token acts on (page name, username, member id)
    pub account: Option<String>,
}

impl CredentialCheck {
    pub fn passed(account: Option<String>) -> Self {
        Self {
            ok: true,
            account,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn missing(missing_permissions: Vec<String>) -> Self {
        let error = format!(
            "Missing required permissions: {}. Please re-authorize the app with these permissions.",
            missing_permissions.join(", ")
        );
        Self {
            ok: false,
            missing_permissions,
            error: Some(error),
            account: None,
        }
    }
}

/// Required permissions absent from a Graph `/me/permissions` listing
pub(crate) fn missing_permissions(granted: &serde_json::Value, required: &[&str]) -> Vec<String> {
    let granted: Vec<&str> = granted
        .get("data")
        .and_then(|d| d.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e.get("status").and_then(|s| s.as_str()) == Some("granted"))
                .filter_map(|e| e.get("permission").and_then(|p| p.as_str()))
                .collect()
        })
        .unwrap_or_default();

    required
        .iter()
        .filter(|perm| !granted.contains(perm))
        .map(|perm| perm.to_string())
        .collect()
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> Platform;

    fn name(&self) -> &str {
        self.platform().as_str()
    }

    /// Check the token and target id against the provider
    async fn validate_credentials(&self, token: &AccessToken, target_id: &str) -> CredentialCheck;

    /// Publish content on behalf of `target_id`
    async fn publish(
        &self,
        content: &PublishContent,
        token: &AccessToken,
        target_id: &str,
    ) -> PublishResult;
}

/// The publisher used for each platform
#[derive(Clone, Default)]
pub struct Publishers {
    publishers: HashMap<Platform, Arc<dyn Publisher>>,
}

impl Publishers {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP publishers for every platform, using the configured endpoints
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new()
            .with(Arc::new(FacebookPublisher::from_config(&config.graph)?))
            .with(Arc::new(InstagramPublisher::from_config(&config.graph)?))
            .with(Arc::new(LinkedInPublisher::from_config(&config.linkedin)?)))
    }

    pub fn with(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.insert(publisher.platform(), publisher);
        self
    }

    pub fn get(&self, platform: Platform) -> Result<Arc<dyn Publisher>> {
        self.publishers.get(&platform).cloned().ok_or_else(|| {
            MarketMateError::Precondition(format!("no publisher registered for {}", platform))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_permissions_ignores_declined() {
        let listing = json!({"data": [
            {"permission": "pages_show_list", "status": "granted"},
            {"permission": "pages_manage_posts", "status": "declined"},
        ]});
        let missing = missing_permissions(
            &listing,
            &["pages_manage_posts", "pages_read_engagement", "pages_show_list"],
        );
        assert_eq!(missing, vec!["pages_manage_posts", "pages_read_engagement"]);
    }

    #[test]
    fn test_missing_permissions_on_bad_listing() {
        let missing = missing_permissions(&json!({}), &["instagram_basic"]);
        assert_eq!(missing, vec!["instagram_basic"]);
    }

    #[test]
    fn test_publish_content_drops_blank_image() {
        let content = PublishContent::new("hi", Some("  ".to_string()));
        assert!(content.image_url.is_none());
    }

    #[test]
    fn test_credential_check_missing_message() {
        let check = CredentialCheck::missing(vec!["instagram_basic".to_string()]);
        assert!(!check.ok);
        assert!(check.error.unwrap().contains("instagram_basic"));
    }

    #[test]
    fn test_registry_lookup() {
        use crate::platforms::mock::MockPublisher;

        let publishers = Publishers::new().with(Arc::new(MockPublisher::success(Platform::LinkedIn)));
        assert!(publishers.get(Platform::LinkedIn).is_ok());
        assert!(publishers.get(Platform::Facebook).err().unwrap().is_precondition());
    }
}
