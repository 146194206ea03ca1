//! Instagram business account publishing over the Graph API
//!
//! Publishing is two-phase: create a media container, then publish it by its
//! creation id. The post id comes from the publish step.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use super::facebook::graph_base;
use super::http::ProviderHttp;
use super::{missing_permissions, CredentialCheck, PublishContent, Publisher};
use crate::config::GraphConfig;
use crate::credentials::AccessToken;
use crate::error::Result;
use crate::types::{Platform, PublishResult};

pub const REQUIRED_PERMISSIONS: [&str; 3] =
    ["instagram_basic", "instagram_content_publish", "pages_show_list"];

pub struct InstagramPublisher {
    http: ProviderHttp,
}

impl InstagramPublisher {
    pub fn new(http: ProviderHttp) -> Self {
        Self { http }
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        Ok(Self::new(ProviderHttp::new(
            &graph_base(config),
            config.timeout_secs,
        )?))
    }

    async fn create_container(
        &self,
        caption: &str,
        image_url: &str,
        token: &AccessToken,
        ig_user_id: &str,
    ) -> std::result::Result<String, String> {
        let body = json!({
            "image_url": image_url,
            "caption": caption,
            "access_token": token.expose(),
        });
        let reply = self
            .http
            .post_json(&format!("{}/media", ig_user_id), &body, None, &[])
            .await
            .map_err(|e| e.to_string())?;

        if !reply.is_success() {
            return Err(reply.error_message("Failed to create Instagram media container"));
        }
        reply
            .str_field("id")
            .ok_or_else(|| "Instagram did not return a creation id".to_string())
    }
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn validate_credentials(&self, token: &AccessToken, ig_user_id: &str) -> CredentialCheck {
        let reply = match self
            .http
            .get("me/permissions", &[("access_token", token.expose())], None)
            .await
        {
            Ok(reply) => reply,
            Err(e) => return CredentialCheck::failed(e.to_string()),
        };
        if !reply.is_success() {
            return CredentialCheck::failed(reply.error_message("Failed to check permissions"));
        }

        let missing = missing_permissions(&reply.body, &REQUIRED_PERMISSIONS);
        if !missing.is_empty() {
            return CredentialCheck::missing(missing);
        }

        let reply = match self
            .http
            .get(
                ig_user_id,
                &[("fields", "id,username"), ("access_token", token.expose())],
                None,
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => return CredentialCheck::failed(e.to_string()),
        };
        if !reply.is_success() {
            return CredentialCheck::failed(
                reply.error_message("Failed to validate Instagram credentials"),
            );
        }

        CredentialCheck::passed(reply.str_field("username").map(|u| format!("@{}", u)))
    }

    async fn publish(
        &self,
        content: &PublishContent,
        token: &AccessToken,
        ig_user_id: &str,
    ) -> PublishResult {
        let Some(image_url) = content.image_url.as_deref() else {
            return PublishResult::failed("Instagram posts require an image");
        };

        debug!(ig_user_id, "Creating Instagram media container");
        let creation_id = match self
            .create_container(&content.caption, image_url, token, ig_user_id)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(ig_user_id, "Instagram container creation failed: {}", e);
                return PublishResult::failed(e);
            }
        };

        let body = json!({ "creation_id": creation_id, "access_token": token.expose() });
        let reply = match self
            .http
            .post_json(&format!("{}/media_publish", ig_user_id), &body, None, &[])
            .await
        {
            Ok(reply) => reply,
            Err(e) => return PublishResult::failed(e.to_string()),
        };

        if !reply.is_success() {
            let error = reply.error_message("Failed to publish Instagram media");
            warn!(ig_user_id, creation_id = %creation_id, "Instagram publish failed: {}", error);
            return PublishResult::failed(error);
        }

        match reply.str_field("id") {
            Some(post_id) => {
                info!(ig_user_id, post_id = %post_id, "Published to Instagram");
                PublishResult::published(post_id)
            }
            None => PublishResult::failed("Instagram did not return a post id"),
        }
    }
}
