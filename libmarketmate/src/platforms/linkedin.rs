//! LinkedIn member shares over the UGC posts API (text only)

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::http::ProviderHttp;
use super::{CredentialCheck, PublishContent, Publisher};
use crate::config::LinkedInConfig;
use crate::credentials::AccessToken;
use crate::error::Result;
use crate::types::{Platform, PublishResult};

const RESTLI_VERSION: (&str, &str) = ("X-Restli-Protocol-Version", "2.0.0");

pub struct LinkedInPublisher {
    http: ProviderHttp,
}

/// Member URN for a stored LinkedIn user id
pub fn author_urn(member_id: &str) -> String {
    format!("urn:li:person:{}", member_id)
}

/// Body of a public, text-only share
pub fn share_body(member_id: &str, text: &str) -> Value {
    json!({
        "author": author_urn(member_id),
        "lifecycleState": "PUBLISHED",
        "specificContent": {
            "com.linkedin.ugc.ShareContent": {
                "shareCommentary": { "text": text },
                "shareMediaCategory": "NONE"
            }
        },
        "visibility": {
            "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
        }
    })
}

impl LinkedInPublisher {
    pub fn new(http: ProviderHttp) -> Self {
        Self { http }
    }

    pub fn from_config(config: &LinkedInConfig) -> Result<Self> {
        Ok(Self::new(ProviderHttp::new(
            &config.base_url,
            config.timeout_secs,
        )?))
    }
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn validate_credentials(&self, token: &AccessToken, member_id: &str) -> CredentialCheck {
        let path = format!("v2/people/(id:{})", member_id);
        match self.http.get(&path, &[], Some(token.expose())).await {
            Ok(reply) if reply.is_success() => {
                CredentialCheck::passed(Some(reply.str_field("id").unwrap_or_else(|| member_id.to_string())))
            }
            Ok(reply) => CredentialCheck::failed(
                reply.error_message("Failed to validate LinkedIn credentials"),
            ),
            Err(e) => CredentialCheck::failed(e.to_string()),
        }
    }

    async fn publish(
        &self,
        content: &PublishContent,
        token: &AccessToken,
        member_id: &str,
    ) -> PublishResult {
        if content.image_url.is_some() {
            debug!("LinkedIn shares are text only, image dropped");
        }

        let body = share_body(member_id, &content.caption);
        let reply = match self
            .http
            .post_json("v2/ugcPosts", &body, Some(token.expose()), &[RESTLI_VERSION])
            .await
        {
            Ok(reply) => reply,
            Err(e) => return PublishResult::failed(e.to_string()),
        };

        if !reply.is_success() {
            let error = reply.error_message("Failed to publish to LinkedIn");
            warn!(status = reply.status, "LinkedIn publish rejected: {}", error);
            return PublishResult::failed(error);
        }

        let post_id = reply
            .str_field("id")
            .or_else(|| reply.header("x-restli-id"))
            .unwrap_or_else(|| "unknown".to_string());
        info!(post_id = %post_id, "Published to LinkedIn");
        PublishResult::published(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_body_shape() {
        let body = share_body("abc123", "Hello");
        assert_eq!(body["author"], "urn:li:person:abc123");
        assert_eq!(
            body["specificContent"]["com.linkedin.ugc.ShareContent"]["shareCommentary"]["text"],
            "Hello"
        );
        assert_eq!(
            body["specificContent"]["com.linkedin.ugc.ShareContent"]["shareMediaCategory"],
            "NONE"
        );
        assert_eq!(
            body["visibility"]["com.linkedin.ugc.MemberNetworkVisibility"],
            "PUBLIC"
        );
    }
}
