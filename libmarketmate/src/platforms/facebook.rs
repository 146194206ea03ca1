//! Facebook page publishing over the Graph API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::http::ProviderHttp;
use super::{missing_permissions, CredentialCheck, PublishContent, Publisher};
use crate::config::GraphConfig;
use crate::credentials::AccessToken;
use crate::error::Result;
use crate::types::{Platform, PublishResult};

pub const REQUIRED_PERMISSIONS: [&str; 3] =
    ["pages_manage_posts", "pages_read_engagement", "pages_show_list"];

/// A page the token can manage, as listed by `/me/accounts`
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub access_token: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageListing {
    #[serde(default)]
    data: Vec<PageInfo>,
}

pub struct FacebookPublisher {
    http: ProviderHttp,
}

impl FacebookPublisher {
    pub fn new(http: ProviderHttp) -> Self {
        Self { http }
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        Ok(Self::new(ProviderHttp::new(
            &graph_base(config),
            config.timeout_secs,
        )?))
    }

    async fn check_permissions(&self, token: &AccessToken) -> std::result::Result<Vec<String>, String> {
        let reply = self
            .http
            .get("me/permissions", &[("access_token", token.expose())], None)
            .await
            .map_err(|e| e.to_string())?;

        if !reply.is_success() {
            return Err(reply.error_message("Failed to check permissions"));
        }
        Ok(missing_permissions(&reply.body, &REQUIRED_PERMISSIONS))
    }

    /// Find `page_id` among the pages the token manages
    pub async fn lookup_page(
        &self,
        token: &AccessToken,
        page_id: &str,
    ) -> std::result::Result<PageInfo, String> {
        let reply = self
            .http
            .get(
                "me/accounts",
                &[
                    ("fields", "id,name,access_token,category"),
                    ("access_token", token.expose()),
                ],
                None,
            )
            .await
            .map_err(|e| e.to_string())?;

        if !reply.is_success() {
            return Err(reply.error_message(&format!("API Error: {}", reply.status)));
        }

        let listing: PageListing = serde_json::from_value(reply.body)
            .map_err(|e| format!("Unexpected page listing: {}", e))?;

        if let Some(page) = listing.data.iter().find(|p| p.id == page_id) {
            return Ok(page.clone());
        }

        let available = if listing.data.is_empty() {
            "No pages available - the token may not have admin access to any Facebook page"
                .to_string()
        } else {
            listing
                .data
                .iter()
                .map(|p| format!("{} ({})", p.name, p.id))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Err(format!(
            "Page ID {} not found in your accessible pages. Available pages: {}. Make sure you have admin access to the page and the correct permissions.",
            page_id, available
        ))
    }
}

pub(crate) fn graph_base(config: &GraphConfig) -> String {
    format!(
        "{}/{}",
        config.base_url.trim_end_matches('/'),
        config.version.trim_matches('/')
    )
}

#[async_trait]
impl Publisher for FacebookPublisher {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn validate_credentials(&self, token: &AccessToken, page_id: &str) -> CredentialCheck {
        match self.check_permissions(token).await {
            Ok(missing) if !missing.is_empty() => return CredentialCheck::missing(missing),
            Ok(_) => {}
            Err(e) => return CredentialCheck::failed(e),
        }

        match self.lookup_page(token, page_id).await {
            Ok(page) => CredentialCheck::passed(Some(format!("{} ({})", page.name, page.id))),
            Err(e) => CredentialCheck::failed(e),
        }
    }

    async fn publish(
        &self,
        content: &PublishContent,
        token: &AccessToken,
        page_id: &str,
    ) -> PublishResult {
        let page = match self.lookup_page(token, page_id).await {
            Ok(page) => page,
            Err(e) => return PublishResult::failed(e),
        };

        // The page's own token is required to post as the page
        let page_token = page
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| token.expose());

        let (path, body) = match &content.image_url {
            Some(url) => (
                format!("{}/photos", page_id),
                json!({ "url": url, "caption": content.caption, "access_token": page_token }),
            ),
            None => (
                format!("{}/feed", page_id),
                json!({ "message": content.caption, "access_token": page_token }),
            ),
        };

        debug!(page_id, with_image = content.image_url.is_some(), "Publishing to Facebook");

        let reply = match self.http.post_json(&path, &body, None, &[]).await {
            Ok(reply) => reply,
            Err(e) => return PublishResult::failed(e.to_string()),
        };

        if !reply.is_success() {
            let error = reply.error_message("Failed to publish to Facebook");
            warn!(page_id, status = reply.status, "Facebook publish rejected: {}", error);
            return PublishResult::failed(error);
        }

        match reply.str_field("id").or_else(|| reply.str_field("post_id")) {
            Some(post_id) => {
                info!(page_id, post_id = %post_id, "Published to Facebook");
                PublishResult::published(post_id)
            }
            None => PublishResult::failed("Facebook did not return a post id"),
        }
    }
}
