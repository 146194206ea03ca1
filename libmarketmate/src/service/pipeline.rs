//! Generate, resolve an image, publish, and optionally advertise
//!
//! One run per publish request, strictly sequential:
//! `Idle → Generating → ImageResolving → Publishing → [AdCreating] → Done | Failed`.
//!
//! Generation errors and missing credentials are hard failures returned as `Err`,
//! wrapped with the stage they happened in. A provider rejecting the post is not: the
//! run ends in `Failed` but still returns an outcome carrying the normalized
//! [`PublishResult`]. Ad problems after a successful publish are warnings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{Event, EventBus};
use crate::ads::{AdCredentials, AdOrchestrator, AdRequest};
use crate::credentials::CredentialStore;
use crate::db::Database;
use crate::error::{CredentialError, MarketMateError, Result};
use crate::genai::content::extract_hashtags;
use crate::genai::ContentGenerator;
use crate::imagery::ImageResolver;
use crate::platforms::{CredentialCheck, PublishContent, Publishers};
use crate::types::{
    AdResult, ContentCategory, ContentPost, ContentStatus, GeneratedContent, Platform,
    ProviderType, PublishResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Generating,
    ImageResolving,
    Publishing,
    AdCreating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Generating => "generating",
            PipelineStage::ImageResolving => "image_resolving",
            PipelineStage::Publishing => "publishing",
            PipelineStage::AdCreating => "ad_creating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One publish request
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub user_id: String,
    pub platform: Platform,
    pub prompt: String,
    pub category: ContentCategory,
    /// Create a Facebook ad around the post once it is published
    pub create_ad: bool,
}

impl PublishRequest {
    pub fn new(user_id: impl Into<String>, platform: Platform, prompt: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            platform,
            prompt: prompt.into(),
            category: ContentCategory::General,
            create_ad: false,
        }
    }

    pub fn category(mut self, category: ContentCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_ad(mut self) -> Self {
        self.create_ad = true;
        self
    }
}

/// What a run produced. `stage` is `Done` or `Failed`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    /// Id of the persisted history entry
    pub history_id: String,
    pub stage: PipelineStage,
    pub content: GeneratedContent,
    pub publish: PublishResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad: Option<AdResult>,
    pub warnings: Vec<String>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.stage == PipelineStage::Done && self.publish.success
    }
}

/// Message for a failed credential check
fn check_failure(check: &CredentialCheck) -> String {
    check
        .error
        .clone()
        .unwrap_or_else(|| "Credential validation failed".to_string())
}

pub struct PublishPipeline {
    generator: ContentGenerator,
    resolver: Arc<ImageResolver>,
    publishers: Publishers,
    ads: Option<Arc<AdOrchestrator>>,
    store: Arc<dyn CredentialStore>,
    db: Arc<Database>,
    events: EventBus,
}

impl PublishPipeline {
    pub fn new(
        generator: ContentGenerator,
        resolver: Arc<ImageResolver>,
        publishers: Publishers,
        store: Arc<dyn CredentialStore>,
        db: Arc<Database>,
    ) -> Self {
        Self {
            generator,
            resolver,
            publishers,
            ads: None,
            store,
            db,
            events: EventBus::default(),
        }
    }

    pub fn with_ads(mut self, orchestrator: Arc<AdOrchestrator>) -> Self {
        self.ads = Some(orchestrator);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn generator(&self) -> &ContentGenerator {
        &self.generator
    }

    fn enter(&self, run_id: &str, platform: Platform, stage: PipelineStage) {
        debug!(run_id, platform = %platform, stage = %stage, "Pipeline stage");
        self.events.emit(Event::StageEntered {
            run_id: run_id.to_string(),
            platform: platform.to_string(),
            stage,
        });
    }

    fn warn(&self, run_id: &str, warnings: &mut Vec<String>, message: String) {
        warn!(run_id, "{}", message);
        self.events.emit(Event::Warning {
            run_id: run_id.to_string(),
            message: message.clone(),
        });
        warnings.push(message);
    }

    fn fail(&self, run_id: &str, stage: PipelineStage, error: MarketMateError) -> MarketMateError {
        warn!(run_id, stage = %stage, "Pipeline failed: {}", error);
        self.events.emit(Event::Failed {
            run_id: run_id.to_string(),
            stage,
            error: error.to_string(),
        });
        error.at_stage(stage.as_str())
    }

    /// Copy, hashtags, image description and image URL for a prompt, without publishing
    pub async fn generate(
        &self,
        prompt: &str,
        category: ContentCategory,
    ) -> Result<(GeneratedContent, Vec<String>)> {
        let mut warnings = Vec::new();
        let mut content = self
            .generate_content("standalone", prompt, category, Some(&mut warnings))
            .await?;
        content.image_url = self.resolver.resolve_image_url(&content.image_description);
        Ok((content, warnings))
    }

    /// Copy and image description. With `warnings`, a failed image description
    /// degrades to the local table; without, it aborts the caller.
    async fn generate_content(
        &self,
        run_id: &str,
        prompt: &str,
        category: ContentCategory,
        warnings: Option<&mut Vec<String>>,
    ) -> Result<GeneratedContent> {
        let caption = self.generator.generate_text(prompt, category).await?;
        let hashtags = extract_hashtags(&caption);

        let described = self
            .generator
            .generate_image_description(prompt, category)
            .await;
        let image_description = match (described, warnings) {
            (Ok(description), _) => description,
            (Err(e), Some(warnings)) => {
                self.warn(
                    run_id,
                    warnings,
                    format!("Image description unavailable, using local description: {}", e),
                );
                self.generator.fallback().describe(prompt, category).to_string()
            }
            (Err(e), None) => return Err(e),
        };

        Ok(GeneratedContent {
            caption,
            image_description,
            hashtags,
            ..Default::default()
        })
    }

    /// Run one request through every stage
    pub async fn run(&self, request: &PublishRequest) -> Result<PipelineOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let platform = request.platform;
        let mut warnings = Vec::new();

        info!(
            run_id = %run_id,
            user_id = %request.user_id,
            platform = %platform,
            category = %request.category,
            "Starting publish pipeline"
        );

        self.enter(&run_id, platform, PipelineStage::Generating);
        let mut content = self
            .generate_content(&run_id, &request.prompt, request.category, None)
            .await
            .map_err(|e| self.fail(&run_id, PipelineStage::Generating, e))?;

        self.enter(&run_id, platform, PipelineStage::ImageResolving);
        content.image_url = self.resolver.resolve_image_url(&content.image_description);
        debug!(run_id = %run_id, image_url = %content.image_url, "Resolved image");

        self.enter(&run_id, platform, PipelineStage::Publishing);
        let post = ContentPost::new(
            &request.user_id,
            platform,
            &request.prompt,
            request.category,
            &content,
        );
        self.db
            .save_content_post(&post)
            .await
            .map_err(|e| self.fail(&run_id, PipelineStage::Publishing, e))?;

        let credential = match self
            .store
            .require(&request.user_id, platform.provider_type())
            .await
        {
            Ok(credential) => credential,
            Err(e) => {
                self.record(&post.id, ContentStatus::Failed, None, Some(&e.to_string()), &run_id, &mut warnings)
                    .await;
                return Err(self.fail(&run_id, PipelineStage::Publishing, e));
            }
        };

        let publisher = self
            .publishers
            .get(platform)
            .map_err(|e| self.fail(&run_id, PipelineStage::Publishing, e))?;

        let check = publisher
            .validate_credentials(credential.access_token(), credential.target_id())
            .await;
        let publish = if check.ok {
            let payload = PublishContent::new(content.caption.clone(), Some(content.image_url.clone()));
            publisher
                .publish(&payload, credential.access_token(), credential.target_id())
                .await
        } else {
            PublishResult::failed(check_failure(&check))
        };

        if !publish.success {
            let error = publish
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            self.record(&post.id, ContentStatus::Failed, None, Some(&error), &run_id, &mut warnings)
                .await;
            warn!(run_id = %run_id, platform = %platform, "Publish rejected: {}", error);
            self.events.emit(Event::Failed {
                run_id: run_id.clone(),
                stage: PipelineStage::Publishing,
                error,
            });
            return Ok(PipelineOutcome {
                run_id,
                history_id: post.id,
                stage: PipelineStage::Failed,
                content,
                publish,
                ad: None,
                warnings,
            });
        }

        info!(
            run_id = %run_id,
            platform = %platform,
            post_id = publish.post_id.as_deref().unwrap_or(""),
            "Published"
        );
        self.record(
            &post.id,
            ContentStatus::Published,
            publish.post_id.as_deref(),
            None,
            &run_id,
            &mut warnings,
        )
        .await;

        let ad = match (&publish.post_id, platform, request.create_ad) {
            (Some(post_id), Platform::Facebook, true) => {
                self.create_ad(&run_id, request, post_id, &content, &mut warnings)
                    .await
            }
            _ => None,
        };

        self.enter(&run_id, platform, PipelineStage::Done);
        self.events.emit(Event::Completed {
            run_id: run_id.clone(),
            platform: platform.to_string(),
            success: true,
            post_id: publish.post_id.clone(),
        });

        Ok(PipelineOutcome {
            run_id,
            history_id: post.id,
            stage: PipelineStage::Done,
            content,
            publish,
            ad,
            warnings,
        })
    }

    async fn create_ad(
        &self,
        run_id: &str,
        request: &PublishRequest,
        post_id: &str,
        content: &GeneratedContent,
        warnings: &mut Vec<String>,
    ) -> Option<AdResult> {
        let Some(orchestrator) = &self.ads else {
            self.warn(run_id, warnings, "Ad creation is not configured".to_string());
            return None;
        };

        let credentials = match AdCredentials::load(self.store.as_ref(), &request.user_id).await {
            Ok(credentials) => credentials,
            Err(MarketMateError::Credential(CredentialError::NotFound { provider, .. }))
                if provider == ProviderType::FacebookAds.as_str() =>
            {
                info!(run_id, "No Facebook Ads credentials, skipping ad creation");
                return None;
            }
            Err(e) => {
                self.warn(run_id, warnings, format!("Ad creation skipped: {}", e));
                return None;
            }
        };

        self.enter(run_id, request.platform, PipelineStage::AdCreating);
        let ad_request = AdRequest {
            image_url: Some(content.image_url.clone()),
            caption: Some(content.caption.clone()),
            ..AdRequest::for_post(post_id)
        };
        let result = orchestrator.create_ad_for_post(&ad_request, &credentials).await;
        if !result.success {
            self.warn(
                run_id,
                warnings,
                format!(
                    "Ad creation failed: {}",
                    result.error.as_deref().unwrap_or("Unknown error")
                ),
            );
        }
        Some(result)
    }

    /// Update the history entry. A failure here is reported, never fatal.
    async fn record(
        &self,
        history_id: &str,
        status: ContentStatus,
        provider_post_id: Option<&str>,
        error: Option<&str>,
        run_id: &str,
        warnings: &mut Vec<String>,
    ) {
        if let Err(e) = self
            .db
            .update_content_status(history_id, status, provider_post_id, error)
            .await
        {
            self.warn(run_id, warnings, format!("Failed to update history: {}", e));
        }
    }
}
