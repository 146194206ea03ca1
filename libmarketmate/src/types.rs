//! Core types for MarketMate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of stored credential record. `FacebookAds` is not a publish target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Facebook,
    FacebookAds,
    Instagram,
    #[serde(rename = "linkedin")]
    LinkedIn,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::Facebook,
        ProviderType::FacebookAds,
        ProviderType::Instagram,
        ProviderType::LinkedIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Facebook => "facebook",
            ProviderType::FacebookAds => "facebook_ads",
            ProviderType::Instagram => "instagram",
            ProviderType::LinkedIn => "linkedin",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = crate::error::CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" => Ok(ProviderType::Facebook),
            "facebook_ads" | "facebook-ads" => Ok(ProviderType::FacebookAds),
            "instagram" => Ok(ProviderType::Instagram),
            "linkedin" => Ok(ProviderType::LinkedIn),
            other => Err(crate::error::CredentialError::UnknownProvider(other.to_string())),
        }
    }
}

/// Platforms the pipeline can publish to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    #[serde(rename = "linkedin")]
    LinkedIn,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::LinkedIn => "linkedin",
        }
    }

    /// Credential record a publish to this platform needs
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Platform::Facebook => ProviderType::Facebook,
            Platform::Instagram => ProviderType::Instagram,
            Platform::LinkedIn => ProviderType::LinkedIn,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(format!(
                "Invalid platform: '{}'. Valid options: facebook, instagram, linkedin",
                other
            )),
        }
    }
}

/// Fixed set of content categories used to steer generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentCategory {
    #[serde(rename = "Business & Marketing")]
    BusinessMarketing,
    #[serde(rename = "Technology & Innovation")]
    TechnologyInnovation,
    #[serde(rename = "Health & Wellness")]
    HealthWellness,
    #[serde(rename = "Lifestyle & Travel")]
    LifestyleTravel,
    #[serde(rename = "Food & Cooking")]
    FoodCooking,
    #[serde(rename = "Education & Learning")]
    EducationLearning,
    #[serde(rename = "Entertainment & Fun")]
    EntertainmentFun,
    #[serde(rename = "Sports & Fitness")]
    SportsFitness,
    #[serde(rename = "Fashion & Beauty")]
    FashionBeauty,
    #[default]
    General,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 10] = [
        ContentCategory::BusinessMarketing,
        ContentCategory::TechnologyInnovation,
        ContentCategory::HealthWellness,
        ContentCategory::LifestyleTravel,
        ContentCategory::FoodCooking,
        ContentCategory::EducationLearning,
        ContentCategory::EntertainmentFun,
        ContentCategory::SportsFitness,
        ContentCategory::FashionBeauty,
        ContentCategory::General,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ContentCategory::BusinessMarketing => "Business & Marketing",
            ContentCategory::TechnologyInnovation => "Technology & Innovation",
            ContentCategory::HealthWellness => "Health & Wellness",
            ContentCategory::LifestyleTravel => "Lifestyle & Travel",
            ContentCategory::FoodCooking => "Food & Cooking",
            ContentCategory::EducationLearning => "Education & Learning",
            ContentCategory::EntertainmentFun => "Entertainment & Fun",
            ContentCategory::SportsFitness => "Sports & Fitness",
            ContentCategory::FashionBeauty => "Fashion & Beauty",
            ContentCategory::General => "General",
        }
    }

    /// Parse an optional label, defaulting to `General` when absent or blank
    pub fn from_optional(label: Option<&str>) -> Result<Self, String> {
        match label.map(str::trim) {
            None | Some("") => Ok(ContentCategory::General),
            Some(label) => label.parse(),
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ContentCategory::ALL
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| {
                let labels: Vec<&str> = ContentCategory::ALL.iter().map(|c| c.label()).collect();
                format!(
                    "Invalid category: '{}'. Valid options: {}",
                    wanted,
                    labels.join(", ")
                )
            })
    }
}

/// Output of one generation run, consumed immediately by publish
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub caption: String,
    pub image_description: String,
    pub image_url: String,
    pub hashtags: Vec<String>,
    pub keywords: Vec<String>,
    pub targeting_tips: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "published" => ContentStatus::Published,
            "failed" => ContentStatus::Failed,
            _ => ContentStatus::Draft,
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted history entry for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPost {
    pub id: String,
    pub user_id: String,
    pub platform: Platform,
    pub prompt: String,
    pub category: ContentCategory,
    pub content: String,
    pub image_url: Option<String>,
    pub image_description: Option<String>,
    pub status: ContentStatus,
    pub provider_post_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ContentPost {
    pub fn new(
        user_id: &str,
        platform: Platform,
        prompt: &str,
        category: ContentCategory,
        content: &GeneratedContent,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            platform,
            prompt: prompt.to_string(),
            category,
            content: content.caption.clone(),
            image_url: non_empty(&content.image_url),
            image_description: non_empty(&content.image_description),
            status: ContentStatus::Draft,
            provider_post_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Uniform publisher outcome, so callers branch without provider knowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResult {
    pub fn published(post_id: impl Into<String>) -> Self {
        Self {
            success: true,
            post_id: Some(post_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            post_id: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of the ad orchestrator; field names follow the callable wire format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(rename = "adset_id", skip_serializing_if = "Option::is_none")]
    pub ad_set_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Structured ad copy produced by the generative provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCopy {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub keywords: Vec<String>,
    pub targeting_tips: Vec<String>,
}

/// Inputs for ad copy generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdBrief {
    pub product: String,
    pub audience: String,
    pub offer: Option<String>,
    pub goal: String,
}
