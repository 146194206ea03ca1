//! Ad set and ad creation around a published Facebook post
//!
//! Steps, in order:
//! 1. Best-effort Instagram cross-post when an image, a caption and Instagram
//!    credentials are all available. Failure is logged and ignored.
//! 2. Create an ad set under the campaign (fatal on failure).
//! 3. Create an ad whose creative is the published post (fatal on failure).
//!
//! A failed step 3 leaves the ad set from step 2 in place; the failed result still
//! carries its id so it can be cleaned up by hand.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AdsConfig, Config};
use crate::credentials::{
    Credential, CredentialStore, FacebookAdsCredential, FacebookPageCredential,
    InstagramCredential,
};
use crate::error::Result;
use crate::platforms::facebook::graph_base;
use crate::platforms::http::ProviderHttp;
use crate::platforms::{InstagramPublisher, PublishContent, Publisher};
use crate::types::{AdResult, ProviderType};

/// Caller-supplied targeting; absent fields keep the configured defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetingOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targeting {
    pub countries: Vec<String>,
    pub age_min: u32,
    pub age_max: u32,
    pub platforms: Vec<String>,
}

impl Targeting {
    pub fn defaults(config: &AdsConfig) -> Self {
        Self {
            countries: vec![config.default_country.clone()],
            age_min: config.age_min,
            age_max: config.age_max,
            platforms: config.platforms.clone(),
        }
    }

    /// Overrides merged over the defaults, field by field
    pub fn merged(config: &AdsConfig, overrides: &TargetingOverrides) -> Self {
        let defaults = Self::defaults(config);
        Self {
            countries: overrides
                .countries
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.countries),
            age_min: overrides.age_min.unwrap_or(defaults.age_min),
            age_max: overrides.age_max.unwrap_or(defaults.age_max),
            platforms: overrides
                .platforms
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.platforms),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.age_min > self.age_max {
            return Err(format!(
                "targeting.age_min ({}) is greater than targeting.age_max ({})",
                self.age_min, self.age_max
            ));
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        json!({
            "geo_locations": { "countries": self.countries },
            "age_min": self.age_min,
            "age_max": self.age_max,
            "publisher_platforms": self.platforms,
            "facebook_positions": ["feed", "story"],
            "device_platforms": ["mobile", "desktop"],
        })
    }
}

/// One ad-creation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdRequest {
    pub post_id: String,
    pub image_url: Option<String>,
    pub caption: Option<String>,
    pub daily_budget_cents: Option<u64>,
    pub targeting: TargetingOverrides,
    /// Overrides the campaign stored with the ads credentials
    pub campaign_id: Option<String>,
}

impl AdRequest {
    pub fn for_post(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            ..Default::default()
        }
    }
}

/// Credentials the orchestrator needs: ads and page are required, Instagram is optional
#[derive(Debug, Clone)]
pub struct AdCredentials {
    pub ads: FacebookAdsCredential,
    pub page: FacebookPageCredential,
    pub instagram: Option<InstagramCredential>,
}

impl AdCredentials {
    /// Load from the store. A missing page or ads record is a precondition failure.
    pub async fn load(store: &dyn CredentialStore, user_id: &str) -> Result<Self> {
        let page = store.require(user_id, ProviderType::Facebook).await?;
        let ads = store.require(user_id, ProviderType::FacebookAds).await?;
        let instagram = match store.get(user_id, ProviderType::Instagram).await {
            Ok(Some(Credential::Instagram(ig))) => Some(ig),
            Ok(_) => None,
            Err(e) => {
                warn!(user_id, "Ignoring unusable Instagram credentials: {}", e);
                None
            }
        };

        Ok(Self {
            ads: FacebookAdsCredential::try_from(ads)?,
            page: FacebookPageCredential::try_from(page)?,
            instagram,
        })
    }
}

/// Ad account path segment, tolerating ids stored with or without the `act_` prefix
fn ad_account_path(ad_account_id: &str, edge: &str) -> String {
    let id = ad_account_id.trim_start_matches("act_");
    format!("act_{}/{}", id, edge)
}

/// Composite `{page}_{post}` id the ad creative points at
pub fn story_id(page_id: &str, post_id: &str) -> String {
    if post_id.starts_with(&format!("{}_", page_id)) {
        post_id.to_string()
    } else {
        format!("{}_{}", page_id, post_id)
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Ad set payload: starts a minute from `now`, runs 48 hours
pub fn build_ad_set_payload(
    now: DateTime<Utc>,
    name: &str,
    campaign_id: &str,
    daily_budget_cents: u64,
    targeting: &Targeting,
    access_token: &str,
) -> Value {
    json!({
        "name": format!("{} {}", name, now.timestamp_millis()),
        "campaign_id": campaign_id,
        "daily_budget": daily_budget_cents.to_string(),
        "billing_event": "IMPRESSIONS",
        "optimization_goal": "POST_ENGAGEMENT",
        "bid_strategy": "LOWEST_COST_WITHOUT_CAP",
        "status": "ACTIVE",
        "start_time": iso(now + Duration::seconds(60)),
        "end_time": iso(now + Duration::hours(48)),
        "targeting": targeting.to_json(),
        "access_token": access_token,
    })
}

pub fn build_ad_payload(
    now: DateTime<Utc>,
    name: &str,
    ad_set_id: &str,
    page_id: &str,
    post_id: &str,
    access_token: &str,
) -> Value {
    json!({
        "name": format!("{} {}", name, now.timestamp_millis()),
        "adset_id": ad_set_id,
        "creative": { "object_story_id": story_id(page_id, post_id) },
        "status": "ACTIVE",
        "access_token": access_token,
    })
}

pub struct AdOrchestrator {
    http: ProviderHttp,
    instagram: Arc<dyn Publisher>,
    config: AdsConfig,
}

impl AdOrchestrator {
    pub fn new(http: ProviderHttp, instagram: Arc<dyn Publisher>, config: AdsConfig) -> Self {
        Self {
            http,
            instagram,
            config,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = ProviderHttp::new(&graph_base(&config.graph), config.graph.timeout_secs)?;
        let instagram = Arc::new(InstagramPublisher::from_config(&config.graph)?);
        Ok(Self::new(http, instagram, config.ads.clone()))
    }

    pub fn config(&self) -> &AdsConfig {
        &self.config
    }

    async fn cross_post(&self, request: &AdRequest, credentials: &AdCredentials) -> Option<String> {
        let (Some(image_url), Some(caption), Some(ig)) = (
            request.image_url.as_deref().filter(|u| !u.is_empty()),
            request.caption.as_deref().filter(|c| !c.is_empty()),
            credentials.instagram.as_ref(),
        ) else {
            return None;
        };

        let content = PublishContent::new(caption, Some(image_url.to_string()));
        let result = self
            .instagram
            .publish(&content, &ig.access_token, &ig.instagram_user_id)
            .await;

        if result.success {
            result.post_id
        } else {
            warn!(
                "Instagram cross-post failed, continuing with ad creation: {}",
                result.error.as_deref().unwrap_or("unknown error")
            );
            None
        }
    }

    async fn create(&self, path: &str, payload: &Value, what: &str) -> std::result::Result<String, String> {
        let reply = self
            .http
            .post_json(path, payload, None, &[])
            .await
            .map_err(|e| format!("Failed to create {}: {}", what, e))?;

        if !reply.is_success() {
            return Err(format!(
                "Failed to create {}: {}",
                what,
                reply.error_message("Unknown error")
            ));
        }
        reply
            .str_field("id")
            .ok_or_else(|| format!("Failed to create {}: no id in response", what))
    }

    /// Run the three steps for one published post
    pub async fn create_ad_for_post(
        &self,
        request: &AdRequest,
        credentials: &AdCredentials,
    ) -> AdResult {
        if request.post_id.trim().is_empty() {
            return AdResult::failed("post_id is required");
        }

        let targeting = Targeting::merged(&self.config, &request.targeting);
        if let Err(e) = targeting.validate() {
            return AdResult::failed(e);
        }

        let instagram_post_id = self.cross_post(request, credentials).await;

        let ads = &credentials.ads;
        let token = ads.access_token.expose();
        let campaign_id = request
            .campaign_id
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| ads.campaign_id.clone());
        let budget = request
            .daily_budget_cents
            .filter(|b| *b > 0)
            .unwrap_or(self.config.daily_budget_cents);

        info!(
            campaign_id = %campaign_id,
            daily_budget = budget,
            post_id = %request.post_id,
            "Creating ad set"
        );

        let now = Utc::now();
        let ad_set_payload = build_ad_set_payload(
            now,
            &self.config.adset_name,
            &campaign_id,
            budget,
            &targeting,
            token,
        );
        let ad_set_id = match self
            .create(&ad_account_path(&ads.ad_account_id, "adsets"), &ad_set_payload, "ad set")
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("{}", e);
                return AdResult {
                    campaign_id: Some(campaign_id),
                    instagram_post_id,
                    ..AdResult::failed(e)
                };
            }
        };
        info!(ad_set_id = %ad_set_id, "Ad set created");

        let ad_payload = build_ad_payload(
            Utc::now(),
            &self.config.ad_name,
            &ad_set_id,
            &credentials.page.page_id,
            &request.post_id,
            token,
        );
        match self
            .create(&ad_account_path(&ads.ad_account_id, "ads"), &ad_payload, "ad")
            .await
        {
            Ok(ad_id) => {
                info!(ad_id = %ad_id, ad_set_id = %ad_set_id, "Ad created");
                AdResult {
                    success: true,
                    campaign_id: Some(campaign_id),
                    ad_set_id: Some(ad_set_id),
                    ad_id: Some(ad_id),
                    instagram_post_id,
                    error: None,
                }
            }
            Err(e) => {
                warn!(ad_set_id = %ad_set_id, "Ad creation failed, ad set left in place: {}", e);
                AdResult {
                    campaign_id: Some(campaign_id),
                    ad_set_id: Some(ad_set_id),
                    instagram_post_id,
                    ..AdResult::failed(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_targeting_defaults() {
        let targeting = Targeting::merged(&AdsConfig::default(), &TargetingOverrides::default());
        assert_eq!(targeting.countries, vec!["IN"]);
        assert_eq!((targeting.age_min, targeting.age_max), (18, 35));
        assert_eq!(targeting.platforms, vec!["facebook"]);
    }

    #[test]
    fn test_targeting_overrides_merge_per_field() {
        let overrides = TargetingOverrides {
            countries: Some(vec!["US".to_string(), "CA".to_string()]),
            age_max: Some(50),
            ..Default::default()
        };
        let targeting = Targeting::merged(&AdsConfig::default(), &overrides);
        assert_eq!(targeting.countries, vec!["US", "CA"]);
        assert_eq!(targeting.age_min, 18);
        assert_eq!(targeting.age_max, 50);
        assert_eq!(targeting.platforms, vec!["facebook"]);
    }

    #[test]
    fn test_targeting_validation() {
        let overrides = TargetingOverrides {
            age_min: Some(40),
            age_max: Some(20),
            ..Default::default()
        };
        assert!(Targeting::merged(&AdsConfig::default(), &overrides)
            .validate()
            .is_err());
    }

    #[test]
    fn test_ad_set_payload() {
        let targeting = Targeting::defaults(&AdsConfig::default());
        let payload = build_ad_set_payload(
            fixed_now(),
            "MarketMate Auto AdSet",
            "camp-1",
            20000,
            &targeting,
            "tok",
        );

        assert_eq!(
            payload["name"],
            format!("MarketMate Auto AdSet {}", fixed_now().timestamp_millis())
        );
        assert_eq!(payload["daily_budget"], "20000");
        assert_eq!(payload["billing_event"], "IMPRESSIONS");
        assert_eq!(payload["optimization_goal"], "POST_ENGAGEMENT");
        assert_eq!(payload["bid_strategy"], "LOWEST_COST_WITHOUT_CAP");
        assert_eq!(payload["status"], "ACTIVE");
        assert_eq!(payload["start_time"], "2024-05-01T12:01:00.000Z");
        assert_eq!(payload["end_time"], "2024-05-03T12:00:00.000Z");
        assert_eq!(payload["targeting"]["geo_locations"]["countries"][0], "IN");
        assert_eq!(payload["targeting"]["facebook_positions"], json!(["feed", "story"]));
        assert_eq!(payload["targeting"]["device_platforms"], json!(["mobile", "desktop"]));
        assert_eq!(payload["targeting"]["publisher_platforms"], json!(["facebook"]));
    }

    #[test]
    fn test_ad_payload_references_post() {
        let payload = build_ad_payload(fixed_now(), "MarketMate Auto Ad", "as-1", "123", "456", "tok");
        assert_eq!(payload["creative"]["object_story_id"], "123_456");
        assert_eq!(payload["adset_id"], "as-1");
        assert_eq!(payload["status"], "ACTIVE");
    }

    #[test]
    fn test_story_id_keeps_composite_ids() {
        assert_eq!(story_id("123", "456"), "123_456");
        assert_eq!(story_id("123", "123_456"), "123_456");
    }

    #[test]
    fn test_ad_account_path() {
        assert_eq!(ad_account_path("999", "adsets"), "act_999/adsets");
        assert_eq!(ad_account_path("act_999", "ads"), "act_999/ads");
    }

    #[tokio::test]
    async fn test_load_requires_page_and_ads_credentials() {
        use crate::credentials::MemoryCredentialStore;

        let store = MemoryCredentialStore::new();
        store
            .put("u1", ProviderType::FacebookAds, &Credential::facebook_ads("t", "act", "camp"))
            .await
            .unwrap();
        let err = AdCredentials::load(&store, "u1").await.unwrap_err();
        assert!(err.is_precondition());

        store
            .put("u1", ProviderType::Facebook, &Credential::facebook("t", "123"))
            .await
            .unwrap();
        let creds = AdCredentials::load(&store, "u1").await.unwrap();
        assert_eq!(creds.page.page_id, "123");
        assert!(creds.instagram.is_none());
    }
}
