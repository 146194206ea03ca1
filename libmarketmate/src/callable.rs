//! Request-scoped ad creation entry point
//!
//! Mirrors a hosted callable function: the host injects the caller identity, the
//! request is JSON, and failures are reported as `{code, message}` with a small set
//! of codes. Provider rejections are not errors here; they come back as an
//! [`AdResult`] with `success: false`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::ads::{AdCredentials, AdOrchestrator, AdRequest, Targeting, TargetingOverrides};
use crate::credentials::CredentialStore;
use crate::error::{CredentialError, MarketMateError};
use crate::types::{AdResult, ProviderType};

/// Identity injected by the hosting environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Option<String>,
}

impl CallerContext {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The caller's user id, or `unauthenticated`
    pub fn require_user(&self) -> Result<&str, CallableError> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                CallableError::new(
                    CallableCode::Unauthenticated,
                    "User must be authenticated to create ads",
                )
            })
    }
}

/// Wire shape of the request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateAdRequest {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub daily_budget_cents: Option<u64>,
    #[serde(default)]
    pub targeting: Option<TargetingOverrides>,
    #[serde(default)]
    pub campaign_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallableCode {
    Unauthenticated,
    InvalidArgument,
    FailedPrecondition,
    Internal,
}

impl CallableCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallableCode::Unauthenticated => "unauthenticated",
            CallableCode::InvalidArgument => "invalid-argument",
            CallableCode::FailedPrecondition => "failed-precondition",
            CallableCode::Internal => "internal",
        }
    }

    /// Process exit code for CLI hosts
    pub fn exit_code(&self) -> i32 {
        match self {
            CallableCode::Unauthenticated => 16,
            CallableCode::InvalidArgument => 3,
            CallableCode::FailedPrecondition => 9,
            CallableCode::Internal => 1,
        }
    }
}

impl fmt::Display for CallableCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CallableError {
    pub code: CallableCode,
    pub message: String,
}

impl CallableError {
    pub fn new(code: CallableCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn credential_failure(error: MarketMateError) -> CallableError {
    match error {
        MarketMateError::Credential(CredentialError::NotFound { provider, .. }) => {
            let label = match provider.parse::<ProviderType>() {
                Ok(ProviderType::Facebook) => "Facebook Page",
                Ok(ProviderType::FacebookAds) => "Facebook Ads",
                Ok(ProviderType::Instagram) => "Instagram",
                Ok(ProviderType::LinkedIn) => "LinkedIn",
                Err(_) => provider.as_str(),
            };
            CallableError::new(
                CallableCode::FailedPrecondition,
                format!(
                    "{} credentials not found. Please add them in Credential Vault.",
                    label
                ),
            )
        }
        MarketMateError::Credential(e) => {
            CallableError::new(CallableCode::FailedPrecondition, e.to_string())
        }
        other => CallableError::new(CallableCode::Internal, other.to_string()),
    }
}

/// Create an ad set and ad for a published post on behalf of the caller
pub async fn create_ad_set_and_ad(
    ctx: &CallerContext,
    request: CreateAdRequest,
    store: &dyn CredentialStore,
    orchestrator: &AdOrchestrator,
) -> Result<AdResult, CallableError> {
    let user_id = ctx.require_user()?;

    let post_id = request
        .post_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| CallableError::new(CallableCode::InvalidArgument, "post_id is required"))?
        .to_string();

    let overrides = request.targeting.unwrap_or_default();
    Targeting::merged(orchestrator.config(), &overrides)
        .validate()
        .map_err(|e| CallableError::new(CallableCode::InvalidArgument, e))?;

    let credentials = AdCredentials::load(store, user_id)
        .await
        .map_err(|e| {
            warn!(user_id, "Ad credentials unavailable: {}", e);
            credential_failure(e)
        })?;

    info!(
        user_id,
        post_id = %post_id,
        has_instagram = credentials.instagram.is_some(),
        "Creating ad for post"
    );

    let ad_request = AdRequest {
        post_id,
        image_url: request.image_url,
        caption: request.caption,
        daily_budget_cents: request.daily_budget_cents,
        targeting: overrides,
        campaign_id: request.campaign_id,
    };
    Ok(orchestrator.create_ad_for_post(&ad_request, &credentials).await)
}
