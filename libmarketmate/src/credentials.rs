//! Per-user, per-provider credential storage
//!
//! Credentials are persisted as flat documents keyed by `(user_id, provider)`,
//! the shape the credential vault writes. They are validated into the typed
//! [`Credential`] enum when loaded, so call sites never deal with half-filled
//! records.
//!
//! # Example
//!
//! ```no_run
//! use libmarketmate::credentials::{Credential, CredentialStore, MemoryCredentialStore};
//! use libmarketmate::types::ProviderType;
//!
//! # async fn example() -> libmarketmate::Result<()> {
//! let store = MemoryCredentialStore::new();
//! let credential = Credential::linkedin("token", "abc123");
//! store.put("user-1", ProviderType::LinkedIn, &credential).await?;
//!
//! let loaded = store.require("user-1", ProviderType::LinkedIn).await?;
//! assert_eq!(loaded.provider_type(), ProviderType::LinkedIn);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::db::Database;
use crate::error::{CredentialError, DbError, Result};
use crate::types::ProviderType;

/// An access token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacebookPageCredential {
    pub access_token: AccessToken,
    pub page_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacebookAdsCredential {
    pub access_token: AccessToken,
    pub ad_account_id: String,
    pub campaign_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstagramCredential {
    pub access_token: AccessToken,
    pub instagram_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedInCredential {
    pub access_token: AccessToken,
    pub linkedin_user_id: String,
}

/// A validated credential record, one variant per provider type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Facebook(FacebookPageCredential),
    FacebookAds(FacebookAdsCredential),
    Instagram(InstagramCredential),
    LinkedIn(LinkedInCredential),
}

impl Credential {
    pub fn facebook(access_token: &str, page_id: &str) -> Self {
        Credential::Facebook(FacebookPageCredential {
            access_token: AccessToken::new(access_token),
            page_id: page_id.to_string(),
        })
    }

    pub fn facebook_ads(access_token: &str, ad_account_id: &str, campaign_id: &str) -> Self {
        Credential::FacebookAds(FacebookAdsCredential {
            access_token: AccessToken::new(access_token),
            ad_account_id: ad_account_id.to_string(),
            campaign_id: campaign_id.to_string(),
        })
    }

    pub fn instagram(access_token: &str, instagram_user_id: &str) -> Self {
        Credential::Instagram(InstagramCredential {
            access_token: AccessToken::new(access_token),
            instagram_user_id: instagram_user_id.to_string(),
        })
    }

    pub fn linkedin(access_token: &str, linkedin_user_id: &str) -> Self {
        Credential::LinkedIn(LinkedInCredential {
            access_token: AccessToken::new(access_token),
            linkedin_user_id: linkedin_user_id.to_string(),
        })
    }

    pub fn provider_type(&self) -> ProviderType {
        match self {
            Credential::Facebook(_) => ProviderType::Facebook,
            Credential::FacebookAds(_) => ProviderType::FacebookAds,
            Credential::Instagram(_) => ProviderType::Instagram,
            Credential::LinkedIn(_) => ProviderType::LinkedIn,
        }
    }

    pub fn access_token(&self) -> &AccessToken {
        match self {
            Credential::Facebook(c) => &c.access_token,
            Credential::FacebookAds(c) => &c.access_token,
            Credential::Instagram(c) => &c.access_token,
            Credential::LinkedIn(c) => &c.access_token,
        }
    }

    /// The provider-side identifier this credential acts on
    pub fn target_id(&self) -> &str {
        match self {
            Credential::Facebook(c) => &c.page_id,
            Credential::FacebookAds(c) => &c.ad_account_id,
            Credential::Instagram(c) => &c.instagram_user_id,
            Credential::LinkedIn(c) => &c.linkedin_user_id,
        }
    }

    /// Validate a stored document against the required fields of its provider type
    pub fn from_document(doc: CredentialDocument) -> std::result::Result<Self, CredentialError> {
        let provider: ProviderType = doc.provider.parse()?;
        let field = |value: &Option<String>, name: &str| -> std::result::Result<String, CredentialError> {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(CredentialError::MissingField {
                    provider: provider.to_string(),
                    field: name.to_string(),
                }),
            }
        };

        let access_token = AccessToken::new(field(&doc.access_token, "accessToken")?);
        Ok(match provider {
            ProviderType::Facebook => Credential::Facebook(FacebookPageCredential {
                access_token,
                page_id: field(&doc.page_id, "pageId")?,
            }),
            ProviderType::FacebookAds => Credential::FacebookAds(FacebookAdsCredential {
                access_token,
                ad_account_id: field(&doc.ad_account_id, "adAccountId")?,
                campaign_id: field(&doc.campaign_id, "campaignId")?,
            }),
            ProviderType::Instagram => Credential::Instagram(InstagramCredential {
                access_token,
                instagram_user_id: field(&doc.instagram_user_id, "instagramUserId")?,
            }),
            ProviderType::LinkedIn => Credential::LinkedIn(LinkedInCredential {
                access_token,
                linkedin_user_id: field(&doc.linkedin_user_id, "linkedInUserId")?,
            }),
        })
    }

    pub fn to_document(&self) -> CredentialDocument {
        let mut doc = CredentialDocument {
            provider: self.provider_type().to_string(),
            access_token: Some(self.access_token().expose().to_string()),
            ..Default::default()
        };
        match self {
            Credential::Facebook(c) => doc.page_id = Some(c.page_id.clone()),
            Credential::FacebookAds(c) => {
                doc.ad_account_id = Some(c.ad_account_id.clone());
                doc.campaign_id = Some(c.campaign_id.clone());
            }
            Credential::Instagram(c) => doc.instagram_user_id = Some(c.instagram_user_id.clone()),
            Credential::LinkedIn(c) => doc.linkedin_user_id = Some(c.linkedin_user_id.clone()),
        }
        doc
    }
}

macro_rules! credential_variant {
    ($variant:ident, $ty:ty, $provider:expr) => {
        impl TryFrom<Credential> for $ty {
            type Error = CredentialError;

            fn try_from(credential: Credential) -> std::result::Result<Self, Self::Error> {
                match credential {
                    Credential::$variant(inner) => Ok(inner),
                    other => Err(CredentialError::ProviderMismatch {
                        key: $provider.to_string(),
                        actual: other.provider_type().to_string(),
                    }),
                }
            }
        }
    };
}

credential_variant!(Facebook, FacebookPageCredential, ProviderType::Facebook);
credential_variant!(FacebookAds, FacebookAdsCredential, ProviderType::FacebookAds);
credential_variant!(Instagram, InstagramCredential, ProviderType::Instagram);
credential_variant!(LinkedIn, LinkedInCredential, ProviderType::LinkedIn);

/// Flat stored shape of a credential record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDocument {
    #[serde(rename = "type")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_user_id: Option<String>,
    #[serde(rename = "linkedInUserId", default, skip_serializing_if = "Option::is_none")]
    pub linkedin_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// Key-value store of credential records keyed by `(user_id, provider)`
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load one record, `None` when the user never saved one for this provider
    async fn get(&self, user_id: &str, provider: ProviderType) -> Result<Option<Credential>>;

    /// Load every record for a user, in provider order
    async fn get_all(&self, user_id: &str) -> Result<Vec<Credential>>;

    /// Create or overwrite the record for `(user_id, provider)`
    async fn put(&self, user_id: &str, provider: ProviderType, credential: &Credential)
        -> Result<()>;

    fn backend_name(&self) -> &str;

    /// Like `get`, but absence is a precondition failure
    async fn require(&self, user_id: &str, provider: ProviderType) -> Result<Credential> {
        self.get(user_id, provider).await?.ok_or_else(|| {
            CredentialError::NotFound {
                user_id: user_id.to_string(),
                provider: provider.to_string(),
            }
            .into()
        })
    }
}

fn check_provider(provider: ProviderType, credential: &Credential) -> Result<()> {
    if credential.provider_type() != provider {
        return Err(CredentialError::ProviderMismatch {
            key: provider.to_string(),
            actual: credential.provider_type().to_string(),
        }
        .into());
    }
    Ok(())
}

/// In-process store, used by tests and dry runs
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<(String, ProviderType), CredentialDocument>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw document, bypassing validation (simulates a hand-edited store)
    pub fn insert_document(
        &self,
        user_id: &str,
        provider: ProviderType,
        doc: CredentialDocument,
    ) -> Result<()> {
        self.records()?.insert((user_id.to_string(), provider), doc);
        Ok(())
    }

    fn records(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<(String, ProviderType), CredentialDocument>>> {
        self.records
            .lock()
            .map_err(|_| DbError::Corrupt("credential store lock poisoned".to_string()).into())
    }

    fn snapshot(&self, user_id: &str, provider: ProviderType) -> Result<Option<CredentialDocument>> {
        Ok(self.records()?.get(&(user_id.to_string(), provider)).cloned())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, user_id: &str, provider: ProviderType) -> Result<Option<Credential>> {
        match self.snapshot(user_id, provider)? {
            Some(doc) => Ok(Some(Credential::from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<Credential>> {
        let mut credentials = Vec::new();
        for provider in ProviderType::ALL {
            let Some(doc) = self.snapshot(user_id, provider)? else {
                continue;
            };
            match Credential::from_document(doc) {
                Ok(credential) => credentials.push(credential),
                Err(e) => {
                    tracing::warn!(user_id, provider = %provider, "Skipping invalid credential record: {}", e);
                }
            }
        }
        Ok(credentials)
    }

    async fn put(
        &self,
        user_id: &str,
        provider: ProviderType,
        credential: &Credential,
    ) -> Result<()> {
        check_provider(provider, credential)?;
        self.insert_document(user_id, provider, credential.to_document())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// SQLite-backed store sharing the application database
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: Database,
}

impl SqliteCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn decode_document(raw: &str) -> Result<Credential> {
    let doc: CredentialDocument = serde_json::from_str(raw)
        .map_err(|e| DbError::Corrupt(format!("credential document: {}", e)))?;
    Ok(Credential::from_document(doc)?)
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self, user_id: &str, provider: ProviderType) -> Result<Option<Credential>> {
        match self.db.get_credential_document(user_id, provider.as_str()).await? {
            Some(raw) => Ok(Some(decode_document(&raw)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<Credential>> {
        let rows = self.db.list_credential_documents(user_id).await?;
        let mut credentials = Vec::with_capacity(rows.len());
        for (provider, raw) in rows {
            match decode_document(&raw) {
                Ok(credential) => credentials.push(credential),
                Err(e) => {
                    tracing::warn!(user_id, provider = %provider, "Skipping invalid credential record: {}", e);
                }
            }
        }
        credentials.sort_by_key(|c| {
            ProviderType::ALL
                .iter()
                .position(|p| *p == c.provider_type())
                .unwrap_or(usize::MAX)
        });
        Ok(credentials)
    }

    async fn put(
        &self,
        user_id: &str,
        provider: ProviderType,
        credential: &Credential,
    ) -> Result<()> {
        check_provider(provider, credential)?;
        let raw = serde_json::to_string(&credential.to_document())
            .map_err(|e| DbError::Corrupt(format!("credential document: {}", e)))?;
        self.db
            .upsert_credential_document(user_id, provider.as_str(), &raw)
            .await
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}
