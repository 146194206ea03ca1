//! Configuration management for MarketMate

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::genai::fallback::FallbackDescriptions;
use crate::imagery::ImageCatalog;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub genai: GenAiConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub linkedin: LinkedInConfig,
    #[serde(default)]
    pub ads: AdsConfig,
    /// Replaces the built-in keyword/image table when present
    #[serde(default)]
    pub imagery: Option<ImageCatalog>,
    /// Replaces the built-in local image-description table when present
    #[serde(default)]
    pub fallback_descriptions: Option<FallbackDescriptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenAiConfig {
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    pub base_url: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_attempts: 5,
            base_delay_ms: 3000,
            timeout_secs: 60,
        }
    }
}

impl GenAiConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingField(format!(
                "generative AI API key (set {})",
                self.api_key_env
            ))
            .into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub version: String,
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com".to_string(),
            version: "v21.0".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedInConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.linkedin.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    pub default_country: String,
    pub daily_budget_cents: u64,
    pub age_min: u32,
    pub age_max: u32,
    pub platforms: Vec<String>,
    pub adset_name: String,
    pub ad_name: String,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            default_country: "IN".to_string(),
            daily_budget_cents: 20000,
            age_min: 18,
            age_max: 35,
            platforms: vec!["facebook".to_string()],
            adset_name: "MarketMate Auto AdSet".to_string(),
            ad_name: "MarketMate Auto Ad".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if no file exists
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/marketmate/marketmate.db".to_string(),
            },
            genai: GenAiConfig::default(),
            graph: GraphConfig::default(),
            linkedin: LinkedInConfig::default(),
            ads: AdsConfig::default(),
            imagery: None,
            fallback_descriptions: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.genai.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "genai.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.ads.age_min > self.ads.age_max {
            return Err(ConfigError::InvalidValue {
                field: "ads.age_min".to_string(),
                message: format!(
                    "{} is greater than ads.age_max ({})",
                    self.ads.age_min, self.ads.age_max
                ),
            }
            .into());
        }
        Ok(())
    }

    /// The image catalogue in effect
    pub fn image_catalog(&self) -> ImageCatalog {
        self.imagery.clone().unwrap_or_default()
    }

    /// The local image-description table in effect
    pub fn fallback_table(&self) -> FallbackDescriptions {
        self.fallback_descriptions.clone().unwrap_or_default()
    }
}

/// Resolve the configuration file path (`$MARKETMATE_CONFIG`, then the XDG config dir)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MARKETMATE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("marketmate").join("config.toml"))
}

/// Resolve the database path, honouring `MARKETMATE_DB_PATH` over the configured one
pub fn resolve_db_path(configured: &str) -> String {
    let path = std::env::var("MARKETMATE_DB_PATH").unwrap_or_else(|_| configured.to_string());
    shellexpand::tilde(&path).to_string()
}
