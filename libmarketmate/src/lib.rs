//! MarketMate - generate, publish and advertise social media content
//!
//! This library holds everything the `mate-*` binaries share: generative copy with
//! bounded retry, stock image selection, Facebook/Instagram/LinkedIn publishers,
//! Facebook ad orchestration, a per-user credential store, and content history.

pub mod ads;
pub mod callable;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod genai;
pub mod imagery;
pub mod logging;
pub mod platforms;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{Credential, CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use db::Database;
pub use error::{MarketMateError, Result};
pub use types::{
    AdResult, ContentCategory, ContentPost, ContentStatus, GeneratedContent, Platform,
    ProviderType, PublishResult,
};
