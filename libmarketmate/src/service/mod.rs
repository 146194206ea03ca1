//! Service layer for MarketMate
//!
//! `MarketMateService` owns the shared resources (config, database, credential
//! store, event bus) and hands out the pieces each binary needs:
//!
//! - `PublishPipeline`: generate → resolve image → publish → optional ad
//! - `HistoryService`: persisted content history
//! - `AdOrchestrator`: ad set and ad creation for a published post
//! - `EventBus`: pipeline progress events
//!
//! The generative client is built on demand, so commands that never generate text
//! (credentials, history, ads) work without an API key.
//!
//! ```no_run
//! use libmarketmate::service::MarketMateService;
//! use libmarketmate::service::pipeline::PublishRequest;
//! use libmarketmate::types::Platform;
//!
//! # async fn example() -> libmarketmate::Result<()> {
//! let service = MarketMateService::new().await?;
//! let pipeline = service.pipeline()?;
//!
//! let request = PublishRequest::new("alice", Platform::LinkedIn, "We are hiring!");
//! let outcome = pipeline.run(&request).await?;
//! println!("{:?}", outcome.publish);
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod history;
pub mod pipeline;

use std::sync::Arc;

use self::events::{EventBus, EventReceiver};
use self::history::HistoryService;
use self::pipeline::PublishPipeline;
use crate::ads::AdOrchestrator;
use crate::config::{resolve_db_path, Config};
use crate::credentials::{CredentialStore, SqliteCredentialStore};
use crate::db::Database;
use crate::error::Result;
use crate::genai::{ContentGenerator, GeminiClient, RetryPolicy, TextGenerator};
use crate::imagery::ImageResolver;
use crate::platforms::Publishers;

pub struct MarketMateService {
    config: Arc<Config>,
    db: Arc<Database>,
    store: Arc<dyn CredentialStore>,
    history: HistoryService,
    events: EventBus,
}

impl MarketMateService {
    /// Load configuration from the default location and open the database
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let db_path = resolve_db_path(&config.database.path);
        let db = Database::new(&db_path).await?;
        Ok(Self::with_database(config, db))
    }

    /// Use an already-open database (tests use `Database::in_memory`)
    pub fn with_database(config: Config, db: Database) -> Self {
        let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(db.clone()));
        let db = Arc::new(db);

        Self {
            config: Arc::new(config),
            history: HistoryService::new(Arc::clone(&db)),
            db,
            store,
            events: EventBus::new(100),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Content generator backed by the configured provider
    pub fn content_generator(&self) -> Result<ContentGenerator> {
        let client = GeminiClient::from_config(&self.config.genai)?;
        Ok(self.content_generator_with(Arc::new(client)))
    }

    /// Content generator over any text provider, with the configured retry policy
    /// and fallback table
    pub fn content_generator_with(&self, text: Arc<dyn TextGenerator>) -> ContentGenerator {
        ContentGenerator::new(text)
            .with_policy(RetryPolicy::from_config(&self.config.genai))
            .with_fallback(self.config.fallback_table())
    }

    pub fn publishers(&self) -> Result<Publishers> {
        Publishers::from_config(&self.config)
    }

    pub fn ad_orchestrator(&self) -> Result<AdOrchestrator> {
        AdOrchestrator::from_config(&self.config)
    }

    pub fn pipeline(&self) -> Result<PublishPipeline> {
        self.pipeline_with(self.content_generator()?, self.publishers()?)
    }

    pub fn pipeline_with(
        &self,
        generator: ContentGenerator,
        publishers: Publishers,
    ) -> Result<PublishPipeline> {
        let resolver = Arc::new(ImageResolver::new(self.config.image_catalog()));
        Ok(PublishPipeline::new(
            generator,
            resolver,
            publishers,
            Arc::clone(&self.store),
            Arc::clone(&self.db),
        )
        .with_ads(Arc::new(self.ad_orchestrator()?))
        .with_events(self.events.clone()))
    }
}
