//! Error types for MarketMate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketMateError>;

#[derive(Error, Debug)]
pub enum MarketMateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Missing auth, missing input, missing credentials. Never retried.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Pipeline failed while {stage}: {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<MarketMateError>,
    },
}

impl MarketMateError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MarketMateError::Precondition(_) => 3,
            MarketMateError::Generation(GenerationError::EmptyPrompt) => 3,
            MarketMateError::Credential(_) => 2,
            MarketMateError::Generation(GenerationError::Overloaded { .. })
            | MarketMateError::Generation(GenerationError::QuotaExceeded) => 4,
            MarketMateError::Pipeline { source, .. } => source.exit_code(),
            MarketMateError::Generation(_)
            | MarketMateError::Platform(_)
            | MarketMateError::Config(_)
            | MarketMateError::Database(_) => 1,
        }
    }

    /// Wrap an error with the pipeline stage it happened in
    pub fn at_stage(self, stage: impl Into<String>) -> Self {
        MarketMateError::Pipeline {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// True when the error (or the error a pipeline failure wraps) is a precondition failure
    pub fn is_precondition(&self) -> bool {
        match self {
            MarketMateError::Precondition(_)
            | MarketMateError::Credential(CredentialError::NotFound { .. })
            | MarketMateError::Generation(GenerationError::EmptyPrompt) => true,
            MarketMateError::Pipeline { source, .. } => source.is_precondition(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stored document is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("No {provider} credentials found for user {user_id}. Please add them in the credential vault.")]
    NotFound { user_id: String, provider: String },

    #[error("Stored {provider} credentials are missing required field '{field}'")]
    MissingField { provider: String, field: String },

    #[error("Unknown provider type: {0}")]
    UnknownProvider(String),

    #[error("Stored credentials for {key} were saved as {actual}")]
    ProviderMismatch { key: String, actual: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("The generative AI service is currently overloaded after {attempts} attempts. Please try again in a few minutes.")]
    Overloaded { attempts: u32 },

    #[error("Daily API quota exceeded. Please wait for the quota to reset or upgrade the billing plan.")]
    QuotaExceeded,

    #[error("No content generated")]
    EmptyResponse,

    #[error("Invalid response format from AI: {0}")]
    InvalidResponse(String),

    #[error("Failed to generate content: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Network(String),
}
