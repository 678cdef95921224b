//! Error types for Mediacast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MediacastError>;

#[derive(Error, Debug)]
pub enum MediacastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scheduler is not running")]
    SchedulerStopped,
}

impl MediacastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MediacastError::Validation(_) => 3,
            MediacastError::NotFound(_) => 3,
            MediacastError::Authorization(_) => 2,
            MediacastError::Config(_) => 2,
            MediacastError::Gateway(_) => 1,
            MediacastError::Database(_) => 1,
            MediacastError::SchedulerStopped => 1,
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
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rejected request: {0}")]
    BadRequest(String),
}
