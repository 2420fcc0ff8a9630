//! Error types for classmarket-state

use thiserror::Error;

/// Errors that can occur in the store persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing or invalid configuration (pre-connection)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// A record the store promised to return was not returned
    #[error("Record not persisted: {0}")]
    NotPersisted(String),

    /// Stored credential string is not in the expected salt$digest form
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
