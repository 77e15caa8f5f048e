use async_trait::async_trait;
use thiserror::Error;

use crate::domain::record::LogRecord;
use crate::errors::StorageError;

/// Durable sink for barometer records. Each call writes exactly one record.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert(&self, record: &LogRecord) -> Result<(), StorageError>;

    /// Short backend name used in logs and health output.
    fn backend(&self) -> &'static str;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecorationError {
    #[error("decoration feed request failed: {0}")]
    Transport(String),
    #[error("decoration feed returned status {0}")]
    Status(u16),
    #[error("decoration feed payload was not understood: {0}")]
    Payload(String),
}

/// Optional source of decorative text for replies, such as a quote of the day.
#[async_trait]
pub trait DecorationSource: Send + Sync {
    async fn fetch(&self) -> Result<String, DecorationError>;
}
