use async_trait::async_trait;
use tokio::sync::RwLock;

use barometer_core::domain::record::LogRecord;
use barometer_core::errors::StorageError;
use barometer_core::ports::LogStore;

/// Keeps inserted records in process memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    records: RwLock<Vec<LogRecord>>,
    failure: Option<String>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every insert fails with a `Write` error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { records: RwLock::default(), failure: Some(message.into()) }
    }

    pub async fn records(&self) -> Vec<LogRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn insert(&self, record: &LogRecord) -> Result<(), StorageError> {
        if let Some(message) = &self.failure {
            return Err(StorageError::Write { backend: self.backend(), message: message.clone() });
        }

        self.records.write().await.push(record.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    use barometer_core::domain::record::LogRecord;
    use barometer_core::errors::StorageError;
    use barometer_core::ports::LogStore;

    use super::InMemoryLogStore;

    fn record(measure: i64) -> LogRecord {
        LogRecord {
            timestamp: Utc.timestamp_opt(1_579_324_284, 0).unwrap().with_timezone(&Tz::UTC),
            user_id: "UA1DXYCL2".to_string(),
            measure,
            notes: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn inserts_are_kept_in_order() {
        let store = InMemoryLogStore::new();
        store.insert(&record(4)).await.expect("insert first");
        store.insert(&record(4)).await.expect("insert duplicate");
        store.insert(&record(7)).await.expect("insert second");

        let records = store.records().await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].measure, 7);
    }

    #[tokio::test]
    async fn failing_store_surfaces_write_error() {
        let store = InMemoryLogStore::failing("disk full");
        let error = store.insert(&record(4)).await.expect_err("insert should fail");

        assert_eq!(
            error,
            StorageError::Write { backend: "memory", message: "disk full".to_string() }
        );
        assert!(store.is_empty().await);
    }
}
