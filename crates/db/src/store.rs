use async_trait::async_trait;
use tracing::debug;
use url::Url;

use barometer_core::domain::record::LogRecord;
use barometer_core::errors::{StorageError, StoreConfigError};
use barometer_core::ports::LogStore;

use crate::bigquery::{BigQueryOptions, BigQueryStore};
use crate::postgres::PostgresStore;

/// Backend family selected by the storage URL scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    BigQuery,
    Postgres,
}

impl StoreKind {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "bq" | "bigquery" => Some(Self::BigQuery),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BigQuery => "bigquery",
            Self::Postgres => "postgres",
        }
    }
}

/// Storage backend chosen once at startup from the configured URL.
#[derive(Debug)]
pub enum Store {
    BigQuery(BigQueryStore),
    Postgres(PostgresStore),
}

impl Store {
    pub const fn kind(&self) -> StoreKind {
        match self {
            Self::BigQuery(_) => StoreKind::BigQuery,
            Self::Postgres(_) => StoreKind::Postgres,
        }
    }
}

#[async_trait]
impl LogStore for Store {
    async fn insert(&self, record: &LogRecord) -> Result<(), StorageError> {
        match self {
            Self::BigQuery(store) => store.insert(record).await,
            Self::Postgres(store) => store.insert(record).await,
        }
    }

    fn backend(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Opens a store for `url` with default BigQuery options.
///
/// Only the scheme is checked here. Table references and connection
/// parameters are validated on the first `insert`.
pub fn open_store(url: &str) -> Result<Store, StoreConfigError> {
    open_store_with(url, BigQueryOptions::default())
}

pub fn open_store_with(url: &str, options: BigQueryOptions) -> Result<Store, StoreConfigError> {
    let parsed =
        Url::parse(url.trim()).map_err(|error| StoreConfigError::InvalidUrl(error.to_string()))?;
    let scheme = parsed.scheme();

    let kind = StoreKind::from_scheme(scheme)
        .ok_or_else(|| StoreConfigError::UnsupportedScheme(scheme.to_string()))?;
    debug!(event_name = "storage.open", backend = kind.as_str(), "storage backend selected");

    Ok(match kind {
        StoreKind::BigQuery => {
            let table = parsed.host_str().unwrap_or_default();
            Store::BigQuery(BigQueryStore::new(table, options))
        }
        StoreKind::Postgres => Store::Postgres(PostgresStore::new(url.trim())),
    })
}
