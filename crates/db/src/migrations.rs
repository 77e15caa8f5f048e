use sqlx::migrate::{MigrateError, Migrator};
use sqlx::{ConnectOptions, Connection};
use thiserror::Error;
use url::Url;

use crate::postgres::PostgresStore;
use crate::store::StoreKind;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migrations only apply to postgres storage, got `{0}`")]
    UnsupportedBackend(String),
    #[error("could not connect: {0}")]
    Connect(String),
    #[error(transparent)]
    Migrate(#[from] MigrateError),
}

/// Applies pending schema migrations to the Postgres database at `url`.
pub async fn run_pending(url: &str) -> Result<(), MigrationError> {
    let scheme = Url::parse(url.trim())
        .map(|parsed| parsed.scheme().to_string())
        .map_err(|error| MigrationError::Connect(error.to_string()))?;
    if StoreKind::from_scheme(&scheme) != Some(StoreKind::Postgres) {
        return Err(MigrationError::UnsupportedBackend(scheme));
    }

    let options = PostgresStore::new(url.trim())
        .connect_options()
        .map_err(|error| MigrationError::Connect(error.to_string()))?;
    let mut connection =
        options.connect().await.map_err(|error| MigrationError::Connect(error.to_string()))?;

    let result = MIGRATOR.run(&mut connection).await;
    let _ = connection.close().await;
    result.map_err(MigrationError::from)
}
