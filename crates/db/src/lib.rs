pub mod bigquery;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod store;

pub use bigquery::{BigQueryOptions, BigQueryStore, TableReference, TokenSource};
pub use memory::InMemoryLogStore;
pub use postgres::PostgresStore;
pub use store::{open_store, open_store_with, Store, StoreKind};
