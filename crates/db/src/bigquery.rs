use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use barometer_core::domain::record::LogRecord;
use barometer_core::errors::StorageError;
use barometer_core::ports::LogStore;

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com";
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const BACKEND: &str = "bigquery";

/// Where the OAuth access token for the BigQuery API comes from.
#[derive(Clone, Debug)]
pub enum TokenSource {
    Static(SecretString),
    /// GCE / Cloud Run metadata server for the default service account.
    Metadata { url: String },
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::Metadata { url: METADATA_TOKEN_URL.to_string() }
    }
}

#[derive(Clone, Debug)]
pub struct BigQueryOptions {
    pub endpoint: String,
    pub token: TokenSource,
}

impl Default for BigQueryOptions {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), token: TokenSource::default() }
    }
}

impl BigQueryOptions {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_static_token(mut self, token: SecretString) -> Self {
        self.token = TokenSource::Static(token);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableReference {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableReference {
    /// Splits `project.dataset.table`. Anything other than three non-empty
    /// segments is rejected.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let segments: Vec<&str> = raw.split('.').collect();
        match segments.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    project: (*project).to_string(),
                    dataset: (*dataset).to_string(),
                    table: (*table).to_string(),
                })
            }
            _ => Err(StorageError::MalformedTableReference(raw.to_string())),
        }
    }

    fn insert_all_url(&self, endpoint: &str) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            endpoint.trim_end_matches('/'),
            self.project,
            self.dataset,
            self.table
        )
    }
}

#[derive(Debug)]
pub struct BigQueryStore {
    table: String,
    options: BigQueryOptions,
}

impl BigQueryStore {
    pub fn new(table: impl Into<String>, options: BigQueryOptions) -> Self {
        Self { table: table.into(), options }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn access_token(&self, client: &Client) -> Result<SecretString, StorageError> {
        let url = match &self.options.token {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata { url } => url,
        };

        let response = client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|error| client_error(format!("metadata token request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(client_error(format!("metadata server returned {status}")));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|error| client_error(format!("metadata token was not understood: {error}")))?;
        Ok(token.access_token.into())
    }
}

#[async_trait]
impl LogStore for BigQueryStore {
    async fn insert(&self, record: &LogRecord) -> Result<(), StorageError> {
        let table = TableReference::parse(&self.table)?;
        let client = Client::builder()
            .build()
            .map_err(|error| client_error(format!("http client could not be built: {error}")))?;
        let token = self.access_token(&client).await?;

        let request = InsertAllRequest {
            kind: "bigquery#tableDataInsertAllRequest",
            rows: vec![InsertRow { json: RowValues::from(record) }],
        };

        let response = client
            .post(table.insert_all_url(&self.options.endpoint))
            .bearer_auth(token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|error| write_error(format!("insertAll request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(write_error(format!("insertAll returned {status}: {body}")));
        }

        let outcome: InsertAllResponse = response.json().await.map_err(|error| {
            write_error(format!("insertAll response was not understood: {error}"))
        })?;
        if let Some(row_error) = outcome.insert_errors.first() {
            let reasons = row_error
                .errors
                .iter()
                .map(|detail| format!("{}: {}", detail.reason, detail.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(write_error(format!("row {} rejected: {reasons}", row_error.index)));
        }

        debug!(
            event_name = "storage.bigquery.inserted",
            project = %table.project,
            dataset = %table.dataset,
            table = %table.table,
            "record streamed to bigquery"
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}

fn client_error(message: String) -> StorageError {
    StorageError::ClientConstruction { backend: BACKEND, message }
}

fn write_error(message: String) -> StorageError {
    StorageError::Write { backend: BACKEND, message }
}

#[derive(Debug, Serialize)]
struct InsertAllRequest {
    kind: &'static str,
    rows: Vec<InsertRow>,
}

#[derive(Debug, Serialize)]
struct InsertRow {
    json: RowValues,
}

/// Column layout of the barometer table.
#[derive(Debug, Serialize)]
struct RowValues {
    timestamp: String,
    user_id: String,
    log_measure: i64,
    notes: String,
}

impl From<&LogRecord> for RowValues {
    fn from(record: &LogRecord) -> Self {
        Self {
            timestamp: record.timestamp.to_rfc3339(),
            user_id: record.user_id.clone(),
            log_measure: record.measure,
            notes: record.notes.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowError>,
}

#[derive(Debug, Deserialize)]
struct RowError {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}
