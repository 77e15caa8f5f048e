use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use barometer_core::domain::record::LogRecord;
use barometer_core::errors::{StorageError, StoreConfigError};
use barometer_core::ports::LogStore;
use barometer_db::{open_store, open_store_with, BigQueryOptions, TokenSource};

const INSERT_PATH: &str = "/bigquery/v2/projects/proj/datasets/dataset/tables/table/insertAll";

fn record() -> LogRecord {
    LogRecord {
        timestamp: Utc.timestamp_opt(1_579_324_284, 0).unwrap().with_timezone(&Tz::Asia__Manila),
        user_id: "UA1DXYCL2".to_string(),
        measure: 4,
        notes: "hello world".to_string(),
    }
}

fn static_options(server: &MockServer) -> BigQueryOptions {
    BigQueryOptions::default()
        .with_endpoint(server.uri())
        .with_static_token("test-access-token".to_string().into())
}

#[tokio::test]
async fn bigquery_insert_streams_one_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_partial_json(json!({
            "rows": [{
                "json": {
                    "timestamp": "2020-01-18T13:11:24+08:00",
                    "user_id": "UA1DXYCL2",
                    "log_measure": 4,
                    "notes": "hello world"
                }
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "kind": "bigquery#tableDataInsertAllResponse" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = open_store_with("bq://proj.dataset.table", static_options(&server)).expect("open");
    store.insert(&record()).await.expect("insert should succeed");
}

#[tokio::test]
async fn bigquery_row_errors_are_write_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "bigquery#tableDataInsertAllResponse",
            "insertErrors": [{
                "index": 0,
                "errors": [{ "reason": "invalid", "message": "no such field: mood" }]
            }]
        })))
        .mount(&server)
        .await;

    let store = open_store_with("bq://proj.dataset.table", static_options(&server)).expect("open");
    let error = store.insert(&record()).await.expect_err("row error should fail the insert");

    match error {
        StorageError::Write { backend, message } => {
            assert_eq!(backend, "bigquery");
            assert!(message.contains("no such field: mood"), "unexpected message: {message}");
        }
        other => panic!("expected write error, got {other:?}"),
    }
}

#[tokio::test]
async fn bigquery_http_failure_is_a_write_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("Not found: Table proj:dataset.table"),
        )
        .mount(&server)
        .await;

    let store = open_store_with("bq://proj.dataset.table", static_options(&server)).expect("open");
    let error = store.insert(&record()).await.expect_err("404 should fail the insert");

    assert!(matches!(error, StorageError::Write { backend: "bigquery", .. }));
}

#[tokio::test]
async fn metadata_server_supplies_the_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .and(header("metadata-flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "from-metadata",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .and(header("authorization", "Bearer from-metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let options = BigQueryOptions {
        endpoint: server.uri(),
        token: TokenSource::Metadata { url: format!("{}/token", server.uri()) },
    };
    let store = open_store_with("bigquery://proj.dataset.table", options).expect("open");
    store.insert(&record()).await.expect("insert should succeed");
}

#[tokio::test]
async fn metadata_failure_is_a_client_construction_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let options = BigQueryOptions {
        endpoint: server.uri(),
        token: TokenSource::Metadata { url: format!("{}/token", server.uri()) },
    };
    let store = open_store_with("bq://proj.dataset.table", options).expect("open");
    let error = store.insert(&record()).await.expect_err("token failure should surface");

    assert!(matches!(error, StorageError::ClientConstruction { backend: "bigquery", .. }));
}

#[tokio::test]
async fn malformed_table_reference_is_reported_lazily() {
    let server = MockServer::start().await;

    let store = open_store_with("bq://proj.dataset", static_options(&server))
        .expect("open accepts any table reference");
    let error = store.insert(&record()).await.expect_err("insert must validate the table");

    assert_eq!(error, StorageError::MalformedTableReference("proj.dataset".to_string()));
    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty(), "no request may reach the API for a malformed table");
}

#[test]
fn unknown_scheme_is_unsupported() {
    let error = open_store("ftp://x").expect_err("ftp is not a storage backend");
    assert_eq!(error, StoreConfigError::UnsupportedScheme("ftp".to_string()));
}
