use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::domain::record::{LogRecord, MeasurePolicy};
use crate::domain::reply::{format_reply, ReplyMessage};
use crate::errors::PipelineError;
use crate::message::parse_message;
use crate::ports::{DecorationSource, LogStore};
use crate::timestamp::resolve_timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Validate,
    Parse,
    Timestamp,
    Persist,
    Reply,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Parse => "parse",
            Self::Timestamp => "timestamp",
            Self::Persist => "persist",
            Self::Reply => "reply",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slash-command invocation as handed over by the webhook handler.
#[derive(Clone)]
pub struct RequestInput {
    pub text: String,
    pub user_id: String,
    /// Verification token submitted with the form.
    pub token: String,
    /// Unix-epoch seconds from the request timestamp header.
    pub timestamp: String,
    pub area: String,
    /// Skip the storage call and only log the record.
    pub debug: bool,
}

impl fmt::Debug for RequestInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInput")
            .field("text", &self.text)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("timestamp", &self.timestamp)
            .field("area", &self.area)
            .field("debug", &self.debug)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub token: SecretString,
    pub measure_policy: MeasurePolicy,
}

impl PipelineSettings {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: SecretString::from(token.into()), measure_policy: MeasurePolicy::default() }
    }

    pub fn with_measure_policy(mut self, measure_policy: MeasurePolicy) -> Self {
        self.measure_policy = measure_policy;
        self
    }
}

/// Validates, parses, timestamps, persists and acknowledges one request.
/// Every stage is a hard gate: the first failure is returned as-is.
pub struct RequestPipeline {
    settings: PipelineSettings,
    store: Arc<dyn LogStore>,
    decoration: Option<Arc<dyn DecorationSource>>,
}

impl RequestPipeline {
    pub fn new(settings: PipelineSettings, store: Arc<dyn LogStore>) -> Self {
        Self { settings, store, decoration: None }
    }

    pub fn with_decoration(mut self, decoration: Arc<dyn DecorationSource>) -> Self {
        self.decoration = Some(decoration);
        self
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn process(&self, input: RequestInput) -> Result<ReplyMessage, PipelineError> {
        self.validate(&input)?;
        let (measure, notes) = self.parse(&input.text)?;
        let timestamp = resolve_timestamp(&input.timestamp, &input.area)?;

        let record = LogRecord { timestamp, user_id: input.user_id, measure, notes };
        self.persist(&record, input.debug).await?;

        Ok(self.reply(&record).await)
    }

    fn validate(&self, input: &RequestInput) -> Result<(), PipelineError> {
        verify_token(&input.token, &self.settings.token)?;

        if input.text.trim().is_empty() {
            return Err(PipelineError::EmptyText);
        }
        if input.user_id.trim().is_empty() {
            return Err(PipelineError::MissingUserId);
        }

        Ok(())
    }

    fn parse(&self, text: &str) -> Result<(i64, String), PipelineError> {
        let parsed = parse_message(text).ok_or(PipelineError::EmptyText)?;
        let measure = parsed
            .measure_token
            .parse::<i64>()
            .map_err(|error| PipelineError::invalid_measure(&parsed.measure_token, error))?;

        let policy = self.settings.measure_policy;
        if !policy.accepts(measure) {
            return Err(PipelineError::MeasureOutOfRange { measure, range: policy.to_string() });
        }

        Ok((measure, parsed.notes))
    }

    async fn persist(&self, record: &LogRecord, debug_only: bool) -> Result<(), PipelineError> {
        if debug_only {
            info!(
                event_name = "pipeline.persist.skipped",
                user_id = %record.user_id,
                measure = record.measure,
                timestamp = %record.timestamp.to_rfc3339(),
                notes = %record.notes,
                "debug mode enabled, record not stored"
            );
            return Ok(());
        }

        self.store.insert(record).await.map_err(PipelineError::PersistFailure)?;
        debug!(
            event_name = "pipeline.persist.stored",
            backend = self.store.backend(),
            user_id = %record.user_id,
            "record stored"
        );
        Ok(())
    }

    async fn reply(&self, record: &LogRecord) -> ReplyMessage {
        let decoration = match &self.decoration {
            Some(source) => match source.fetch().await {
                Ok(text) => Some(text),
                Err(error) => {
                    warn!(
                        event_name = "pipeline.reply.decoration_failed",
                        error = %error,
                        "falling back to default acknowledgment"
                    );
                    None
                }
            },
            None => None,
        };

        format_reply(record, decoration.as_deref())
    }
}

/// Compares the submitted webhook token with the configured one in constant time.
pub fn verify_token(submitted: &str, expected: &SecretString) -> Result<(), PipelineError> {
    if submitted.is_empty() {
        return Err(PipelineError::AuthFailure("empty form token".to_owned()));
    }

    let matches: bool = submitted.as_bytes().ct_eq(expected.expose_secret().as_bytes()).into();
    if !matches {
        return Err(PipelineError::AuthFailure("invalid request/credentials".to_owned()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::{verify_token, PipelineSettings, RequestInput, RequestPipeline};
    use crate::domain::record::{LogRecord, MeasurePolicy};
    use crate::domain::reply::FALLBACK_DECORATION;
    use crate::errors::{PipelineError, StorageError, TimestampError};
    use crate::ports::{DecorationError, DecorationSource, LogStore};

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<LogRecord>>,
        fail_with: Option<StorageError>,
    }

    #[async_trait]
    impl LogStore for RecordingStore {
        async fn insert(&self, record: &LogRecord) -> Result<(), StorageError> {
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            self.records.lock().expect("lock").push(record.clone());
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "recording"
        }
    }

    struct FixedDecoration(Result<String, DecorationError>);

    #[async_trait]
    impl DecorationSource for FixedDecoration {
        async fn fetch(&self) -> Result<String, DecorationError> {
            self.0.clone()
        }
    }

    fn input(text: &str, token: &str) -> RequestInput {
        RequestInput {
            text: text.to_owned(),
            user_id: "testUser".to_owned(),
            token: token.to_owned(),
            timestamp: "1579324284".to_owned(),
            area: "Asia/Manila".to_owned(),
            debug: false,
        }
    }

    fn pipeline(store: Arc<RecordingStore>) -> RequestPipeline {
        RequestPipeline::new(PipelineSettings::new("testToken"), store)
    }

    #[tokio::test]
    async fn debug_round_trip_skips_storage() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(store.clone());

        let reply = pipeline
            .process(RequestInput { debug: true, ..input("4 hello world", "testToken") })
            .await
            .expect("pipeline succeeds");

        assert!(reply.text.contains('4'));
        assert!(reply.text.contains("hello world"));
        assert!(store.records.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn stores_exactly_one_localized_record() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(store.clone());

        pipeline.process(input("7 long day", "testToken")).await.expect("pipeline succeeds");

        let records = store.records.lock().expect("lock");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].measure, 7);
        assert_eq!(records[0].notes, "long day");
        assert_eq!(records[0].user_id, "testUser");
        assert_eq!(records[0].timestamp.timestamp(), 1_579_324_284);
        assert_eq!(records[0].timestamp.timezone(), chrono_tz::Tz::Asia__Manila);
    }

    #[tokio::test]
    async fn token_mismatch_is_rejected_before_anything_else() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(store.clone());

        for text in ["4 hello world", "", "A hello world"] {
            let error = pipeline
                .process(RequestInput {
                    timestamp: "03149a".to_owned(),
                    ..input(text, "diffToken")
                })
                .await
                .expect_err("must fail");
            assert!(matches!(error, PipelineError::AuthFailure(_)), "{error}");
        }
        assert!(store.records.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let pipeline = pipeline(Arc::new(RecordingStore::default()));
        let error = pipeline.process(input("   ", "testToken")).await.expect_err("must fail");
        assert_eq!(error, PipelineError::EmptyText);
    }

    #[tokio::test]
    async fn missing_user_is_rejected() {
        let pipeline = pipeline(Arc::new(RecordingStore::default()));
        let error = pipeline
            .process(RequestInput { user_id: String::new(), ..input("4 ok", "testToken") })
            .await
            .expect_err("must fail");
        assert_eq!(error, PipelineError::MissingUserId);
    }

    #[tokio::test]
    async fn non_numeric_measure_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(store.clone());

        let error =
            pipeline.process(input("A hello world", "testToken")).await.expect_err("must fail");

        assert!(matches!(error, PipelineError::InvalidMeasure { ref token, .. } if token == "A"));
        assert!(store.records.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn measure_policy_bounds_are_enforced_when_configured() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = RequestPipeline::new(
            PipelineSettings::new("testToken").with_measure_policy(MeasurePolicy::bounded(1, 10)),
            store.clone(),
        );

        for text in ["100 too much", "-100 too little", "0"] {
            let error = pipeline.process(input(text, "testToken")).await.expect_err("must fail");
            assert!(matches!(error, PipelineError::MeasureOutOfRange { .. }), "{error}");
        }
        pipeline.process(input("10 fine", "testToken")).await.expect("in range");
        assert_eq!(store.records.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn unbounded_policy_accepts_large_measures() {
        let pipeline = pipeline(Arc::new(RecordingStore::default()));
        let reply = pipeline.process(input("100 wow", "testToken")).await.expect("accepted");
        assert_eq!(reply.text, "Received: 100 (wow)");
    }

    #[tokio::test]
    async fn timestamp_failures_propagate() {
        let pipeline = pipeline(Arc::new(RecordingStore::default()));

        let error = pipeline
            .process(RequestInput { timestamp: "03149a".to_owned(), ..input("4 ok", "testToken") })
            .await
            .expect_err("must fail");
        assert!(matches!(error, PipelineError::Timestamp(TimestampError::InvalidTimestamp { .. })));

        let error = pipeline
            .process(RequestInput {
                area: "Europe/Manila".to_owned(),
                ..input("4 ok", "testToken")
            })
            .await
            .expect_err("must fail");
        assert!(matches!(error, PipelineError::Timestamp(TimestampError::UnknownArea(_))));
    }

    #[tokio::test]
    async fn storage_failure_becomes_persist_failure() {
        let store = Arc::new(RecordingStore {
            fail_with: Some(StorageError::MalformedTableReference("proj.dataset".to_owned())),
            ..RecordingStore::default()
        });
        let pipeline = pipeline(store);

        let error = pipeline.process(input("4 ok", "testToken")).await.expect_err("must fail");
        assert!(matches!(
            error,
            PipelineError::PersistFailure(StorageError::MalformedTableReference(_))
        ));
    }

    #[tokio::test]
    async fn decoration_is_used_when_available() {
        let pipeline = pipeline(Arc::new(RecordingStore::default()))
            .with_decoration(Arc::new(FixedDecoration(Ok("Keep going.".to_owned()))));

        let reply = pipeline.process(input("5", "testToken")).await.expect("succeeds");
        assert_eq!(reply.attachments[0].text, "Keep going.");
        assert_eq!(reply.text, "Received: 5 ()");
    }

    #[tokio::test]
    async fn decoration_failure_falls_back() {
        let pipeline = pipeline(Arc::new(RecordingStore::default()))
            .with_decoration(Arc::new(FixedDecoration(Err(DecorationError::Status(429)))));

        let reply = pipeline.process(input("5 ok", "testToken")).await.expect("succeeds");
        assert_eq!(reply.attachments[0].text, FALLBACK_DECORATION);
    }

    #[test]
    fn token_check_is_exact() {
        let expected = SecretString::from("sampleToken".to_owned());
        assert!(verify_token("sampleToken", &expected).is_ok());
        assert!(verify_token("notSampleToken", &expected).is_err());
        assert!(verify_token("sampleToke", &expected).is_err());
        assert!(verify_token("", &expected).is_err());
    }
}
