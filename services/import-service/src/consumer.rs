use crate::config::{QueueConfig, S3Config};
use crate::csv_parser::{self, ParseError};
use crate::events::{decode_object_key, S3Event, S3EventRecord};
use crate::s3_store::{relocation_target, ImportStore, ObjectOps};
use anyhow::{bail, Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_sqs::types::Message;
use aws_sdk_sqs::Client as SqsClient;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Failure of one record's import, tagged by stage.
///
/// Any variant triggers the best-effort move to the error area; the variant
/// itself is what gets propagated as the record's failure.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to fetch object content: {0:#}")]
    Fetch(anyhow::Error),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("failed to relocate object: {0:#}")]
    Relocation(anyhow::Error),
}

/// The parse-and-relocate pipeline for uploaded CSV files.
///
/// Operates on whichever bucket each event record names. Records within an
/// event are processed concurrently and independently: a failed record fails
/// the event, but successful relocations are never rolled back.
pub struct ImportPipeline {
    store: Arc<dyn ObjectOps>,
    uploaded_prefix: String,
    processed_prefix: String,
    error_prefix: String,
    record_concurrency: usize,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn ObjectOps>, s3: &S3Config, record_concurrency: usize) -> Self {
        Self {
            store,
            uploaded_prefix: s3.uploaded_prefix.clone(),
            processed_prefix: s3.processed_prefix.clone(),
            error_prefix: s3.error_prefix.clone(),
            record_concurrency,
        }
    }

    /// Process all records of one event concurrently.
    pub async fn process_event(&self, event: S3Event) -> Result<()> {
        let total = event.records.len();

        let record_futures: Vec<_> = event
            .records
            .iter()
            .map(|record| self.process_record(record))
            .collect();
        let failures: Vec<ImportError> = stream::iter(record_futures)
            .buffer_unordered(self.record_concurrency.max(1))
            .filter_map(|result| async move { result.err() })
            .collect()
            .await;

        if failures.is_empty() {
            info!(records = total, "Successfully processed all files");
            Ok(())
        } else {
            bail!(
                "{} of {} records failed, first error: {}",
                failures.len(),
                total,
                failures[0]
            );
        }
    }

    /// Process one object record: fetch, parse, relocate.
    ///
    /// On failure the object is moved to the error area best-effort; a
    /// failure of that secondary move is logged and discarded so the primary
    /// error is always the one propagated.
    #[instrument(skip(self, record), fields(bucket = %record.s3.bucket.name))]
    async fn process_record(&self, record: &S3EventRecord) -> Result<(), ImportError> {
        let bucket = record.s3.bucket.name.as_str();
        let key = decode_object_key(&record.s3.object.key);
        info!(key = %key, "Processing uploaded file");

        match self.import_and_relocate(bucket, &key).await {
            Ok(parsed) => {
                info!(key = %key, parsed, "Successfully processed and moved file");
                metrics::counter!("import.files.processed").increment(1);
                Ok(())
            }
            Err(primary) => {
                error!(error = %primary, key = %key, "Import failed");
                metrics::counter!("import.files.failed").increment(1);

                let error_key =
                    relocation_target(&key, &self.uploaded_prefix, &self.error_prefix);
                match self.store.relocate(bucket, &key, &error_key).await {
                    Ok(()) => info!(key = %error_key, "Moved failed file to error area"),
                    Err(move_err) => {
                        // The original stays put; an operator has to step in
                        error!(error = %move_err, key = %key, "Failed to move file to error area")
                    }
                }

                Err(primary)
            }
        }
    }

    /// The happy path for one object: fetch its text, parse it, move it to
    /// the processed area.
    async fn import_and_relocate(&self, bucket: &str, key: &str) -> Result<usize, ImportError> {
        let content = self
            .store
            .get_object_text(bucket, key)
            .await
            .map_err(ImportError::Fetch)?;

        let records = csv_parser::parse_products(&content)?;
        info!(key = %key, count = records.len(), "Parsed product records");

        for product in &records {
            // TODO: persist parsed products through the products API create path
            debug!(product = ?product, "Parsed product");
        }
        metrics::counter!("import.records.parsed").increment(records.len() as u64);

        let processed_key = relocation_target(key, &self.uploaded_prefix, &self.processed_prefix);
        self.store
            .relocate(bucket, key, &processed_key)
            .await
            .map_err(ImportError::Relocation)?;

        Ok(records.len())
    }
}

/// Consumer of S3 object-created notifications for the import pipeline.
///
/// Each queue message carries one S3 event with one or more object records.
/// The message is deleted from the queue only when every record succeeded, so
/// a partly failed event is redelivered per the queue's own policy.
pub struct ImportConsumer {
    sqs: SqsClient,
    queue: QueueConfig,
    pipeline: ImportPipeline,
}

impl ImportConsumer {
    /// Create a new consumer bound to the configured notification queue.
    pub async fn new(
        queue: &QueueConfig,
        s3: &S3Config,
        store: Arc<ImportStore>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(s3.region.clone()));

        if let Some(ref endpoint_url) = s3.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;
        let sqs = SqsClient::new(&sdk_config);

        info!(queue_url = %queue.queue_url, "Import consumer initialized");

        Ok(Self {
            sqs,
            queue: queue.clone(),
            pipeline: ImportPipeline::new(store, s3, queue.record_concurrency),
        })
    }

    /// Start consuming and processing notifications.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        info!("Starting import consumer");

        loop {
            let received = self
                .sqs
                .receive_message()
                .queue_url(&self.queue.queue_url)
                .wait_time_seconds(self.queue.wait_time_secs)
                .max_number_of_messages(self.queue.max_messages)
                .send()
                .await;

            let messages = match received {
                Ok(output) => output.messages.unwrap_or_default(),
                Err(e) => {
                    error!(error = %e, "Failed to receive from notification queue");
                    metrics::counter!("import.queue.errors").increment(1);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for message in messages {
                match self.process_message(&message).await {
                    Ok(()) => {
                        self.delete_message(&message).await;
                        metrics::counter!("import.messages.processed").increment(1);
                    }
                    Err(e) => {
                        // Leave the message for redelivery
                        error!(error = %e, "Failed to process notification");
                        metrics::counter!("import.messages.failed").increment(1);
                    }
                }
            }
        }
    }

    /// Process a single queue message carrying one S3 event.
    async fn process_message(&self, message: &Message) -> Result<()> {
        let body = message.body().context("Message has no payload")?;

        let event: S3Event =
            serde_json::from_str(body).context("Failed to deserialize S3 event")?;

        if event.records.is_empty() {
            warn!("S3 event carried no records");
            return Ok(());
        }

        self.pipeline.process_event(event).await
    }

    async fn delete_message(&self, message: &Message) {
        let Some(receipt_handle) = message.receipt_handle() else {
            warn!("Processed message has no receipt handle");
            return;
        };

        if let Err(e) = self
            .sqs
            .delete_message()
            .queue_url(&self.queue.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
        {
            warn!(error = %e, "Failed to delete processed message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{S3Bucket, S3Entity, S3Object};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const VALID_CSV: &str = "id,title,description,price,count\np-1,Widget,desc,9.99,3\n";
    const HEADER_ONLY_CSV: &str = "id,title,description,price,count\n";

    /// In-memory bucket standing in for S3.
    #[derive(Default)]
    struct FakeStore {
        objects: Mutex<HashMap<String, String>>,
        buckets_seen: Mutex<Vec<String>>,
        /// Relocations to keys starting with any of these prefixes fail
        fail_relocations_to: Vec<&'static str>,
    }

    impl FakeStore {
        fn with_object(key: &str, content: &str) -> Self {
            let store = Self::default();
            store
                .objects
                .lock()
                .unwrap()
                .insert(key.to_string(), content.to_string());
            store
        }

        fn has_object(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }
    }

    #[async_trait]
    impl ObjectOps for FakeStore {
        async fn get_object_text(&self, bucket: &str, key: &str) -> Result<String> {
            self.buckets_seen.lock().unwrap().push(bucket.to_string());
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such key: {key}"))
        }

        async fn relocate(&self, bucket: &str, from_key: &str, to_key: &str) -> Result<()> {
            self.buckets_seen.lock().unwrap().push(bucket.to_string());
            if self
                .fail_relocations_to
                .iter()
                .any(|prefix| to_key.starts_with(prefix))
            {
                anyhow::bail!("relocation to {to_key} refused");
            }

            let mut objects = self.objects.lock().unwrap();
            let content = objects
                .remove(from_key)
                .ok_or_else(|| anyhow::anyhow!("no such key: {from_key}"))?;
            objects.insert(to_key.to_string(), content);
            Ok(())
        }
    }

    fn pipeline(store: Arc<FakeStore>) -> ImportPipeline {
        ImportPipeline {
            store,
            uploaded_prefix: "uploaded/".to_string(),
            processed_prefix: "processed/".to_string(),
            error_prefix: "error/".to_string(),
            record_concurrency: 2,
        }
    }

    fn record(bucket: &str, key: &str) -> S3EventRecord {
        S3EventRecord {
            s3: S3Entity {
                bucket: S3Bucket {
                    name: bucket.to_string(),
                },
                object: S3Object {
                    key: key.to_string(),
                },
            },
        }
    }

    #[tokio::test]
    async fn successful_import_moves_the_object_to_processed() {
        let store = Arc::new(FakeStore::with_object("uploaded/a.csv", VALID_CSV));
        let pipeline = pipeline(store.clone());

        let result = pipeline
            .process_record(&record("import-bucket", "uploaded/a.csv"))
            .await;

        assert!(result.is_ok());
        assert!(!store.has_object("uploaded/a.csv"));
        assert!(store.has_object("processed/a.csv"));
    }

    #[tokio::test]
    async fn parse_failure_moves_the_object_to_error() {
        let store = Arc::new(FakeStore::with_object("uploaded/b.csv", HEADER_ONLY_CSV));
        let pipeline = pipeline(store.clone());

        let err = pipeline
            .process_record(&record("import-bucket", "uploaded/b.csv"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Parse(ParseError::Empty)));
        assert!(!store.has_object("uploaded/b.csv"));
        assert!(store.has_object("error/b.csv"));
        assert!(!store.has_object("processed/b.csv"));
    }

    #[tokio::test]
    async fn failed_error_move_keeps_the_original_and_the_primary_error() {
        let mut store = FakeStore::with_object("uploaded/b.csv", HEADER_ONLY_CSV);
        store.fail_relocations_to = vec!["error/"];
        let store = Arc::new(store);
        let pipeline = pipeline(store.clone());

        let err = pipeline
            .process_record(&record("import-bucket", "uploaded/b.csv"))
            .await
            .unwrap_err();

        // The parse failure is what propagates, not the failed cleanup
        assert!(matches!(err, ImportError::Parse(ParseError::Empty)));
        assert!(store.has_object("uploaded/b.csv"));
        assert!(!store.has_object("error/b.csv"));
    }

    #[tokio::test]
    async fn relocation_failure_after_a_clean_parse_falls_back_to_error() {
        let mut store = FakeStore::with_object("uploaded/a.csv", VALID_CSV);
        store.fail_relocations_to = vec!["processed/"];
        let store = Arc::new(store);
        let pipeline = pipeline(store.clone());

        let err = pipeline
            .process_record(&record("import-bucket", "uploaded/a.csv"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Relocation(_)));
        assert!(!store.has_object("uploaded/a.csv"));
        assert!(store.has_object("error/a.csv"));
    }

    #[tokio::test]
    async fn every_operation_targets_the_bucket_named_by_the_event() {
        let store = Arc::new(FakeStore::with_object("uploaded/a.csv", VALID_CSV));
        let pipeline = pipeline(store.clone());

        pipeline
            .process_record(&record("some-other-bucket", "uploaded/a.csv"))
            .await
            .unwrap();

        let buckets = store.buckets_seen.lock().unwrap();
        assert!(!buckets.is_empty());
        assert!(buckets.iter().all(|b| b == "some-other-bucket"));
    }

    #[tokio::test]
    async fn event_keys_are_decoded_before_fetching() {
        let store = Arc::new(FakeStore::with_object("uploaded/spring catalog.csv", VALID_CSV));
        let pipeline = pipeline(store.clone());

        let result = pipeline
            .process_record(&record("import-bucket", "uploaded/spring+catalog.csv"))
            .await;

        assert!(result.is_ok());
        assert!(store.has_object("processed/spring catalog.csv"));
    }

    #[tokio::test]
    async fn one_failed_record_fails_the_event_without_rolling_back_the_rest() {
        let store = Arc::new(FakeStore::with_object("uploaded/good.csv", VALID_CSV));
        store
            .objects
            .lock()
            .unwrap()
            .insert("uploaded/bad.csv".to_string(), HEADER_ONLY_CSV.to_string());
        let pipeline = pipeline(store.clone());

        let event = S3Event {
            records: vec![
                record("import-bucket", "uploaded/good.csv"),
                record("import-bucket", "uploaded/bad.csv"),
            ],
        };

        let result = pipeline.process_event(event).await;

        assert!(result.is_err());
        assert!(store.has_object("processed/good.csv"));
        assert!(store.has_object("error/bad.csv"));
        assert!(!store.has_object("uploaded/good.csv"));
        assert!(!store.has_object("uploaded/bad.csv"));
    }

    #[test]
    fn parse_errors_convert_into_import_errors() {
        let err: ImportError = csv_parser::parse_products("").unwrap_err().into();
        assert!(matches!(err, ImportError::Parse(ParseError::Empty)));
        assert_eq!(err.to_string(), "CSV file is empty or has no data rows");
    }

    #[test]
    fn fetch_errors_name_their_stage() {
        let err = ImportError::Fetch(anyhow::anyhow!("timed out"));
        assert!(err.to_string().starts_with("failed to fetch object content"));
    }
}
