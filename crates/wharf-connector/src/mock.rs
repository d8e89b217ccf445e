//! Mock warehouse backend for testing
//!
//! Keeps datasets, tables and load jobs in memory and mimics the remote
//! service's observable behavior: NotFound for missing resources,
//! AlreadyExists on duplicate creates, stale-etag rejection on
//! concurrent updates, duplicate-column rejection on schema updates, and
//! create-disposition enforcement on loads. Failure injection covers the
//! transport paths the real service can break on.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wharf_connector::{MockWarehouse, FieldSchema, FieldType};
//!
//! let mock = MockWarehouse::new();
//! mock.add_dataset("analytics").await;
//! mock.add_table("events", vec![FieldSchema::new("id", FieldType::String)]).await;
//!
//! // Simulate a transport failure while a load job is polled
//! let mock = MockWarehouse::new().with_wait_failure();
//! ```

use crate::api::{
    ApiError, DatasetMetadata, FieldSchema, JobHandle, JobStatus, LoadJob, TableMetadata,
    WarehouseApi,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MockTable {
    fields: Vec<FieldSchema>,
    etag: String,
}

/// In-memory warehouse backend
pub struct MockWarehouse {
    datasets: Arc<RwLock<HashSet<String>>>,
    tables: Arc<RwLock<HashMap<String, MockTable>>>,

    /// Terminal status per submitted job id
    jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Forced job failure detail per destination table
    job_errors: Arc<RwLock<HashMap<String, String>>>,

    counter: Arc<AtomicU64>,

    /// One-shot: reject the next schema update as stale
    conflict_next_update: Arc<AtomicBool>,

    fail_submit: bool,
    fail_wait: bool,
    fail_close: bool,
}

impl MockWarehouse {
    /// Create an empty mock with no datasets or tables
    pub fn new() -> Self {
        Self {
            datasets: Arc::new(RwLock::new(HashSet::new())),
            tables: Arc::new(RwLock::new(HashMap::new())),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            job_errors: Arc::new(RwLock::new(HashMap::new())),
            counter: Arc::new(AtomicU64::new(0)),
            conflict_next_update: Arc::new(AtomicBool::new(false)),
            fail_submit: false,
            fail_wait: false,
            fail_close: false,
        }
    }

    /// Seed a dataset
    pub async fn add_dataset(&self, name: &str) {
        self.datasets.write().await.insert(name.to_string());
    }

    /// Seed a table with the given fields
    pub async fn add_table(&self, name: &str, fields: Vec<FieldSchema>) {
        let etag = self.next_etag();
        self.tables
            .write()
            .await
            .insert(name.to_string(), MockTable { fields, etag });
    }

    /// Reject the next schema update as stale, as if another writer
    /// landed between the caller's metadata fetch and its update
    pub fn force_conflict_on_next_update(&self) {
        self.conflict_next_update.store(true, Ordering::SeqCst);
    }

    /// Force every load into `table` to finish with this failure detail
    pub async fn set_job_error(&self, table: &str, detail: &str) {
        self.job_errors
            .write()
            .await
            .insert(table.to_string(), detail.to_string());
    }

    /// Fail all load submissions with a transport error
    pub fn with_submit_failure(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    /// Fail all load waits with a transport error
    pub fn with_wait_failure(mut self) -> Self {
        self.fail_wait = true;
        self
    }

    /// Fail `close` with a service error
    pub fn with_close_failure(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// True when the dataset was created or seeded
    pub async fn dataset_exists(&self, name: &str) -> bool {
        self.datasets.read().await.contains(name)
    }

    /// Current field list of a table, if present
    pub async fn table_fields(&self, name: &str) -> Option<Vec<FieldSchema>> {
        self.tables.read().await.get(name).map(|t| t.fields.clone())
    }

    /// Current etag of a table, if present
    pub async fn current_etag(&self, name: &str) -> Option<String> {
        self.tables.read().await.get(name).map(|t| t.etag.clone())
    }

    /// Number of load jobs accepted so far
    pub async fn submitted_job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    fn next_etag(&self) -> String {
        format!("etag-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockWarehouse {
    fn clone(&self) -> Self {
        Self {
            datasets: Arc::clone(&self.datasets),
            tables: Arc::clone(&self.tables),
            jobs: Arc::clone(&self.jobs),
            job_errors: Arc::clone(&self.job_errors),
            counter: Arc::clone(&self.counter),
            conflict_next_update: Arc::clone(&self.conflict_next_update),
            fail_submit: self.fail_submit,
            fail_wait: self.fail_wait,
            fail_close: self.fail_close,
        }
    }
}

#[async_trait]
impl WarehouseApi for MockWarehouse {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn dataset_metadata(&self, dataset: &str) -> Result<DatasetMetadata, ApiError> {
        if self.datasets.read().await.contains(dataset) {
            Ok(DatasetMetadata {
                name: dataset.to_string(),
            })
        } else {
            Err(ApiError::NotFound(format!("dataset {dataset}")))
        }
    }

    async fn create_dataset(&self, dataset: &str) -> Result<(), ApiError> {
        let mut datasets = self.datasets.write().await;
        if !datasets.insert(dataset.to_string()) {
            return Err(ApiError::AlreadyExists(format!("dataset {dataset}")));
        }
        Ok(())
    }

    async fn table_metadata(&self, table: &str) -> Result<TableMetadata, ApiError> {
        match self.tables.read().await.get(table) {
            Some(t) => Ok(TableMetadata {
                name: table.to_string(),
                fields: t.fields.clone(),
                etag: t.etag.clone(),
            }),
            None => Err(ApiError::NotFound(format!("table {table}"))),
        }
    }

    async fn create_table(&self, table: &str, fields: &[FieldSchema]) -> Result<(), ApiError> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            return Err(ApiError::AlreadyExists(format!("table {table}")));
        }
        tables.insert(
            table.to_string(),
            MockTable {
                fields: fields.to_vec(),
                etag: self.next_etag(),
            },
        );
        Ok(())
    }

    async fn update_table_schema(
        &self,
        table: &str,
        fields: &[FieldSchema],
        etag: &str,
    ) -> Result<(), ApiError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| ApiError::NotFound(format!("table {table}")))?;

        if self.conflict_next_update.swap(false, Ordering::SeqCst) {
            entry.etag = self.next_etag();
            return Err(ApiError::StaleEtag(format!("table {table}: etag expired")));
        }

        if entry.etag != etag {
            return Err(ApiError::StaleEtag(format!(
                "table {table}: expected {}, got {etag}",
                entry.etag
            )));
        }

        // The real service rejects duplicate field names in an update.
        let mut seen = HashSet::new();
        for field in fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ApiError::Service(format!(
                    "field {} already exists in schema of table {table}",
                    field.name
                )));
            }
        }

        entry.fields = fields.to_vec();
        entry.etag = self.next_etag();
        Ok(())
    }

    async fn submit_load(&self, job: &LoadJob) -> Result<JobHandle, ApiError> {
        if self.fail_submit {
            return Err(ApiError::Transport("simulated submit failure".to_string()));
        }

        let status = if let Some(detail) = self.job_errors.read().await.get(&job.destination_table)
        {
            JobStatus::failed(detail.clone())
        } else if !self.tables.read().await.contains_key(&job.destination_table) {
            // CREATE_NEVER: the job runs but fails on the missing table.
            JobStatus::failed(format!("Not found: Table {}", job.destination_table))
        } else {
            JobStatus::ok()
        };

        let id = format!("job-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        self.jobs.write().await.insert(id.clone(), status);
        Ok(JobHandle { id, location: None })
    }

    async fn wait_load(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        if self.fail_wait {
            return Err(ApiError::Transport("simulated wait failure".to_string()));
        }
        self.jobs
            .read()
            .await
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("job {}", handle.id)))
    }

    async fn close(&self) -> Result<(), ApiError> {
        if self.fail_close {
            return Err(ApiError::Service("simulated close failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FieldType;

    #[tokio::test]
    async fn dataset_lifecycle() {
        let mock = MockWarehouse::new();
        assert!(mock.dataset_metadata("analytics").await.is_err());

        mock.create_dataset("analytics").await.unwrap();
        assert!(mock.dataset_metadata("analytics").await.is_ok());

        let dup = mock.create_dataset("analytics").await;
        assert!(matches!(dup, Err(ApiError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn update_rotates_etag() {
        let mock = MockWarehouse::new();
        mock.add_table("events", vec![FieldSchema::new("id", FieldType::String)])
            .await;

        let before = mock.current_etag("events").await.unwrap();
        let fields = vec![
            FieldSchema::new("id", FieldType::String),
            FieldSchema::new("ts", FieldType::Timestamp),
        ];
        mock.update_table_schema("events", &fields, &before)
            .await
            .unwrap();

        let after = mock.current_etag("events").await.unwrap();
        assert_ne!(before, after);

        // The old etag no longer works.
        let stale = mock.update_table_schema("events", &fields, &before).await;
        assert!(matches!(stale, Err(ApiError::StaleEtag(_))));
    }

    #[tokio::test]
    async fn forced_conflict_fires_once() {
        let mock = MockWarehouse::new();
        mock.add_table("events", vec![FieldSchema::new("id", FieldType::String)])
            .await;
        mock.force_conflict_on_next_update();

        let fields = vec![FieldSchema::new("id", FieldType::String)];
        let etag = mock.current_etag("events").await.unwrap();
        let first = mock.update_table_schema("events", &fields, &etag).await;
        assert!(matches!(first, Err(ApiError::StaleEtag(_))));

        // The injected writer rotated the etag; a fresh fetch succeeds.
        let etag = mock.current_etag("events").await.unwrap();
        mock.update_table_schema("events", &fields, &etag)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_rejects_duplicate_field_names() {
        let mock = MockWarehouse::new();
        mock.add_table("events", vec![FieldSchema::new("id", FieldType::String)])
            .await;

        let etag = mock.current_etag("events").await.unwrap();
        let fields = vec![
            FieldSchema::new("id", FieldType::String),
            FieldSchema::new("id", FieldType::String),
        ];
        let result = mock.update_table_schema("events", &fields, &etag).await;
        assert!(matches!(result, Err(ApiError::Service(_))));
    }

    #[tokio::test]
    async fn load_into_missing_table_fails_at_terminal_state() {
        let mock = MockWarehouse::new();
        let job = LoadJob::new("gs://bucket/key.json", "ghost");

        let handle = mock.submit_load(&job).await.unwrap();
        let status = mock.wait_load(&handle).await.unwrap();
        assert!(status.error_detail.unwrap().contains("Not found"));
    }

    #[tokio::test]
    async fn failure_injection() {
        let mock = MockWarehouse::new().with_submit_failure();
        let job = LoadJob::new("gs://bucket/key.json", "events");
        assert!(matches!(
            mock.submit_load(&job).await,
            Err(ApiError::Transport(_))
        ));

        let mock = MockWarehouse::new().with_wait_failure();
        mock.add_table("events", vec![]).await;
        let handle = mock
            .submit_load(&LoadJob::new("gs://bucket/key.json", "events"))
            .await
            .unwrap();
        assert!(matches!(
            mock.wait_load(&handle).await,
            Err(ApiError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockWarehouse::new();
        let cloned = mock.clone();

        mock.add_dataset("analytics").await;
        assert!(cloned.dataset_exists("analytics").await);
    }
}
