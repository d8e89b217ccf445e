//! BigQuery warehouse backend
//!
//! Implements [`WarehouseApi`] over the BigQuery REST API. Requires IAM
//! permissions for dataset/table metadata and creation
//! (`bigquery.datasets.*`, `bigquery.tables.*`) plus `bigquery.jobs.create`
//! for loads, and read access to the staging bucket.
//!
//! ## Authentication
//!
//! 1. Service account JSON content (inline)
//! 2. Service account key file (path)
//!
//! Which one applies is decided by the caller's credential payload, see
//! [`wharf_core::config::looks_like_inline_json`].
//!
//! Reference: https://cloud.google.com/bigquery/docs/reference/rest

use crate::api::{
    ApiError, DatasetMetadata, FieldSchema, FieldType, JobHandle, JobStatus, LoadJob,
    TableMetadata, WarehouseApi,
};
use crate::session::ConnectionError;
use async_trait::async_trait;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::{
    dataset::Dataset, error_proto::ErrorProto, field_type, job::Job,
    job_configuration::JobConfiguration, job_configuration_load::JobConfigurationLoad,
    table::Table, table_field_schema::TableFieldSchema, table_reference::TableReference,
    table_schema::TableSchema,
};
use gcp_bigquery_client::Client;
use std::time::Duration;
use tracing::{debug, warn};
use wharf_core::{ConnectorConfig, Credential};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// BigQuery backend for one project/dataset
pub struct BigQueryWarehouse {
    client: Client,
    project_id: String,
    dataset: String,
}

impl BigQueryWarehouse {
    /// Authenticate and open a client for the configured project
    pub async fn connect(config: &ConnectorConfig) -> Result<Self, ConnectionError> {
        let client = match config.credential() {
            Credential::InlineJson(json) => {
                let key: gcp_bigquery_client::yup_oauth2::ServiceAccountKey =
                    serde_json::from_str(&json).map_err(|e| {
                        ConnectionError::Open(format!("invalid service account JSON: {e}"))
                    })?;
                Client::from_service_account_key(key, false)
                    .await
                    .map_err(|e| ConnectionError::Open(e.to_string()))?
            }
            Credential::KeyFile(path) => {
                Client::from_service_account_key_file(&path.to_string_lossy())
                    .await
                    .map_err(|e| ConnectionError::Open(e.to_string()))?
            }
        };

        Ok(Self {
            client,
            project_id: config.project_id.clone(),
            dataset: config.dataset.clone(),
        })
    }

    fn table_reference(&self, table: &str) -> TableReference {
        TableReference::new(&self.project_id, &self.dataset, table)
    }
}

#[async_trait]
impl WarehouseApi for BigQueryWarehouse {
    fn name(&self) -> &'static str {
        "BigQuery"
    }

    async fn dataset_metadata(&self, dataset: &str) -> Result<DatasetMetadata, ApiError> {
        self.client
            .dataset()
            .get(&self.project_id, dataset)
            .await
            .map_err(translate_error)?;
        Ok(DatasetMetadata {
            name: dataset.to_string(),
        })
    }

    async fn create_dataset(&self, dataset: &str) -> Result<(), ApiError> {
        self.client
            .dataset()
            .create(Dataset::new(&self.project_id, dataset))
            .await
            .map_err(translate_error)?;
        Ok(())
    }

    async fn table_metadata(&self, table: &str) -> Result<TableMetadata, ApiError> {
        let remote = self
            .client
            .table()
            .get(&self.project_id, &self.dataset, table, None)
            .await
            .map_err(translate_error)?;

        let fields = remote
            .schema
            .fields
            .unwrap_or_default()
            .into_iter()
            .map(|f| FieldSchema {
                field_type: from_vendor_type(&f.r#type),
                name: f.name,
            })
            .collect();

        Ok(TableMetadata {
            name: table.to_string(),
            fields,
            etag: remote.etag.unwrap_or_default(),
        })
    }

    async fn create_table(&self, table: &str, fields: &[FieldSchema]) -> Result<(), ApiError> {
        let schema = TableSchema::new(fields.iter().map(to_vendor_field).collect());
        self.client
            .table()
            .create(Table::new(&self.project_id, &self.dataset, table, schema))
            .await
            .map_err(translate_error)?;
        Ok(())
    }

    async fn update_table_schema(
        &self,
        table: &str,
        fields: &[FieldSchema],
        etag: &str,
    ) -> Result<(), ApiError> {
        let schema = TableSchema::new(fields.iter().map(to_vendor_field).collect());
        let mut update = Table::new(&self.project_id, &self.dataset, table, schema);
        // Conditions the update on the previously fetched version.
        update.etag = Some(etag.to_string());

        self.client
            .table()
            .update(&self.project_id, &self.dataset, table, update)
            .await
            .map_err(translate_error)?;
        Ok(())
    }

    async fn submit_load(&self, job: &LoadJob) -> Result<JobHandle, ApiError> {
        let load = JobConfigurationLoad {
            source_uris: Some(vec![job.source_uri.clone()]),
            destination_table: Some(self.table_reference(&job.destination_table)),
            source_format: Some(LoadJob::SOURCE_FORMAT.to_string()),
            create_disposition: Some(LoadJob::CREATE_DISPOSITION.to_string()),
            ..Default::default()
        };
        let submitted = Job {
            configuration: Some(JobConfiguration {
                load: Some(load),
                ..Default::default()
            }),
            ..Default::default()
        };

        let inserted = self
            .client
            .job()
            .insert(&self.project_id, submitted)
            .await
            .map_err(translate_error)?;

        let reference = inserted
            .job_reference
            .ok_or_else(|| ApiError::Service("load job accepted without a reference".into()))?;
        let id = reference
            .job_id
            .ok_or_else(|| ApiError::Service("load job accepted without an id".into()))?;

        debug!(job_id = %id, table = %job.destination_table, "load job submitted");
        Ok(JobHandle {
            id,
            location: reference.location,
        })
    }

    async fn wait_load(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        loop {
            let job = self
                .client
                .job()
                .get_job(&self.project_id, &handle.id, handle.location.as_deref())
                .await
                .map_err(translate_error)?;

            let status = job
                .status
                .ok_or_else(|| ApiError::Service(format!("job {} has no status", handle.id)))?;

            if status.state.as_deref() == Some("DONE") {
                return Ok(JobStatus {
                    error_detail: status.error_result.map(|e| describe_error_proto(&e)),
                });
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&self) -> Result<(), ApiError> {
        // The underlying HTTP pool is released on drop; nothing to flush.
        debug!(dataset = %self.dataset, "closing BigQuery backend");
        Ok(())
    }
}

fn to_vendor_field(field: &FieldSchema) -> TableFieldSchema {
    TableFieldSchema::new(&field.name, to_vendor_type(field.field_type))
}

fn to_vendor_type(field_type: FieldType) -> field_type::FieldType {
    match field_type {
        FieldType::String => field_type::FieldType::String,
        FieldType::Bytes => field_type::FieldType::Bytes,
        FieldType::Integer => field_type::FieldType::Integer,
        FieldType::Float => field_type::FieldType::Float,
        FieldType::Numeric => field_type::FieldType::Numeric,
        FieldType::Boolean => field_type::FieldType::Boolean,
        FieldType::Timestamp => field_type::FieldType::Timestamp,
        FieldType::Date => field_type::FieldType::Date,
        FieldType::Time => field_type::FieldType::Time,
        FieldType::DateTime => field_type::FieldType::Datetime,
        FieldType::Geography => field_type::FieldType::Geography,
        FieldType::Json => field_type::FieldType::Json,
        FieldType::Record => field_type::FieldType::Record,
    }
}

fn from_vendor_type(field_type: &field_type::FieldType) -> FieldType {
    match field_type {
        field_type::FieldType::String => FieldType::String,
        field_type::FieldType::Bytes => FieldType::Bytes,
        field_type::FieldType::Integer | field_type::FieldType::Int64 => FieldType::Integer,
        field_type::FieldType::Float | field_type::FieldType::Float64 => FieldType::Float,
        field_type::FieldType::Numeric | field_type::FieldType::Bignumeric => FieldType::Numeric,
        field_type::FieldType::Boolean | field_type::FieldType::Bool => FieldType::Boolean,
        field_type::FieldType::Timestamp => FieldType::Timestamp,
        field_type::FieldType::Date => FieldType::Date,
        field_type::FieldType::Time => FieldType::Time,
        field_type::FieldType::Datetime => FieldType::DateTime,
        field_type::FieldType::Geography => FieldType::Geography,
        field_type::FieldType::Json => FieldType::Json,
        field_type::FieldType::Record | field_type::FieldType::Struct => FieldType::Record,
        other => {
            warn!(?other, "unrecognized column type in table metadata");
            FieldType::String
        }
    }
}

fn describe_error_proto(error: &ErrorProto) -> String {
    match (&error.reason, &error.message) {
        (Some(reason), Some(message)) => format!("{reason}: {message}"),
        (None, Some(message)) => message.clone(),
        _ => format!("{error:?}"),
    }
}

/// Translate the SDK's error shapes into [`ApiError`]
///
/// BigQuery's useful signal is in the response message text
/// ("Not found: …", "Already Exists: …"), so classification keys on it;
/// request-level failures are the transport class.
fn translate_error(err: BQError) -> ApiError {
    let text = err.to_string();
    match err {
        BQError::RequestError(_) => ApiError::Transport(text),
        _ if text.contains("Not found") || text.contains("notFound") => ApiError::NotFound(text),
        _ if text.contains("Already Exists") || text.contains("duplicate") => {
            ApiError::AlreadyExists(text)
        }
        _ if text.contains("Precondition") || text.contains("conditionNotMet") => {
            ApiError::StaleEtag(text)
        }
        _ if text.contains("Access Denied")
            || text.contains("Permission")
            || text.contains("Unauthorized")
            || text.contains("invalid_grant") =>
        {
            ApiError::Auth(text)
        }
        _ => ApiError::Service(text),
    }
}
