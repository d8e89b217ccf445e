//! Warehouse service trait and wire-level types
//!
//! Everything the reconciler and loader need from the remote warehouse
//! goes through [`WarehouseApi`], so the real BigQuery backend and the
//! in-memory mock are interchangeable. Vendor error shapes are
//! translated into [`ApiError`] at the backend boundary; nothing above
//! it inspects status codes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BigQuery native column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Bytes,
    Integer,
    Float,
    Numeric,
    Boolean,
    Timestamp,
    Date,
    Time,
    DateTime,
    Geography,
    Json,
    Record,
}

impl FieldType {
    /// Wire name as BigQuery spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Bytes => "BYTES",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Numeric => "NUMERIC",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::Geography => "GEOGRAPHY",
            Self::Json => "JSON",
            Self::Record => "RECORD",
        }
    }

    /// Parse a wire name, `None` for tags this connector does not know
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "STRING" => Some(Self::String),
            "BYTES" => Some(Self::Bytes),
            "INTEGER" | "INT64" => Some(Self::Integer),
            "FLOAT" | "FLOAT64" => Some(Self::Float),
            "NUMERIC" | "BIGNUMERIC" => Some(Self::Numeric),
            "BOOLEAN" | "BOOL" => Some(Self::Boolean),
            "TIMESTAMP" => Some(Self::Timestamp),
            "DATE" => Some(Self::Date),
            "TIME" => Some(Self::Time),
            "DATETIME" => Some(Self::DateTime),
            "GEOGRAPHY" => Some(Self::Geography),
            "JSON" => Some(Self::Json),
            "RECORD" | "STRUCT" => Some(Self::Record),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One column of a warehouse table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Warehouse table metadata, fetched fresh before every mutation
///
/// The `etag` is an opaque version marker; updates conditioned on it fail
/// with [`ApiError::StaleEtag`] when the table changed in between, and a
/// successful update rotates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    pub fields: Vec<FieldSchema>,
    pub etag: String,
}

/// Warehouse dataset metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMetadata {
    pub name: String,
}

/// One batch load, built per `copy` call
///
/// Source format and create disposition are fixed: staged objects are
/// newline-delimited JSON, and the destination table must already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    pub source_uri: String,
    pub destination_table: String,
}

impl LoadJob {
    pub fn new(source_uri: impl Into<String>, destination_table: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            destination_table: destination_table.into(),
        }
    }

    /// Wire value for the load's source format
    pub const SOURCE_FORMAT: &'static str = "NEWLINE_DELIMITED_JSON";

    /// Wire value for the load's create disposition
    pub const CREATE_DISPOSITION: &'static str = "CREATE_NEVER";
}

/// Opaque reference to a submitted load job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,

    /// Region the job runs in, when the service reports one
    pub location: Option<String>,
}

/// Terminal state of a load job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    /// Remote failure detail; `None` means the job succeeded
    pub error_detail: Option<String>,
}

impl JobStatus {
    pub fn ok() -> Self {
        Self { error_detail: None }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(detail.into()),
        }
    }
}

/// Coarse classification of a remote failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The addressed resource does not exist
    NotFound,

    /// Likely to succeed on retry (transport-level)
    Transient,

    /// Will not succeed without intervention
    Fatal,
}

/// Errors surfaced by a warehouse backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("stale etag: {0}")]
    StaleEtag(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote service error: {0}")]
    Service(String),
}

impl ApiError {
    /// Collapse vendor-specific failures into the three classes callers
    /// act on
    pub fn classify(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Transport(_) => ErrorClass::Transient,
            Self::AlreadyExists(_) | Self::StaleEtag(_) | Self::Auth(_) | Self::Service(_) => {
                ErrorClass::Fatal
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn is_stale_etag(&self) -> bool {
        matches!(self, Self::StaleEtag(_))
    }
}

/// Remote schema and load-job operations of one warehouse backend
///
/// Dataset and table names are relative to the project and dataset the
/// backend was opened with. Implementations hold the network handle; the
/// reconciler and loader only borrow the trait object per call.
#[async_trait]
pub trait WarehouseApi: Send + Sync {
    /// Backend name for logs (e.g. "BigQuery", "Mock")
    fn name(&self) -> &'static str;

    async fn dataset_metadata(&self, dataset: &str) -> Result<DatasetMetadata, ApiError>;

    async fn create_dataset(&self, dataset: &str) -> Result<(), ApiError>;

    async fn table_metadata(&self, table: &str) -> Result<TableMetadata, ApiError>;

    async fn create_table(&self, table: &str, fields: &[FieldSchema]) -> Result<(), ApiError>;

    /// Replace the table's field list, conditioned on `etag`
    async fn update_table_schema(
        &self,
        table: &str,
        fields: &[FieldSchema],
        etag: &str,
    ) -> Result<(), ApiError>;

    /// Submit an asynchronous load job
    async fn submit_load(&self, job: &LoadJob) -> Result<JobHandle, ApiError>;

    /// Block until the job reaches a terminal state
    async fn wait_load(&self, handle: &JobHandle) -> Result<JobStatus, ApiError>;

    /// Release held resources
    async fn close(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_wire_names_roundtrip() {
        for ft in [
            FieldType::String,
            FieldType::Integer,
            FieldType::Boolean,
            FieldType::Timestamp,
            FieldType::Json,
            FieldType::Record,
        ] {
            assert_eq!(FieldType::parse(ft.as_str()), Some(ft));
        }
    }

    #[test]
    fn field_type_parse_aliases() {
        assert_eq!(FieldType::parse("INT64"), Some(FieldType::Integer));
        assert_eq!(FieldType::parse("bool"), Some(FieldType::Boolean));
        assert_eq!(FieldType::parse("STRUCT"), Some(FieldType::Record));
        assert_eq!(FieldType::parse("INTERVAL"), None);
    }

    #[test]
    fn error_classification() {
        assert_eq!(
            ApiError::NotFound("t".into()).classify(),
            ErrorClass::NotFound
        );
        assert_eq!(
            ApiError::Transport("reset".into()).classify(),
            ErrorClass::Transient
        );
        assert_eq!(
            ApiError::StaleEtag("etag-1".into()).classify(),
            ErrorClass::Fatal
        );
        assert_eq!(ApiError::Auth("denied".into()).classify(), ErrorClass::Fatal);
    }

    #[test]
    fn load_job_fixed_settings() {
        let job = LoadJob::new("gs://bucket/key.json", "events");
        assert_eq!(job.source_uri, "gs://bucket/key.json");
        assert_eq!(LoadJob::SOURCE_FORMAT, "NEWLINE_DELIMITED_JSON");
        assert_eq!(LoadJob::CREATE_DISPOSITION, "CREATE_NEVER");
    }
}
