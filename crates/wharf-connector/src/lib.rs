//! Warehouse connector: schema reconciliation and batch loading
//!
//! This crate keeps BigQuery table schemas in sync with a portable
//! logical schema and bulk-loads staged Cloud Storage objects into the
//! reconciled tables.
//!
//! ## Features
//!
//! - `bigquery` - compile the real BigQuery backend. Without it the
//!   crate still builds; [`Session::connect`] reports that the backend
//!   is unavailable, and the in-memory [`MockWarehouse`] remains usable
//!   for tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wharf_connector::{Session, SchemaReconciler, BatchLoader};
//! use wharf_core::{ConnectorConfig, LogicalTable, LogicalType};
//!
//! let config = ConnectorConfig::from_file("wharf.toml".as_ref())?;
//! let session = Session::connect(config).await?;
//!
//! let reconciler = SchemaReconciler::new(&session);
//! reconciler.ensure_dataset("analytics").await?;
//! reconciler
//!     .create_table(&LogicalTable::new("events").with_column("id", LogicalType::String))
//!     .await?;
//!
//! BatchLoader::new(&session).copy("staging/2024-01-01.json", "events").await?;
//! session.close().await?;
//! ```

pub mod api;
pub mod loader;
pub mod mapper;
pub mod mock;
pub mod reconciler;
pub mod session;

#[cfg(feature = "bigquery")]
pub mod bigquery;

pub use api::{
    ApiError, DatasetMetadata, ErrorClass, FieldSchema, FieldType, JobHandle, JobStatus, LoadJob,
    TableMetadata, WarehouseApi,
};
pub use loader::{BatchLoader, LoadError};
pub use mapper::{to_field_type, to_logical_type};
pub use mock::MockWarehouse;
pub use reconciler::{ReconcileError, SchemaReconciler};
pub use session::{ConnectionError, Session};

#[cfg(feature = "bigquery")]
pub use bigquery::BigQueryWarehouse;
