//! Authenticated warehouse session
//!
//! A [`Session`] owns the backend handle for one project/dataset/bucket
//! context. It is opened once, borrowed by the reconciler and loader for
//! sequential calls, and closed explicitly; `close` consumes the session
//! so it cannot run twice. Reuse across concurrent callers needs
//! external synchronization.

use crate::api::WarehouseApi;
use tracing::info;
use wharf_core::ConnectorConfig;

/// Session open/close failure
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("error opening warehouse connection: {0}")]
    Open(String),

    #[error("error closing warehouse connection: {0}")]
    Close(String),

    #[error("BigQuery support not compiled. Rebuild with: cargo build --features bigquery")]
    BackendUnavailable,
}

/// An open connection to the warehouse service
pub struct Session {
    api: Box<dyn WarehouseApi>,
    config: ConnectorConfig,
}

impl Session {
    /// Open a session against the configured BigQuery project
    ///
    /// The credential payload in `config` is resolved by content
    /// inspection: inline service-account JSON or a key-file path.
    #[cfg(feature = "bigquery")]
    pub async fn connect(config: ConnectorConfig) -> Result<Self, ConnectionError> {
        let api = crate::bigquery::BigQueryWarehouse::connect(&config).await?;
        info!(project_id = %config.project_id, dataset = %config.dataset, "warehouse session opened");
        Ok(Self::with_api(Box::new(api), config))
    }

    /// Open a session without the `bigquery` feature (returns error)
    #[cfg(not(feature = "bigquery"))]
    pub async fn connect(config: ConnectorConfig) -> Result<Self, ConnectionError> {
        let _ = config;
        Err(ConnectionError::BackendUnavailable)
    }

    /// Wrap an already-built backend, used by tests to slot in the mock
    pub fn with_api(api: Box<dyn WarehouseApi>, config: ConnectorConfig) -> Self {
        Self { api, config }
    }

    /// The backend handle, borrowed per call
    pub fn api(&self) -> &dyn WarehouseApi {
        self.api.as_ref()
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub fn dataset(&self) -> &str {
        &self.config.dataset
    }

    /// Location of a staged object in the configured bucket
    pub fn staging_uri(&self, object_key: &str) -> String {
        format!("gs://{}/{}", self.config.bucket, object_key)
    }

    /// Release all held resources
    ///
    /// Consuming `self` makes a second close unrepresentable.
    pub async fn close(self) -> Result<(), ConnectionError> {
        self.api
            .close()
            .await
            .map_err(|e| ConnectionError::Close(e.to_string()))?;
        info!(dataset = %self.config.dataset, "warehouse session closed");
        Ok(())
    }
}
