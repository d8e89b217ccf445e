//! Batch loading of staged objects into warehouse tables
//!
//! One `copy` call moves one staged object into one table: submit the
//! load job, then block until the remote side reports a terminal state.
//! The destination table must already exist; reconcile first.

use crate::api::LoadJob;
use crate::session::Session;
use tracing::info;

/// The three ways a load can fail, each naming the destination table
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The job never started (transport or validation failure on submit)
    #[error("error submitting load of {uri} into table {table}: {source}")]
    Submit {
        table: String,
        uri: String,
        #[source]
        source: crate::api::ApiError,
    },

    /// Transport failure while waiting for the running job
    #[error("error waiting for load job into table {table}: {source}")]
    Wait {
        table: String,
        #[source]
        source: crate::api::ApiError,
    },

    /// The job reached a terminal state and reports a failure
    #[error("load job into table {table} failed: {detail}")]
    Job { table: String, detail: String },
}

/// Moves staged newline-delimited JSON objects into tables
pub struct BatchLoader<'a> {
    session: &'a Session,
}

impl<'a> BatchLoader<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Load one staged object into `table` and wait for completion
    ///
    /// Success means the job finished and its terminal status carries no
    /// error. The calling task is suspended for the whole job run, which
    /// may be long.
    pub async fn copy(&self, object_key: &str, table: &str) -> Result<(), LoadError> {
        let api = self.session.api();
        let uri = self.session.staging_uri(object_key);
        let job = LoadJob::new(uri.clone(), table);

        let handle = api
            .submit_load(&job)
            .await
            .map_err(|source| LoadError::Submit {
                table: table.to_string(),
                uri: uri.clone(),
                source,
            })?;

        let status = api
            .wait_load(&handle)
            .await
            .map_err(|source| LoadError::Wait {
                table: table.to_string(),
                source,
            })?;

        match status.error_detail {
            Some(detail) => Err(LoadError::Job {
                table: table.to_string(),
                detail,
            }),
            None => {
                info!(table, uri = %uri, "staged object loaded");
                Ok(())
            }
        }
    }
}
