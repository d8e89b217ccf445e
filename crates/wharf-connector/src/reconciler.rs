//! Schema reconciliation against the remote warehouse
//!
//! The reconciler holds no state of its own: table and dataset existence
//! live remotely and are re-fetched on every call. Fetch-then-create and
//! fetch-then-patch are two round trips with no atomicity, so concurrent
//! reconcilers can race; a create that loses the race is treated as the
//! benign already-exists outcome, and a patch that loses surfaces as
//! [`ReconcileError::ConcurrencyConflict`] for the caller to retry with
//! a fresh fetch.

use crate::api::FieldSchema;
use crate::mapper::{to_field_type, to_logical_type};
use crate::session::Session;
use std::collections::BTreeMap;
use tracing::{debug, info};
use wharf_core::{LogicalTable, LogicalType};

/// Schema create/patch/fetch failure
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("error querying dataset {dataset} metadata: {source}")]
    DatasetFetch {
        dataset: String,
        #[source]
        source: crate::api::ApiError,
    },

    #[error("error creating dataset {dataset}: {source}")]
    DatasetCreate {
        dataset: String,
        #[source]
        source: crate::api::ApiError,
    },

    #[error("error querying table {table} metadata: {source}")]
    TableFetch {
        table: String,
        #[source]
        source: crate::api::ApiError,
    },

    #[error("error creating table {table}: {source}")]
    TableCreate {
        table: String,
        #[source]
        source: crate::api::ApiError,
    },

    #[error("error patching table {table} with schema [{columns}]: {source}")]
    TablePatch {
        table: String,
        columns: String,
        #[source]
        source: crate::api::ApiError,
    },

    /// The table changed between the metadata fetch and the update;
    /// re-fetch and retry.
    #[error("table {table} was modified concurrently during patch")]
    ConcurrencyConflict {
        table: String,
        #[source]
        source: crate::api::ApiError,
    },
}

/// Ensures datasets and tables exist and only ever grow
pub struct SchemaReconciler<'a> {
    session: &'a Session,
}

impl<'a> SchemaReconciler<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Create the dataset if it does not exist yet
    ///
    /// Idempotent: an existing dataset is success without a create
    /// attempt, and so is losing a create race.
    pub async fn ensure_dataset(&self, dataset: &str) -> Result<(), ReconcileError> {
        let api = self.session.api();
        match api.dataset_metadata(dataset).await {
            Ok(_) => {
                debug!(dataset, "dataset present");
                Ok(())
            }
            Err(err) if err.is_not_found() => match api.create_dataset(dataset).await {
                Ok(()) => {
                    info!(dataset, "dataset created");
                    Ok(())
                }
                Err(err) if err.is_already_exists() => {
                    info!(dataset, "dataset created concurrently");
                    Ok(())
                }
                Err(source) => Err(ReconcileError::DatasetCreate {
                    dataset: dataset.to_string(),
                    source,
                }),
            },
            Err(source) => Err(ReconcileError::DatasetFetch {
                dataset: dataset.to_string(),
                source,
            }),
        }
    }

    /// Current remote schema of `table` as a logical table
    ///
    /// A missing table is a normal state and comes back with zero
    /// columns; every other fetch failure is an error.
    pub async fn table_schema(&self, table: &str) -> Result<LogicalTable, ReconcileError> {
        match self.session.api().table_metadata(table).await {
            Ok(meta) => {
                let mut logical = LogicalTable::new(table);
                for field in meta.fields {
                    logical
                        .columns
                        .insert(field.name, to_logical_type(field.field_type));
                }
                Ok(logical)
            }
            Err(err) if err.is_not_found() => Ok(LogicalTable::new(table)),
            Err(source) => Err(ReconcileError::TableFetch {
                table: table.to_string(),
                source,
            }),
        }
    }

    /// Create `table` unless it already exists
    ///
    /// An existing table is a no-op; the current remote schema is never
    /// compared or recreated. Column translation is total, so only the
    /// remote create call can fail here.
    pub async fn create_table(&self, table: &LogicalTable) -> Result<(), ReconcileError> {
        let api = self.session.api();
        match api.table_metadata(&table.name).await {
            Ok(_) => {
                info!(table = %table.name, "table already exists");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                let fields = translate_columns(&table.columns);
                match api.create_table(&table.name, &fields).await {
                    Ok(()) => {
                        info!(table = %table.name, columns = fields.len(), "table created");
                        Ok(())
                    }
                    Err(err) if err.is_already_exists() => {
                        info!(table = %table.name, "table created concurrently");
                        Ok(())
                    }
                    Err(source) => Err(ReconcileError::TableCreate {
                        table: table.name.clone(),
                        source,
                    }),
                }
            }
            Err(source) => Err(ReconcileError::TableFetch {
                table: table.name.clone(),
                source,
            }),
        }
    }

    /// Append the patch's columns to the remote table's field list
    ///
    /// Additive only: nothing is removed or retyped, and column names are
    /// not checked against the existing list; a duplicate is rejected by
    /// the remote service and propagated. Patching a nonexistent table is
    /// an error, unlike reading one. The update is conditioned on the
    /// etag from the fetch.
    pub async fn patch_table_schema(&self, patch: &LogicalTable) -> Result<(), ReconcileError> {
        let api = self.session.api();
        let meta =
            api.table_metadata(&patch.name)
                .await
                .map_err(|source| ReconcileError::TableFetch {
                    table: patch.name.clone(),
                    source,
                })?;

        let mut fields = meta.fields;
        fields.extend(translate_columns(&patch.columns));

        match api
            .update_table_schema(&patch.name, &fields, &meta.etag)
            .await
        {
            Ok(()) => {
                info!(table = %patch.name, added = patch.len(), "table schema patched");
                Ok(())
            }
            Err(err) if err.is_stale_etag() => Err(ReconcileError::ConcurrencyConflict {
                table: patch.name.clone(),
                source: err,
            }),
            Err(source) => Err(ReconcileError::TablePatch {
                table: patch.name.clone(),
                columns: describe_fields(&fields),
                source,
            }),
        }
    }
}

fn translate_columns(columns: &BTreeMap<String, LogicalType>) -> Vec<FieldSchema> {
    columns
        .iter()
        .map(|(name, logical)| FieldSchema::new(name.clone(), to_field_type(*logical)))
        .collect()
}

fn describe_fields(fields: &[FieldSchema]) -> String {
    fields
        .iter()
        .map(|f| format!("{} - {}", f.name, f.field_type))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FieldType;

    #[test]
    fn columns_translate_in_name_order() {
        let table = LogicalTable::new("events")
            .with_column("ts", LogicalType::Timestamp)
            .with_column("id", LogicalType::String);

        let fields = translate_columns(&table.columns);
        assert_eq!(
            fields,
            vec![
                FieldSchema::new("id", FieldType::String),
                FieldSchema::new("ts", FieldType::Timestamp),
            ]
        );
    }

    #[test]
    fn field_description_joins_name_and_type() {
        let fields = vec![
            FieldSchema::new("id", FieldType::String),
            FieldSchema::new("ts", FieldType::Timestamp),
        ];
        assert_eq!(describe_fields(&fields), "id - STRING, ts - TIMESTAMP");
    }
}
