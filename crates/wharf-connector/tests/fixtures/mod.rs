//! Shared fixtures for connector integration tests
//!
//! Canned logical tables and a pre-wired mock session, mirroring the
//! shapes this connector sees from upstream ingestion.

use wharf_connector::{FieldSchema, FieldType, MockWarehouse, Session};
use wharf_core::{ConnectorConfig, LogicalTable, LogicalType};

/// Connector config pointing at nothing real
pub fn test_config() -> ConnectorConfig {
    ConnectorConfig::from_toml(
        r#"
        project_id = "acme-analytics"
        dataset = "events"
        bucket = "acme-staging"
        credential = "/etc/wharf/key.json"
        "#,
    )
    .expect("fixture config parses")
}

/// A session over a fresh mock, returning both halves
///
/// The mock is a clone sharing state with the one inside the session, so
/// tests can seed and inspect remote state directly.
pub fn mock_session() -> (MockWarehouse, Session) {
    let mock = MockWarehouse::new();
    let session = Session::with_api(Box::new(mock.clone()), test_config());
    (mock, session)
}

/// A typical events table as inferred upstream
pub fn events_table() -> LogicalTable {
    LogicalTable::new("events")
        .with_column("id", LogicalType::String)
        .with_column("user_id", LogicalType::Int)
        .with_column("ts", LogicalType::Timestamp)
        .with_column("payload", LogicalType::Json)
}

/// The warehouse-side fields the events table maps to
pub fn events_fields() -> Vec<FieldSchema> {
    vec![
        FieldSchema::new("id", FieldType::String),
        FieldSchema::new("payload", FieldType::Json),
        FieldSchema::new("ts", FieldType::Timestamp),
        FieldSchema::new("user_id", FieldType::Integer),
    ]
}
