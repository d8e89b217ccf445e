//! Wharf Core
//!
//! Portable schema model and connector configuration shared by the
//! warehouse connector and the CLI.

pub mod config;
pub mod schema;

pub use config::{ConnectorConfig, Credential, ConfigError};
pub use schema::{LogicalTable, LogicalType};
