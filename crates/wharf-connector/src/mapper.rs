//! Bidirectional type mapping between logical and warehouse types
//!
//! Both directions read one hand-maintained pair table, so the
//! round-trip `to_logical_type(to_field_type(t)) == t` holds for every
//! logical type listed there. Lookups never fail: a miss maps to STRING
//! and emits a warning, because an unmapped type must not sink a load.

use crate::api::FieldType;
use tracing::warn;
use wharf_core::LogicalType;

/// Image of every unmapped type, in both directions
pub const DEFAULT_FIELD_TYPE: FieldType = FieldType::String;

const TYPE_PAIRS: &[(LogicalType, FieldType)] = &[
    (LogicalType::Bool, FieldType::Boolean),
    (LogicalType::Int, FieldType::Integer),
    (LogicalType::Float, FieldType::Float),
    (LogicalType::String, FieldType::String),
    (LogicalType::Date, FieldType::Date),
    (LogicalType::Timestamp, FieldType::Timestamp),
    (LogicalType::Json, FieldType::Json),
];

/// Map a logical type to its warehouse field type
pub fn to_field_type(logical: LogicalType) -> FieldType {
    match TYPE_PAIRS.iter().find(|(l, _)| *l == logical) {
        Some((_, field_type)) => *field_type,
        None => {
            warn!(logical_type = %logical, "unknown logical type, storing as STRING");
            DEFAULT_FIELD_TYPE
        }
    }
}

/// Map a warehouse field type back to its logical type
pub fn to_logical_type(field_type: FieldType) -> LogicalType {
    match TYPE_PAIRS.iter().find(|(_, f)| *f == field_type) {
        Some((logical, _)) => *logical,
        None => {
            warn!(field_type = %field_type, "unknown warehouse column type, reading as STRING");
            LogicalType::String
        }
    }
}
