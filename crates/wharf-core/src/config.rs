//! Connector configuration (wharf.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connection settings for one destination dataset
///
/// The credential payload is either inline service-account JSON or a path
/// to a key file; which one is decided by content inspection at connect
/// time, see [`ConnectorConfig::credential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Cloud project that owns the dataset
    pub project_id: String,

    /// Destination dataset name
    pub dataset: String,

    /// Object-storage bucket holding staged load files
    pub bucket: String,

    /// Inline service-account JSON or a key-file path
    #[serde(rename = "credential")]
    pub credential_payload: String,
}

/// A credential payload resolved to its concrete form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Service-account key JSON passed inline
    InlineJson(String),

    /// Path to a service-account key file
    KeyFile(PathBuf),
}

impl ConnectorConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Load config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the raw credential payload by content inspection
    ///
    /// An explicit two-branch decision: structured key content opens a
    /// JSON object; anything else is treated as a file path.
    pub fn credential(&self) -> Credential {
        if looks_like_inline_json(&self.credential_payload) {
            Credential::InlineJson(self.credential_payload.clone())
        } else {
            Credential::KeyFile(PathBuf::from(&self.credential_payload))
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("project_id", &self.project_id),
            ("dataset", &self.dataset),
            ("bucket", &self.bucket),
            ("credential", &self.credential_payload),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// True when a credential payload is inline service-account JSON
pub fn looks_like_inline_json(payload: &str) -> bool {
    payload.trim_start().starts_with('{')
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing or empty field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml(credential: &str) -> String {
        format!(
            r#"
            project_id = "acme-analytics"
            dataset = "events"
            bucket = "acme-staging"
            credential = '{credential}'
            "#
        )
    }

    #[test]
    fn parses_toml_config() {
        let config = ConnectorConfig::from_toml(&sample_toml("/etc/wharf/key.json")).unwrap();
        assert_eq!(config.project_id, "acme-analytics");
        assert_eq!(config.dataset, "events");
        assert_eq!(config.bucket, "acme-staging");
    }

    #[test]
    fn rejects_empty_fields() {
        let result = ConnectorConfig::from_toml(&sample_toml("  "));
        assert!(matches!(result, Err(ConfigError::MissingField("credential"))));
    }

    #[test]
    fn inline_json_is_detected_by_content() {
        assert!(looks_like_inline_json(r#"{"type": "service_account"}"#));
        assert!(looks_like_inline_json("  \n\t{\"type\": \"service_account\"}"));
        assert!(!looks_like_inline_json("/etc/wharf/key.json"));
        assert!(!looks_like_inline_json("key-with-{brace}.json"));
    }

    #[test]
    fn credential_resolution() {
        let inline = ConnectorConfig::from_toml(&sample_toml(r#"{"type": "service_account"}"#))
            .unwrap()
            .credential();
        assert!(matches!(inline, Credential::InlineJson(_)));

        let file = ConnectorConfig::from_toml(&sample_toml("/etc/wharf/key.json"))
            .unwrap()
            .credential();
        assert_eq!(file, Credential::KeyFile(PathBuf::from("/etc/wharf/key.json")));
    }
}
