//! Dynamic configuration loading (no validation)

use std::sync::Arc;

use serde_json::Value;

use crate::store::{StoreError, VariableStore};

/// Loads a named configuration document from a variable store
#[derive(Clone)]
pub struct ConfigProvider {
    store: Arc<dyn VariableStore>,
}

impl ConfigProvider {
    pub fn new(store: Arc<dyn VariableStore>) -> Self {
        Self { store }
    }

    /// Read and parse the configuration stored under `key`.
    ///
    /// One read per call. A document that parses to a falsy value
    /// (`null`, `{}`, `[]`, `""`, `false`, `0`) counts as empty.
    pub fn load(&self, key: &str) -> Result<Value, ConfigError> {
        let raw = self
            .store
            .get(key)?
            .ok_or_else(|| ConfigError::Missing { key: key.to_string() })?;

        if raw.trim().is_empty() {
            return Err(ConfigError::Empty { key: key.to_string() });
        }

        let value: Value = serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed {
            key: key.to_string(),
            detail: e.to_string(),
        })?;

        if is_empty_document(&value) {
            return Err(ConfigError::Empty { key: key.to_string() });
        }

        Ok(value)
    }
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration '{key}' not found")]
    Missing { key: String },

    #[error("Configuration '{key}' is empty")]
    Empty { key: String },

    #[error("Configuration '{key}' is not valid JSON: {detail}")]
    Malformed { key: String, detail: String },

    #[error("Variable store unavailable: {0}")]
    Store(String),
}

impl From<StoreError> for ConfigError {
    fn from(e: StoreError) -> Self {
        ConfigError::Store(e.to_string())
    }
}

impl ConfigError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            ConfigError::Missing { .. } => "missing",
            ConfigError::Empty { .. } => "empty",
            ConfigError::Malformed { .. } => "malformed",
            ConfigError::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const KEY: &str = "rabbit_bq_optimizer_config";

    fn provider_with(value: Option<&str>) -> ConfigProvider {
        let store = MemoryStore::new();
        if let Some(v) = value {
            store.set_variable(KEY, v);
        }
        ConfigProvider::new(Arc::new(store))
    }

    #[test]
    fn test_load_object() {
        let provider = provider_with(Some(
            r#"{"default_pricing_mode": "on_demand", "reservation_ids": ["r1"]}"#,
        ));
        let value = provider.load(KEY).unwrap();
        assert_eq!(value["reservation_ids"], json!(["r1"]));
    }

    #[test]
    fn test_missing() {
        let err = provider_with(None).load(KEY).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert_eq!(err.reason(), "missing");
    }

    #[test]
    fn test_empty_variants() {
        for raw in ["", "   ", "null", "{}", "[]", "\"\"", "false", "0"] {
            let err = provider_with(Some(raw)).load(KEY).unwrap_err();
            assert!(
                matches!(err, ConfigError::Empty { .. }),
                "expected Empty for {:?}, got {:?}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_malformed() {
        let err = provider_with(Some("{default_pricing_mode: on_demand")).load(KEY).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(err.to_string().contains(KEY));
    }

    #[test]
    fn test_non_empty_scalar_passes_through() {
        // Shape checks belong to the validator
        let value = provider_with(Some("42")).load(KEY).unwrap();
        assert_eq!(value, json!(42));
    }
}
