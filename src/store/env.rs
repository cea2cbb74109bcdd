//! Environment variable store
//!
//! - Variables: `RABBIT_VAR_<KEY>` holds the raw text
//! - Connections: `RABBIT_CONN_<ID>` holds `{"password": ..., "extra": ...}`
//!
//! Keys are upper-cased before lookup.

use std::env;

use serde::Deserialize;
use serde_json::Value;

use super::{Connection, ConnectionStore, StoreError, VariableStore};

/// Default prefix for variables
pub const VARIABLE_PREFIX: &str = "RABBIT_VAR_";

/// Default prefix for connections
pub const CONNECTION_PREFIX: &str = "RABBIT_CONN_";

/// Store backed by process environment variables
#[derive(Debug, Clone)]
pub struct EnvStore {
    variable_prefix: String,
    connection_prefix: String,
}

impl Default for EnvStore {
    fn default() -> Self {
        Self {
            variable_prefix: VARIABLE_PREFIX.to_string(),
            connection_prefix: CONNECTION_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnvConnection {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    extra: Option<Value>,
}

impl EnvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom prefixes
    pub fn with_prefixes(variable_prefix: impl Into<String>, connection_prefix: impl Into<String>) -> Self {
        Self {
            variable_prefix: variable_prefix.into(),
            connection_prefix: connection_prefix.into(),
        }
    }

    fn var_name(prefix: &str, key: &str) -> String {
        format!("{}{}", prefix, key.to_uppercase())
    }

    fn read(name: &str) -> Result<Option<String>, StoreError> {
        match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                Err(StoreError::Malformed(format!("{} is not valid UTF-8", name)))
            }
        }
    }
}

impl VariableStore for EnvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::read(&Self::var_name(&self.variable_prefix, key))
    }
}

impl ConnectionStore for EnvStore {
    fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, StoreError> {
        let name = Self::var_name(&self.connection_prefix, connection_id);
        let Some(raw) = Self::read(&name)? else {
            return Ok(None);
        };

        let parsed: EnvConnection = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", name, e)))?;

        Ok(Some(Connection {
            password: parsed.password,
            extra: parsed.extra.filter(|e| !e.is_null()).map(|extra| match extra {
                Value::String(s) => s,
                other => other.to_string(),
            }),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own prefix so parallel tests never share variables.

    #[test]
    fn test_variable_lookup_uppercases_key() {
        let store = EnvStore::with_prefixes("RBQ_T1_VAR_", "RBQ_T1_CONN_");
        env::set_var("RBQ_T1_VAR_MY_CONFIG", r#"{"a": 1}"#);

        assert_eq!(store.get("my_config").unwrap().as_deref(), Some(r#"{"a": 1}"#));
        assert_eq!(store.get("other").unwrap(), None);
    }

    #[test]
    fn test_connection_lookup() {
        let store = EnvStore::with_prefixes("RBQ_T2_VAR_", "RBQ_T2_CONN_");
        env::set_var(
            "RBQ_T2_CONN_RABBIT_API",
            r#"{"password": "key", "extra": {"api_base_url": "http://local"}}"#,
        );

        let conn = store.get_connection("rabbit_api").unwrap().unwrap();
        assert_eq!(conn.password.as_deref(), Some("key"));
        assert_eq!(conn.extra_json()["api_base_url"], "http://local");
    }

    #[test]
    fn test_malformed_connection() {
        let store = EnvStore::with_prefixes("RBQ_T3_VAR_", "RBQ_T3_CONN_");
        env::set_var("RBQ_T3_CONN_BROKEN", "password=key");

        assert!(matches!(
            store.get_connection("broken"),
            Err(StoreError::Malformed(_))
        ));
    }
}
