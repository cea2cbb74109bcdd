//! Read-only key/value providers
//!
//! The orchestrator keeps two kinds of records the interceptor reads:
//! - Variables: named text blobs (the dynamic optimizer config lives here)
//! - Connections: named secret records with a password and a JSON extra field
//!
//! Every lookup is a point-in-time read. Backends never cache.

mod env;
mod file;
mod memory;

pub use env::EnvStore;
pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

/// Source of variables
pub trait VariableStore: Send + Sync {
    /// Raw text of a variable, or `None` if the store has no such key
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Source of connections
pub trait ConnectionStore: Send + Sync {
    /// Look up a connection by identifier
    fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, StoreError>;
}

/// A stored connection record
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Secret field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Raw JSON text of the structured extra field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Connection {
    /// Create a connection with a password and no extra
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            extra: None,
        }
    }

    /// Set the extra field from a JSON value
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra.to_string());
        self
    }

    /// Parsed extra field.
    ///
    /// Absent, unparseable, or non-object extras all read as an empty map.
    pub fn extra_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.extra
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|value| match value {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("extra", &self.extra)
            .finish()
    }
}

/// Store access errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Malformed store document: {0}")]
    Malformed(String),
}
