//! In-process store

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Connection, ConnectionStore, StoreError, VariableStore};

/// Thread-safe in-memory store for embedding hosts and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    variables: RwLock<HashMap<String, String>>,
    connections: RwLock<HashMap<String, Connection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable's raw text
    pub fn set_variable(&self, key: impl Into<String>, value: impl Into<String>) {
        self.variables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }

    /// Set a variable to the JSON text of a value
    pub fn set_json_variable(&self, key: impl Into<String>, value: &serde_json::Value) {
        self.set_variable(key, value.to_string());
    }

    pub fn remove_variable(&self, key: &str) {
        self.variables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn set_connection(&self, connection_id: impl Into<String>, connection: Connection) {
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(connection_id.into(), connection);
    }

    pub fn remove_connection(&self, connection_id: &str) {
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(connection_id);
    }
}

impl VariableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .variables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}

impl ConnectionStore for MemoryStore {
    fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, StoreError> {
        Ok(self
            .connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(connection_id)
            .cloned())
    }
}
