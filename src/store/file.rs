//! JSON file store
//!
//! Document shape:
//!
//! ```json
//! {
//!   "variables": { "rabbit_bq_optimizer_config": "{...}" },
//!   "connections": { "rabbit_api": { "password": "...", "extra": {"api_base_url": "..."} } }
//! }
//! ```
//!
//! The file is re-read on every lookup so edits take effect on the next submission.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::{Connection, ConnectionStore, StoreError, VariableStore};

/// Store backed by a JSON document on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    variables: HashMap<String, Value>,
    #[serde(default)]
    connections: HashMap<String, StoredConnection>,
}

#[derive(Debug, Default, Deserialize)]
struct StoredConnection {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    extra: Option<Value>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store, not an error
    fn load(&self) -> Result<StoreDocument, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreDocument::default()),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&contents)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", self.path.display(), e)))
    }
}

/// Strings are stored verbatim; any other JSON value is returned as its JSON text.
fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl VariableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut doc = self.load()?;
        Ok(doc.variables.remove(key).map(value_text))
    }
}

impl ConnectionStore for FileStore {
    fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, StoreError> {
        let mut doc = self.load()?;
        Ok(doc.connections.remove(connection_id).map(|stored| Connection {
            password: stored.password,
            extra: stored.extra.filter(|e| !e.is_null()).map(value_text),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_store(contents: &str) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{}", contents).unwrap();
        temp
    }

    #[test]
    fn test_string_and_object_variables() {
        let temp = write_store(
            r#"{"variables": {"as_text": "{\"a\": 1}", "as_object": {"a": 1}}}"#,
        );
        let store = FileStore::new(temp.path());

        assert_eq!(store.get("as_text").unwrap().as_deref(), Some(r#"{"a": 1}"#));
        assert_eq!(store.get("as_object").unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(store.get("absent").unwrap(), None);
    }

    #[test]
    fn test_connection_extra_forms() {
        let temp = write_store(
            r#"{"connections": {
                "obj": {"password": "k1", "extra": {"api_base_url": "http://a"}},
                "text": {"password": "k2", "extra": "{\"api_base_url\": \"http://b\"}"},
                "bare": {}
            }}"#,
        );
        let store = FileStore::new(temp.path());

        let obj = store.get_connection("obj").unwrap().unwrap();
        assert_eq!(obj.extra_json()["api_base_url"], "http://a");

        let text = store.get_connection("text").unwrap().unwrap();
        assert_eq!(text.extra_json()["api_base_url"], "http://b");

        let bare = store.get_connection("bare").unwrap().unwrap();
        assert!(bare.password.is_none());
        assert!(bare.extra.is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.get_connection("c").unwrap().is_none());
    }

    #[test]
    fn test_malformed_document() {
        let temp = write_store("{not json");
        let store = FileStore::new(temp.path());
        assert!(matches!(store.get("k"), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_reads_fresh_each_time() {
        let temp = write_store(r#"{"variables": {"k": "one"}}"#);
        let store = FileStore::new(temp.path());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("one"));

        fs::write(temp.path(), r#"{"variables": {"k": "two"}}"#).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }
}
