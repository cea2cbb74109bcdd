//! Optimizer API credentials
//!
//! Resolved from a connection record on every submission:
//! - password: the API key (required, trimmed)
//! - extra[`api_base_url`]: optional endpoint override (trimmed, blank = none)

use std::fmt;
use std::sync::Arc;

use crate::store::{ConnectionStore, StoreError};

/// Default connection identifier
pub const DEFAULT_CONNECTION_ID: &str = "rabbit_api";

/// Default extra-field key holding the base URL
pub const DEFAULT_BASE_URL_EXTRA_KEY: &str = "api_base_url";

/// An API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The secret itself, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Same-length mask, for operator output
    pub fn masked(&self) -> String {
        "*".repeat(self.0.chars().count())
    }

    /// Replace every occurrence of the key in `text`
    pub fn scrub(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, "[REDACTED]")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Resolved optimizer credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: ApiKey,
    /// `None` means the optimizer client's default endpoint
    pub base_url: Option<String>,
}

/// Resolves [`Credentials`] from a connection store
#[derive(Clone)]
pub struct CredentialProvider {
    store: Arc<dyn ConnectionStore>,
    base_url_extra_key: String,
}

impl CredentialProvider {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self {
            store,
            base_url_extra_key: DEFAULT_BASE_URL_EXTRA_KEY.to_string(),
        }
    }

    /// Read the base URL from a different extra-field key
    pub fn with_base_url_extra_key(mut self, key: impl Into<String>) -> Self {
        self.base_url_extra_key = key.into();
        self
    }

    /// Resolve credentials for a connection
    pub fn resolve(&self, connection_id: &str) -> Result<Credentials, CredentialError> {
        let connection = self
            .store
            .get_connection(connection_id)?
            .ok_or_else(|| CredentialError::ConnectionNotFound {
                connection_id: connection_id.to_string(),
            })?;

        let api_key = connection
            .password
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CredentialError::MissingApiKey {
                connection_id: connection_id.to_string(),
            })?;

        let base_url = connection
            .extra_json()
            .get(&self.base_url_extra_key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(Credentials {
            api_key: ApiKey::new(api_key),
            base_url,
        })
    }
}

/// Credential resolution errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Connection '{connection_id}' could not be loaded")]
    ConnectionNotFound { connection_id: String },

    #[error("Connection '{connection_id}' is missing the password field which must contain the API key")]
    MissingApiKey { connection_id: String },

    #[error("Connection store unavailable: {0}")]
    Store(String),
}

impl From<StoreError> for CredentialError {
    fn from(e: StoreError) -> Self {
        CredentialError::Store(e.to_string())
    }
}

impl CredentialError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            CredentialError::ConnectionNotFound { .. } => "connection_not_found",
            CredentialError::MissingApiKey { .. } => "missing_api_key",
            CredentialError::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Connection, MemoryStore};
    use serde_json::json;

    fn provider(connection: Option<Connection>) -> CredentialProvider {
        let store = MemoryStore::new();
        if let Some(c) = connection {
            store.set_connection(DEFAULT_CONNECTION_ID, c);
        }
        CredentialProvider::new(Arc::new(store))
    }

    #[test]
    fn test_resolve_key_and_url() {
        let creds = provider(Some(
            Connection::with_password("  key-123 \n")
                .with_extra(json!({"api_base_url": " https://opt.internal/api "})),
        ))
        .resolve(DEFAULT_CONNECTION_ID)
        .unwrap();

        assert_eq!(creds.api_key.expose(), "key-123");
        assert_eq!(creds.base_url.as_deref(), Some("https://opt.internal/api"));
    }

    #[test]
    fn test_no_extra_means_default_url() {
        let creds = provider(Some(Connection::with_password("key")))
            .resolve(DEFAULT_CONNECTION_ID)
            .unwrap();
        assert_eq!(creds.base_url, None);
    }

    #[test]
    fn test_blank_or_non_string_url_is_none() {
        for extra in [json!({"api_base_url": "   "}), json!({"api_base_url": 8080}), json!({"api_base_url": null})] {
            let creds = provider(Some(Connection::with_password("key").with_extra(extra)))
                .resolve(DEFAULT_CONNECTION_ID)
                .unwrap();
            assert_eq!(creds.base_url, None);
        }
    }

    #[test]
    fn test_custom_extra_key() {
        let creds = provider(Some(
            Connection::with_password("key").with_extra(json!({"endpoint": "http://e"})),
        ))
        .with_base_url_extra_key("endpoint")
        .resolve(DEFAULT_CONNECTION_ID)
        .unwrap();
        assert_eq!(creds.base_url.as_deref(), Some("http://e"));
    }

    #[test]
    fn test_connection_not_found() {
        let err = provider(None).resolve(DEFAULT_CONNECTION_ID).unwrap_err();
        assert!(matches!(err, CredentialError::ConnectionNotFound { .. }));
        assert!(err.to_string().contains("could not be loaded"));
    }

    #[test]
    fn test_missing_or_blank_password() {
        for conn in [Connection::default(), Connection::with_password(""), Connection::with_password(" \t ")] {
            let err = provider(Some(conn)).resolve(DEFAULT_CONNECTION_ID).unwrap_err();
            assert_eq!(err.reason(), "missing_api_key");
        }
    }

    #[test]
    fn test_api_key_never_rendered() {
        let key = ApiKey::new("sk-live-abc");
        assert!(!format!("{:?}", key).contains("sk-live-abc"));
        assert!(!format!("{}", key).contains("sk-live-abc"));
        assert_eq!(key.masked(), "***********");
        assert_eq!(
            key.scrub("request to http://x?k=sk-live-abc failed"),
            "request to http://x?k=[REDACTED] failed"
        );
    }
}
