//! Built-in defaults (layer 1)

use rabbit_protocol::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

use crate::credentials::{DEFAULT_BASE_URL_EXTRA_KEY, DEFAULT_CONNECTION_ID};
use crate::dynamic_config::DEFAULT_CONFIG_KEY;

/// Built-in default settings values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Variable holding the dynamic optimizer config
    pub config_key: String,

    /// Connection holding the API key
    pub connection_id: String,

    /// Connection extra key holding the base URL override
    pub base_url_extra_key: String,

    /// Optimizer endpoint when the connection has no base URL
    pub default_base_url: String,

    /// Optimizer connect timeout (default: 10)
    pub connect_timeout_seconds: u64,

    /// Optimizer total request timeout (default: 30)
    pub request_timeout_seconds: u64,

    /// Store backend (default: "env")
    pub store_backend: String,

    /// Log level when RUST_LOG is unset (default: "info")
    pub log_level: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            config_key: DEFAULT_CONFIG_KEY.to_string(),
            connection_id: DEFAULT_CONNECTION_ID.to_string(),
            base_url_extra_key: DEFAULT_BASE_URL_EXTRA_KEY.to_string(),
            default_base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 30,
            store_backend: "env".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "config_key": self.config_key,
            "connection_id": self.connection_id,
            "base_url_extra_key": self.base_url_extra_key,
            "optimizer": {
                "default_base_url": self.default_base_url,
                "connect_timeout_seconds": self.connect_timeout_seconds,
                "request_timeout_seconds": self.request_timeout_seconds
            },
            "store": {
                "backend": self.store_backend
            },
            "logging": {
                "level": self.log_level
            }
        })
    }
}
