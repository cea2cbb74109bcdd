//! Effective settings with provenance
//!
//! The merged settings document plus where each layer came from, so an
//! operator can tell which file set a value.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::optimizer::HttpOptimizerOptions;

/// Schema identifier
pub const SCHEMA_ID: &str = "rabbit-bq/effective_settings@1";

/// Project settings path, relative to the working directory
pub const DEFAULT_PROJECT_PATH: &str = ".rabbit/bq-interceptor.toml";

/// Host settings path: `$HOME/.config/rabbit/bq-interceptor.toml`
pub fn default_host_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("rabbit")
            .join("bq-interceptor.toml")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SettingsOrigin {
    Builtin,
    Host,
    Project,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSource {
    pub origin: SettingsOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged settings with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveSettings {
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// The merged settings object
    pub settings: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<SettingsSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,
}

/// Secrets do not belong in settings; redact any that slipped in
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "api_key", "credential"];

impl EffectiveSettings {
    /// Build from layers. Missing files are skipped.
    pub fn build(
        host_path: Option<&Path>,
        project_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, SettingsError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![SettingsSource {
            origin: SettingsOrigin::Builtin,
            path: None,
            digest: None,
        }];

        for (origin, path) in [
            (SettingsOrigin::Host, host_path),
            (SettingsOrigin::Project, project_path),
        ] {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(SettingsSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(SettingsSource {
                origin: SettingsOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let mut merged = merge_layers(layers);
        let redactions = Self::redact_secrets(&mut merged);
        Self::validate(&merged)?;

        Ok(Self {
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            settings: merged,
            sources,
            redactions,
        })
    }

    /// Parse a TOML file, returning the value and the digest of its bytes
    fn load_toml_file(path: &Path) -> Result<(Value, String), SettingsError> {
        let bytes = fs::read(path).map_err(|e| SettingsError::Io(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| SettingsError::Parse(format!("{}: invalid UTF-8: {}", path.display(), e)))?;

        let table: toml::Value = toml::from_str(&contents)
            .map_err(|e| SettingsError::Parse(format!("{}: {}", path.display(), e)))?;

        Ok((toml_to_json(table), digest))
    }

    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        redact_recursive(value, "", &mut redactions);
        redactions
    }

    fn validate(settings: &Value) -> Result<(), SettingsError> {
        for key in ["config_key", "connection_id", "base_url_extra_key"] {
            match settings.get(key).and_then(Value::as_str) {
                Some(s) if !s.trim().is_empty() => {}
                _ => {
                    return Err(SettingsError::Validation(format!(
                        "{} must be a non-empty string",
                        key
                    )))
                }
            }
        }

        check_bounds(settings, "optimizer.connect_timeout_seconds", 300)?;
        check_bounds(settings, "optimizer.request_timeout_seconds", 600)?;

        match get_path(settings, "store.backend").and_then(Value::as_str) {
            Some("env") => {}
            Some("file") => {
                if get_path(settings, "store.path").and_then(Value::as_str).is_none() {
                    return Err(SettingsError::Validation(
                        "store.path is required when store.backend is \"file\"".to_string(),
                    ));
                }
            }
            other => {
                return Err(SettingsError::Validation(format!(
                    "store.backend must be \"env\" or \"file\", got {}",
                    other.unwrap_or("nothing")
                )))
            }
        }

        Ok(())
    }

    /// Get a value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.settings, path)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(Value::as_u64)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Typed view. Values were validated by [`EffectiveSettings::build`].
    pub fn interceptor_settings(&self) -> InterceptorSettings {
        let defaults = BuiltinDefaults::default();
        let string = |path: &str, default: &str| {
            self.get_str(path).unwrap_or(default).to_string()
        };
        let seconds = |path: &str, default: u64| {
            Duration::from_secs(self.get_u64(path).unwrap_or(default))
        };

        let store = match (self.get_str("store.backend"), self.get_str("store.path")) {
            (Some("file"), Some(path)) => StoreSettings::File(PathBuf::from(path)),
            _ => StoreSettings::Env,
        };

        InterceptorSettings {
            config_key: string("config_key", defaults.config_key.as_str()),
            connection_id: string("connection_id", defaults.connection_id.as_str()),
            base_url_extra_key: string("base_url_extra_key", defaults.base_url_extra_key.as_str()),
            optimizer: HttpOptimizerOptions {
                default_base_url: string("optimizer.default_base_url", defaults.default_base_url.as_str()),
                connect_timeout: seconds(
                    "optimizer.connect_timeout_seconds",
                    defaults.connect_timeout_seconds,
                ),
                request_timeout: seconds(
                    "optimizer.request_timeout_seconds",
                    defaults.request_timeout_seconds,
                ),
            },
            store,
            log_level: string("logging.level", defaults.log_level.as_str()),
        }
    }
}

fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, part| current.get(part))
}

/// Values must be integers in (0, max]; absent values fall back to defaults
fn check_bounds(settings: &Value, path: &str, max: u64) -> Result<(), SettingsError> {
    let Some(value) = get_path(settings, path) else {
        return Ok(());
    };
    match value.as_u64() {
        Some(n) if n > 0 && n <= max => Ok(()),
        _ => Err(SettingsError::Validation(format!(
            "{} must be in (0, {}], got {}",
            path, max, value
        ))),
    }
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn redact_recursive(value: &mut Value, path: &str, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let key_lower = key.to_lowercase();
                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String("[REDACTED]".to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, &current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                redact_recursive(val, &format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}

/// Where per-submission data is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    /// `RABBIT_VAR_*` / `RABBIT_CONN_*` environment variables
    Env,
    /// A JSON store document
    File(PathBuf),
}

/// Typed settings consumed by the plugin
#[derive(Debug, Clone)]
pub struct InterceptorSettings {
    pub config_key: String,
    pub connection_id: String,
    pub base_url_extra_key: String,
    pub optimizer: HttpOptimizerOptions,
    pub store: StoreSettings,
    pub log_level: String,
}

impl Default for InterceptorSettings {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            config_key: defaults.config_key,
            connection_id: defaults.connection_id,
            base_url_extra_key: defaults.base_url_extra_key,
            optimizer: HttpOptimizerOptions {
                default_base_url: defaults.default_base_url,
                connect_timeout: Duration::from_secs(defaults.connect_timeout_seconds),
                request_timeout: Duration::from_secs(defaults.request_timeout_seconds),
            },
            store: StoreSettings::Env,
            log_level: defaults.log_level,
        }
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let settings = EffectiveSettings::build(None, None, None).unwrap();

        assert_eq!(settings.schema_id, SCHEMA_ID);
        assert_eq!(settings.get_str("config_key"), Some("rabbit_bq_optimizer_config"));
        assert_eq!(settings.get_u64("optimizer.request_timeout_seconds"), Some(30));
        assert_eq!(settings.sources.len(), 1);
        assert_eq!(settings.sources[0].origin, SettingsOrigin::Builtin);
    }

    #[test]
    fn test_typed_defaults_match_builtin() {
        let typed = EffectiveSettings::build(None, None, None)
            .unwrap()
            .interceptor_settings();
        let default = InterceptorSettings::default();

        assert_eq!(typed.config_key, default.config_key);
        assert_eq!(typed.optimizer.request_timeout, Duration::from_secs(30));
        assert_eq!(typed.store, StoreSettings::Env);
    }

    #[test]
    fn test_project_file_and_cli_layers() {
        let mut project = NamedTempFile::new().unwrap();
        writeln!(project, "connection_id = \"rabbit_api_eu\"").unwrap();
        writeln!(project, "[optimizer]").unwrap();
        writeln!(project, "request_timeout_seconds = 60").unwrap();
        writeln!(project, "[store]").unwrap();
        writeln!(project, "backend = \"file\"").unwrap();
        writeln!(project, "path = \"/etc/rabbit/store.json\"").unwrap();

        let cli = json!({"optimizer": {"connect_timeout_seconds": 3}});
        let settings = EffectiveSettings::build(None, Some(project.path()), Some(cli)).unwrap();

        assert_eq!(settings.sources.len(), 3);
        assert_eq!(settings.sources[1].origin, SettingsOrigin::Project);
        assert_eq!(settings.sources[1].digest.as_ref().map(String::len), Some(64));

        let typed = settings.interceptor_settings();
        assert_eq!(typed.connection_id, "rabbit_api_eu");
        assert_eq!(typed.optimizer.request_timeout, Duration::from_secs(60));
        assert_eq!(typed.optimizer.connect_timeout, Duration::from_secs(3));
        assert_eq!(typed.store, StoreSettings::File(PathBuf::from("/etc/rabbit/store.json")));
    }

    #[test]
    fn test_missing_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let settings = EffectiveSettings::build(Some(&absent), None, None).unwrap();
        assert_eq!(settings.sources.len(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        let mut project = NamedTempFile::new().unwrap();
        writeln!(project, "connection_id = ").unwrap();
        let err = EffectiveSettings::build(None, Some(project.path()), None).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_timeout_bounds() {
        for cli in [
            json!({"optimizer": {"request_timeout_seconds": 0}}),
            json!({"optimizer": {"request_timeout_seconds": 601}}),
            json!({"optimizer": {"connect_timeout_seconds": 301}}),
            json!({"optimizer": {"connect_timeout_seconds": "10"}}),
        ] {
            let err = EffectiveSettings::build(None, None, Some(cli)).unwrap_err();
            assert!(err.to_string().contains("timeout_seconds"), "{}", err);
        }
    }

    #[test]
    fn test_file_backend_requires_path() {
        let err = EffectiveSettings::build(None, None, Some(json!({"store": {"backend": "file"}})))
            .unwrap_err();
        assert!(err.to_string().contains("store.path"));

        let err = EffectiveSettings::build(None, None, Some(json!({"store": {"backend": "vault"}})))
            .unwrap_err();
        assert!(err.to_string().contains("store.backend"));
    }

    #[test]
    fn test_blank_connection_id_rejected() {
        let err = EffectiveSettings::build(None, None, Some(json!({"connection_id": "  "})))
            .unwrap_err();
        assert!(err.to_string().contains("connection_id"));
    }

    #[test]
    fn test_secret_redaction() {
        let cli = json!({
            "api_key": "sk-123",
            "store": {"token": "t"}
        });
        let settings = EffectiveSettings::build(None, None, Some(cli)).unwrap();

        assert_eq!(settings.get_str("api_key"), Some("[REDACTED]"));
        assert_eq!(settings.get_str("store.token"), Some("[REDACTED]"));
        assert!(settings.redactions.contains(&"api_key".to_string()));
        assert!(settings.redactions.contains(&"store.token".to_string()));
        assert!(!settings.to_json().unwrap().contains("sk-123"));
    }
}
