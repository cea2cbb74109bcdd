//! Interceptor settings
//!
//! Layered merge, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config (~/.config/rabbit/bq-interceptor.toml)
//! 3. Project config (.rabbit/bq-interceptor.toml)
//! 4. CLI flags
//!
//! Settings are read once when the plugin loads. The dynamic optimizer config
//! and the API credentials are not settings; they are read per submission.

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_host_path, EffectiveSettings, InterceptorSettings, SettingsError, SettingsOrigin,
    SettingsSource, StoreSettings, DEFAULT_PROJECT_PATH,
};
pub use merge::{deep_merge, merge_layers};
