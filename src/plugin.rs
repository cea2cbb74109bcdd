//! Host plugin entry point
//!
//! Builds the production interceptor from settings and installs it on the
//! host's submit hook. Safe to call on every plugin load.

use std::sync::Arc;

use crate::credentials::CredentialProvider;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::dynamic_config::ConfigProvider;
use crate::interceptor::Interceptor;
use crate::optimizer::HttpOptimizerFactory;
use crate::patch::SubmitHook;
use crate::settings::{InterceptorSettings, StoreSettings};
use crate::store::{ConnectionStore, EnvStore, FileStore, VariableStore};
use crate::submit::Submitter;

/// Plugin name reported to the host
pub const PLUGIN_NAME: &str = "rabbit_bq_job_optimizer_plugin";

/// Open the configured variable and connection stores
pub fn open_stores(settings: &InterceptorSettings) -> (Arc<dyn VariableStore>, Arc<dyn ConnectionStore>) {
    match &settings.store {
        StoreSettings::Env => {
            let store = Arc::new(EnvStore::new());
            let variables: Arc<dyn VariableStore> = store.clone();
            let connections: Arc<dyn ConnectionStore> = store;
            (variables, connections)
        }
        StoreSettings::File(path) => {
            let store = Arc::new(FileStore::new(path.clone()));
            let variables: Arc<dyn VariableStore> = store.clone();
            let connections: Arc<dyn ConnectionStore> = store;
            (variables, connections)
        }
    }
}

/// Wrap `base` with an interceptor wired from settings
pub fn build_interceptor<S: Submitter>(
    base: S,
    settings: &InterceptorSettings,
    sink: Arc<dyn DiagnosticSink>,
) -> Interceptor<S> {
    let (variables, connections) = open_stores(settings);

    Interceptor::new(
        base,
        ConfigProvider::new(variables),
        CredentialProvider::new(connections).with_base_url_extra_key(settings.base_url_extra_key.clone()),
        Arc::new(HttpOptimizerFactory::new(settings.optimizer.clone())),
    )
    .with_config_key(settings.config_key.clone())
    .with_connection_id(settings.connection_id.clone())
    .with_sink(sink)
}

/// Install the interceptor on `hook` once. Returns whether this call installed it.
pub fn on_load(hook: &SubmitHook, settings: &InterceptorSettings) -> bool {
    hook.install_once(|base| {
        Arc::new(build_interceptor(base, settings, Arc::new(TracingSink))) as Arc<dyn Submitter>
    })
}
