//! Rabbit BQ Interceptor - fail-open job configuration optimization
//!
//! This crate sits in front of a BigQuery job submit operation, asks the
//! Rabbit optimizer service to rewrite each job configuration, and submits
//! the result. Any failure on the optimization path degrades to submitting
//! the original configuration, so the interceptor can never lose a job.

pub mod credentials;
pub mod diagnostics;
pub mod dynamic_config;
pub mod interceptor;
pub mod logging;
pub mod mock;
pub mod optimizer;
pub mod patch;
pub mod plugin;
pub mod settings;
pub mod store;
pub mod submit;

pub use credentials::{ApiKey, CredentialError, CredentialProvider, Credentials};
pub use diagnostics::{DiagnosticRecord, DiagnosticSink, MemorySink, Stage, TracingSink};
pub use dynamic_config::{ConfigError, ConfigProvider, DynamicOptimizerConfig, ValidationError};
pub use interceptor::{Decision, Interceptor, PreSubmissionError};
pub use optimizer::{HttpOptimizerFactory, OptimizationError, OptimizerClient, OptimizerFactory};
pub use patch::{PatchGuard, SubmitHook};
pub use settings::{EffectiveSettings, InterceptorSettings};
pub use submit::{JobHandle, SubmissionError, SubmissionRequest, Submitter};
