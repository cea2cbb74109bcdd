//! The interception pipeline
//!
//! Wraps a base [`Submitter`] and runs, per submission:
//!
//! 1. Load the dynamic config
//! 2. Validate it
//! 3. Resolve optimizer credentials
//! 4. Optimize the job configuration (one call)
//! 5. Submit the optimized configuration; on failure, submit the original once
//!
//! Any failure in steps 1-4 takes the fallback edge: the original request is
//! submitted unchanged and its outcome returned. Errors from steps 1-4 never
//! reach the caller. The outcome of the original-configuration attempt is
//! returned as-is, success or failure.

use std::sync::Arc;

use rabbit_protocol::{OptimizationDescriptor, OptimizationRequest};
use serde_json::{json, Value};

use crate::credentials::{ApiKey, CredentialError, CredentialProvider, DEFAULT_CONNECTION_ID};
use crate::diagnostics::{DiagnosticRecord, DiagnosticSink, Outcome, Stage, TracingSink};
use crate::dynamic_config::{validate, ConfigError, ConfigProvider, ValidationError, DEFAULT_CONFIG_KEY};
use crate::optimizer::{OptimizationError, OptimizerFactory};
use crate::submit::{JobHandle, SubmissionError, SubmissionRequest, Submitter};

/// Why optimization was abandoned
#[derive(Debug, thiserror::Error)]
pub enum PreSubmissionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Optimization(#[from] OptimizationError),
}

impl PreSubmissionError {
    /// The stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            PreSubmissionError::Config(_) => Stage::LoadConfig,
            PreSubmissionError::Validation(_) => Stage::ValidateConfig,
            PreSubmissionError::Credentials(_) => Stage::ResolveCredentials,
            PreSubmissionError::Optimization(_) => Stage::Optimize,
        }
    }

    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            PreSubmissionError::Config(e) => e.reason(),
            PreSubmissionError::Validation(e) => e.reason(),
            PreSubmissionError::Credentials(e) => e.reason(),
            PreSubmissionError::Optimization(e) => e.reason(),
        }
    }
}

/// What the pipeline decided to submit
#[derive(Debug)]
pub enum Decision {
    /// Submit the optimizer's configuration first
    Optimized {
        configuration: Value,
        optimization_performed: Option<bool>,
        estimated_savings: Option<f64>,
    },
    /// Fallback edge: submit the original request
    Original { reason: PreSubmissionError },
}

impl Decision {
    pub fn is_optimized(&self) -> bool {
        matches!(self, Decision::Optimized { .. })
    }

    /// The configuration the first submit attempt would use
    pub fn configuration<'a>(&'a self, request: &'a SubmissionRequest) -> &'a Value {
        match self {
            Decision::Optimized { configuration, .. } => configuration,
            Decision::Original { .. } => &request.configuration,
        }
    }

    /// JSON summary for operator output
    pub fn to_json(&self, request: &SubmissionRequest) -> Value {
        match self {
            Decision::Optimized {
                configuration,
                optimization_performed,
                estimated_savings,
            } => json!({
                "decision": "optimized",
                "optimization_performed": optimization_performed,
                "estimated_savings": estimated_savings,
                "configuration": configuration,
            }),
            Decision::Original { reason } => json!({
                "decision": "original",
                "stage": reason.stage(),
                "reason": reason.reason(),
                "detail": reason.to_string(),
                "configuration": request.configuration,
            }),
        }
    }
}

/// Submitter decorator that optimizes job configurations, fail-open
pub struct Interceptor<S> {
    inner: S,
    config_provider: ConfigProvider,
    credential_provider: CredentialProvider,
    optimizer: Arc<dyn OptimizerFactory>,
    sink: Arc<dyn DiagnosticSink>,
    config_key: String,
    connection_id: String,
}

impl<S: Submitter> Interceptor<S> {
    /// Wrap `inner`, reading the default config key and connection
    pub fn new(
        inner: S,
        config_provider: ConfigProvider,
        credential_provider: CredentialProvider,
        optimizer: Arc<dyn OptimizerFactory>,
    ) -> Self {
        Self {
            inner,
            config_provider,
            credential_provider,
            optimizer,
            sink: Arc::new(TracingSink),
            config_key: DEFAULT_CONFIG_KEY.to_string(),
            connection_id: DEFAULT_CONNECTION_ID.to_string(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = key.into();
        self
    }

    pub fn with_connection_id(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = connection_id.into();
        self
    }

    /// The wrapped submitter
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Run steps 1-4 without submitting anything
    pub fn decide(&self, request: &SubmissionRequest) -> Decision {
        match self.prepare(request) {
            Ok(decision) => decision,
            Err(reason) => {
                self.sink
                    .record(DiagnosticRecord::failed(reason.stage(), reason.to_string()));
                Decision::Original { reason }
            }
        }
    }

    fn prepare(&self, request: &SubmissionRequest) -> Result<Decision, PreSubmissionError> {
        let raw = self.config_provider.load(&self.config_key)?;
        self.sink.record(DiagnosticRecord::ok(Stage::LoadConfig));

        let config = validate(&raw)?;
        self.sink.record(DiagnosticRecord::ok(Stage::ValidateConfig));

        let credentials = self.credential_provider.resolve(&self.connection_id)?;
        self.sink.record(DiagnosticRecord::ok(Stage::ResolveCredentials));

        let optimization_request = OptimizationRequest::new(
            request.configuration.clone(),
            vec![OptimizationDescriptor::reservation_assignment(
                &config.reservation_assignment(),
            )],
        );
        tracing::debug!(
            pricing_mode = config.default_pricing_mode.as_str(),
            reservations = config.reservation_ids.len(),
            "Rabbit BQ Optimizer: requesting optimization"
        );

        let result = self
            .optimizer
            .connect(&credentials)
            .and_then(|client| client.optimize(&optimization_request))
            .map_err(|e| scrub(e, &credentials.api_key))?;

        let optimization_performed = result.optimization_performed;
        let estimated_savings = result.estimated_savings;
        let configuration = result
            .into_optimized_configuration()
            .ok_or(OptimizationError::MissingOptimizedConfiguration)?;

        self.sink
            .record(DiagnosticRecord::ok(Stage::Optimize).with_configuration(&configuration));

        Ok(Decision::Optimized {
            configuration,
            optimization_performed,
            estimated_savings,
        })
    }

    /// Submit the original request; whatever happens is the caller's outcome
    fn submit_original(
        &self,
        stage: Stage,
        request: SubmissionRequest,
    ) -> Result<JobHandle, SubmissionError> {
        let digest_source = request.configuration.clone();
        let result = self.inner.submit(request);
        let record = match &result {
            Ok(_) => DiagnosticRecord::ok(stage),
            Err(e) => DiagnosticRecord::failed(stage, e.to_string()),
        };
        self.sink.record(record.with_configuration(&digest_source));
        result
    }
}

/// Strip an API key that an error message may have echoed
fn scrub(error: OptimizationError, api_key: &ApiKey) -> OptimizationError {
    match error {
        OptimizationError::Client(m) => OptimizationError::Client(api_key.scrub(&m)),
        OptimizationError::Transport(m) => OptimizationError::Transport(api_key.scrub(&m)),
        OptimizationError::Status { status, message } => OptimizationError::Status {
            status,
            message: api_key.scrub(&message),
        },
        OptimizationError::MalformedResponse(m) => {
            OptimizationError::MalformedResponse(api_key.scrub(&m))
        }
        OptimizationError::MissingOptimizedConfiguration => {
            OptimizationError::MissingOptimizedConfiguration
        }
    }
}

impl<S: Submitter> Submitter for Interceptor<S> {
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
        let configuration = match self.decide(&request) {
            Decision::Original { .. } => {
                return self.submit_original(Stage::SubmitOriginal, request);
            }
            Decision::Optimized { configuration, .. } => configuration,
        };

        let record = DiagnosticRecord::ok(Stage::SubmitOptimized).with_configuration(&configuration);
        match self.inner.submit(request.with_configuration(configuration)) {
            Ok(handle) => {
                self.sink.record(record);
                Ok(handle)
            }
            Err(e) => {
                self.sink.record(DiagnosticRecord {
                    outcome: Outcome::Failed,
                    reason: Some(e.to_string()),
                    ..record
                });
                self.submit_original(Stage::RetryOriginal, request)
            }
        }
    }
}
