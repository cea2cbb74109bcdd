//! Pipeline diagnostics
//!
//! Every stage of the interceptor produces a [`DiagnosticRecord`]. Records
//! carry reasons and configuration digests, never configurations or secrets.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadConfig,
    ValidateConfig,
    ResolveCredentials,
    Optimize,
    /// First attempt, with the optimizer's configuration
    SubmitOptimized,
    /// Fallback edge: original configuration, optimization abandoned
    SubmitOriginal,
    /// The single retry after the optimized attempt failed
    RetryOriginal,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoadConfig => "load_config",
            Stage::ValidateConfig => "validate_config",
            Stage::ResolveCredentials => "resolve_credentials",
            Stage::Optimize => "optimize",
            Stage::SubmitOptimized => "submit_optimized",
            Stage::SubmitOriginal => "submit_original",
            Stage::RetryOriginal => "retry_original",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed,
}

/// One diagnostic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub stage: Stage,
    pub outcome: Outcome,

    /// Failure reason, already scrubbed of secrets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// SHA-256 of the JCS form of the configuration this stage acted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_sha256: Option<String>,

    pub recorded_at: DateTime<Utc>,
}

impl DiagnosticRecord {
    pub fn ok(stage: Stage) -> Self {
        Self {
            stage,
            outcome: Outcome::Ok,
            reason: None,
            configuration_sha256: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            outcome: Outcome::Failed,
            reason: Some(reason.into()),
            configuration_sha256: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_configuration(mut self, configuration: &Value) -> Self {
        self.configuration_sha256 = configuration_digest(configuration);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// SHA-256 hex of the RFC 8785 canonical form of a configuration.
///
/// Key order and whitespace do not change the digest.
pub fn configuration_digest(configuration: &Value) -> Option<String> {
    let jcs_bytes = serde_json_canonicalizer::to_vec(configuration).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Some(hex::encode(hasher.finalize()))
}

/// Destination for diagnostic records
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: DiagnosticRecord);
}

/// Emits records as tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, record: DiagnosticRecord) {
        let digest = record.configuration_sha256.as_deref().unwrap_or("-");
        let reason = record.reason.as_deref().unwrap_or("unknown error");
        match (record.outcome, record.stage) {
            (Outcome::Failed, Stage::SubmitOptimized) => tracing::warn!(
                stage = "submit_optimized",
                configuration_sha256 = digest,
                "Rabbit BQ Optimizer: optimized job failed: {}. Retrying with original job configuration.",
                reason,
            ),
            (Outcome::Failed, stage @ (Stage::SubmitOriginal | Stage::RetryOriginal)) => tracing::warn!(
                stage = stage.as_str(),
                configuration_sha256 = digest,
                "Rabbit BQ Optimizer: original job submission failed: {}",
                reason,
            ),
            (Outcome::Failed, stage) => tracing::warn!(
                stage = stage.as_str(),
                "Rabbit BQ Optimizer: {} failed: {}. Proceeding with original job configuration.",
                stage,
                reason,
            ),
            (Outcome::Ok, Stage::SubmitOptimized) => tracing::info!(
                stage = "submit_optimized",
                configuration_sha256 = digest,
                "Rabbit BQ Optimizer: submitted optimized job configuration",
            ),
            (Outcome::Ok, stage @ (Stage::SubmitOriginal | Stage::RetryOriginal)) => tracing::info!(
                stage = stage.as_str(),
                configuration_sha256 = digest,
                "Rabbit BQ Optimizer: submitted original job configuration",
            ),
            (Outcome::Ok, stage) => tracing::debug!(
                stage = stage.as_str(),
                configuration_sha256 = digest,
                "Rabbit BQ Optimizer: {} ok",
                stage,
            ),
        }
    }
}

/// Collects records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.records().into_iter().map(|r| r.stage).collect()
    }

    pub fn take(&self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, record: DiagnosticRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}
