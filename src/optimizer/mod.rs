//! Optimizer service boundary
//!
//! - [`OptimizerClient`]: one optimize call per submission
//! - [`OptimizerFactory`]: builds a client from resolved credentials
//! - [`HttpOptimizerClient`]: the production client over HTTPS

mod http;

pub use http::{HttpOptimizerClient, HttpOptimizerFactory, HttpOptimizerOptions};

use rabbit_protocol::{OptimizationRequest, OptimizationResult};

use crate::credentials::Credentials;

/// Sends a job to the optimizer service
pub trait OptimizerClient: Send + Sync {
    fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult, OptimizationError>;
}

/// Constructs optimizer clients bound to a set of credentials
pub trait OptimizerFactory: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn OptimizerClient>, OptimizationError>;
}

/// Optimization failures.
///
/// Callers only distinguish "optimization did not succeed"; the variants
/// exist for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("Failed to build optimizer client: {0}")]
    Client(String),

    #[error("Optimizer request failed: {0}")]
    Transport(String),

    #[error("Optimizer returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed optimizer response: {0}")]
    MalformedResponse(String),

    #[error("Optimizer response has no optimizedJob.configuration")]
    MissingOptimizedConfiguration,
}

impl OptimizationError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            OptimizationError::Client(_) => "client",
            OptimizationError::Transport(_) => "transport",
            OptimizationError::Status { .. } => "status",
            OptimizationError::MalformedResponse(_) => "malformed_response",
            OptimizationError::MissingOptimizedConfiguration => "missing_optimized_configuration",
        }
    }
}
