//! Rabbit Protocol Types
//!
//! Defines the JSON request and response bodies exchanged with the
//! BigQuery job optimizer service.

pub mod error;
pub mod request;
pub mod response;

pub use error::ApiError;
pub use request::{
    JobEnvelope, OptimizationDescriptor, OptimizationRequest, OptimizationType, PricingMode,
    ReservationAssignmentConfig,
};
pub use response::{OptimizationResult, OptimizedJob};

/// Default optimizer endpoint when a connection carries no base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.followrabbit.ai/bq-job-optimizer";

/// Path of the optimize operation, relative to the base URL.
pub const OPTIMIZE_JOB_PATH: &str = "/v1/optimize-job";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "rabbit-api-key";
