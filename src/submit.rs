//! Job submission capability
//!
//! The underlying submit operation is opaque: it takes a configuration
//! document plus pass-through options and returns a job handle or fails.
//! The interceptor is itself a [`Submitter`], so hosts can swap it in
//! wherever they held the base submitter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A job submission: configuration plus options the interceptor never reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Job configuration document
    pub configuration: Value,

    /// Pass-through options for the underlying submit operation
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl SubmissionRequest {
    pub fn new(configuration: Value) -> Self {
        Self {
            configuration,
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Same options, different configuration
    pub fn with_configuration(&self, configuration: Value) -> Self {
        Self {
            configuration,
            options: self.options.clone(),
        }
    }
}

/// Handle to a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            project_id: None,
            location: None,
        }
    }
}

/// Failure of the underlying submit operation.
///
/// The interceptor never wraps or rewrites these; a caller sees exactly what
/// the underlying operation produced.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Job rejected: {0}")]
    Rejected(String),

    #[error("Submission transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Something that submits jobs
pub trait Submitter: Send + Sync {
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError>;
}

impl<S: Submitter + ?Sized> Submitter for Arc<S> {
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
        (**self).submit(request)
    }
}

impl<S: Submitter + ?Sized> Submitter for Box<S> {
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
        (**self).submit(request)
    }
}

/// Adapter for closures
pub struct FnSubmitter<F>(pub F);

impl<F> Submitter for FnSubmitter<F>
where
    F: Fn(SubmissionRequest) -> Result<JobHandle, SubmissionError> + Send + Sync,
{
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
        (self.0)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_configuration_keeps_options() {
        let request = SubmissionRequest::new(json!({"query": {"query": "SELECT 1"}}))
            .with_option("project_id", json!("p1"))
            .with_option("location", json!("EU"));

        let swapped = request.with_configuration(json!({"query": {"query": "SELECT 2"}}));
        assert_eq!(swapped.options, request.options);
        assert_eq!(swapped.configuration["query"]["query"], "SELECT 2");
        assert_eq!(request.configuration["query"]["query"], "SELECT 1");
    }

    #[test]
    fn test_fn_submitter_and_arc() {
        let submitter: Arc<dyn Submitter> = Arc::new(FnSubmitter(|req: SubmissionRequest| {
            Ok(JobHandle::new(req.configuration["id"].as_str().unwrap_or("none")))
        }));

        let handle = submitter.submit(SubmissionRequest::new(json!({"id": "job_1"}))).unwrap();
        assert_eq!(handle.job_id, "job_1");
    }

    #[test]
    fn test_other_error_is_transparent() {
        let inner: Box<dyn std::error::Error + Send + Sync> = "quota exceeded".into();
        let err = SubmissionError::from(inner);
        assert_eq!(err.to_string(), "quota exceeded");
    }
}
