//! Recording submitter

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::failure::{FailureInjector, FailureRule};
use crate::submit::{JobHandle, SubmissionError, SubmissionRequest, Submitter};

/// Submitter that records calls and fails according to injected rules
#[derive(Debug, Default)]
pub struct MockSubmitter {
    calls: Mutex<Vec<SubmissionRequest>>,
    injector: Mutex<FailureInjector>,
    next_job: AtomicU64,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a failure rule
    pub fn with_failure(self, rule: FailureRule) -> Self {
        self.inject(rule);
        self
    }

    pub fn inject(&self, rule: FailureRule) {
        self.injector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .inject(rule);
    }

    /// Every request received, in order
    pub fn calls(&self) -> Vec<SubmissionRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Submitter for MockSubmitter {
    fn submit(&self, request: SubmissionRequest) -> Result<JobHandle, SubmissionError> {
        let failure = self
            .injector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .check(&request.configuration)
            .map(|rule| rule.message.clone());

        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match failure {
            Some(message) => Err(SubmissionError::Rejected(message)),
            None => {
                let n = self.next_job.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(JobHandle::new(format!("job_{}", n)))
            }
        }
    }
}
