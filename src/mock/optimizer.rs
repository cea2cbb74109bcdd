//! Canned optimizer

use std::sync::{Arc, Mutex};

use rabbit_protocol::{OptimizationRequest, OptimizationResult, OptimizedJob};
use serde_json::Value;

use crate::credentials::Credentials;
use crate::optimizer::{OptimizationError, OptimizerClient, OptimizerFactory};

type ErrorFn = Box<dyn Fn() -> OptimizationError + Send + Sync>;

enum Behavior {
    Respond(OptimizationResult),
    Fail(ErrorFn),
    RefuseConnect(ErrorFn),
}

#[derive(Default)]
struct CallLog {
    connects: Vec<Credentials>,
    requests: Vec<OptimizationRequest>,
}

struct Inner {
    behavior: Behavior,
    log: Mutex<CallLog>,
}

/// Optimizer factory and client in one; clones share the call log
#[derive(Clone)]
pub struct MockOptimizer {
    inner: Arc<Inner>,
}

impl MockOptimizer {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            inner: Arc::new(Inner {
                behavior,
                log: Mutex::new(CallLog::default()),
            }),
        }
    }

    /// Respond with `configuration` as the optimized job
    pub fn returning(configuration: Value) -> Self {
        Self::with_result(OptimizationResult {
            optimized_job: Some(OptimizedJob {
                configuration: Some(configuration),
            }),
            optimization_performed: Some(true),
            estimated_savings: None,
            optimization_results: Vec::new(),
        })
    }

    /// Respond with a full result
    pub fn with_result(result: OptimizationResult) -> Self {
        Self::with_behavior(Behavior::Respond(result))
    }

    /// Fail every optimize call
    pub fn failing(error: impl Fn() -> OptimizationError + Send + Sync + 'static) -> Self {
        Self::with_behavior(Behavior::Fail(Box::new(error)))
    }

    /// Fail at client construction
    pub fn refusing_connect(error: impl Fn() -> OptimizationError + Send + Sync + 'static) -> Self {
        Self::with_behavior(Behavior::RefuseConnect(Box::new(error)))
    }

    /// Requests received by optimize, in order
    pub fn requests(&self) -> Vec<OptimizationRequest> {
        self.inner.log.lock().unwrap_or_else(|e| e.into_inner()).requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.log.lock().unwrap_or_else(|e| e.into_inner()).requests.len()
    }

    /// Credentials each client was built with
    pub fn connects(&self) -> Vec<Credentials> {
        self.inner.log.lock().unwrap_or_else(|e| e.into_inner()).connects.clone()
    }
}

impl OptimizerFactory for MockOptimizer {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn OptimizerClient>, OptimizationError> {
        self.inner
            .log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .connects
            .push(credentials.clone());

        if let Behavior::RefuseConnect(error) = &self.inner.behavior {
            return Err(error());
        }
        Ok(Box::new(self.clone()))
    }
}

impl OptimizerClient for MockOptimizer {
    fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult, OptimizationError> {
        self.inner
            .log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .requests
            .push(request.clone());

        match &self.inner.behavior {
            Behavior::Respond(result) => Ok(result.clone()),
            Behavior::Fail(error) | Behavior::RefuseConnect(error) => Err(error()),
        }
    }
}
