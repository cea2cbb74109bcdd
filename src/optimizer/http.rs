//! HTTP optimizer client
//!
//! `POST {base_url}/v1/optimize-job` with the API key in the `rabbit-api-key`
//! header and an [`OptimizationRequest`] JSON body. One attempt, bounded by
//! the configured connect and total timeouts.

use std::time::Duration;

use rabbit_protocol::{
    ApiError, OptimizationRequest, OptimizationResult, API_KEY_HEADER, DEFAULT_BASE_URL,
    OPTIMIZE_JOB_PATH,
};
use reqwest::blocking::Client;

use super::{OptimizationError, OptimizerClient, OptimizerFactory};
use crate::credentials::{ApiKey, Credentials};

/// HTTP client options
#[derive(Debug, Clone)]
pub struct HttpOptimizerOptions {
    /// Used when the credentials carry no base URL
    pub default_base_url: String,
    pub connect_timeout: Duration,
    /// Whole request, connect included
    pub request_timeout: Duration,
}

impl Default for HttpOptimizerOptions {
    fn default() -> Self {
        Self {
            default_base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Optimizer client bound to one API key and endpoint
pub struct HttpOptimizerClient {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
}

impl HttpOptimizerClient {
    pub fn new(credentials: &Credentials, options: &HttpOptimizerOptions) -> Result<Self, OptimizationError> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| OptimizationError::Client(e.to_string()))?;

        let base_url = credentials
            .base_url
            .as_deref()
            .unwrap_or(&options.default_base_url);

        Ok(Self {
            client,
            endpoint: endpoint_url(base_url),
            api_key: credentials.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), OPTIMIZE_JOB_PATH)
}

impl OptimizerClient for HttpOptimizerClient {
    fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult, OptimizationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(request)
            .send()
            .map_err(|e| OptimizationError::Transport(self.api_key.scrub(&e.to_string())))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| OptimizationError::Transport(self.api_key.scrub(&e.to_string())))?;

        if !status.is_success() {
            let message = ApiError::from_body(&body)
                .map(|err| err.to_string())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });
            return Err(OptimizationError::Status {
                status: status.as_u16(),
                message: self.api_key.scrub(&message),
            });
        }

        let result: OptimizationResult = serde_json::from_str(&body)
            .map_err(|e| OptimizationError::MalformedResponse(e.to_string()))?;

        if result.optimized_configuration().is_none() {
            return Err(OptimizationError::MissingOptimizedConfiguration);
        }

        Ok(result)
    }
}

/// Builds [`HttpOptimizerClient`]s with shared options
#[derive(Debug, Clone, Default)]
pub struct HttpOptimizerFactory {
    options: HttpOptimizerOptions,
}

impl HttpOptimizerFactory {
    pub fn new(options: HttpOptimizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HttpOptimizerOptions {
        &self.options
    }
}

impl OptimizerFactory for HttpOptimizerFactory {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn OptimizerClient>, OptimizationError> {
        Ok(Box::new(HttpOptimizerClient::new(credentials, &self.options)?))
    }
}
