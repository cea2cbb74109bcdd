//! Optimization response types.

use serde::{Deserialize, Deserializer, Serialize};

/// Optimize response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    /// The rewritten job. Absent when the service declined to answer with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_job: Option<OptimizedJob>,
    /// Whether any optimization was actually applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_performed: Option<bool>,
    /// Estimated savings for this job, in the service's currency unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings: Option<f64>,
    /// Per-optimization details; opaque to callers. `null` reads as empty.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub optimization_results: Vec<serde_json::Value>,
}

impl OptimizationResult {
    /// The optimized job configuration, if it is a usable document.
    ///
    /// Only a JSON object qualifies: a submit operation takes a configuration
    /// tree, never a scalar or a list.
    pub fn optimized_configuration(&self) -> Option<&serde_json::Value> {
        self.optimized_job
            .as_ref()
            .and_then(|job| job.configuration.as_ref())
            .filter(|configuration| configuration.is_object())
    }

    /// Consume the result, keeping only a usable optimized configuration.
    pub fn into_optimized_configuration(self) -> Option<serde_json::Value> {
        self.optimized_job
            .and_then(|job| job.configuration)
            .filter(|configuration| configuration.is_object())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The optimizer's rewritten job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizedJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_json::Value>,
}
