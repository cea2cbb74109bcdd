//! Optimization request types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optimize request body.
///
/// The caller's job configuration travels inside a job envelope under
/// `configuration`, alongside the optimizations the caller enables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    /// The job to optimize.
    pub configuration: JobEnvelope,
    /// Optimizations to apply, in order.
    pub enabled_optimizations: Vec<OptimizationDescriptor>,
}

impl OptimizationRequest {
    /// Build a request for a job configuration with the given optimizations.
    pub fn new(configuration: serde_json::Value, enabled_optimizations: Vec<OptimizationDescriptor>) -> Self {
        Self {
            configuration: JobEnvelope { configuration },
            enabled_optimizations,
        }
    }
}

/// A job as the optimizer sees it: the submit-time configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub configuration: serde_json::Value,
}

/// One enabled optimization: a type tag plus its type-specific config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationDescriptor {
    #[serde(rename = "type")]
    pub kind: OptimizationType,
    pub config: serde_json::Value,
}

impl OptimizationDescriptor {
    /// Descriptor for reservation assignment.
    pub fn reservation_assignment(config: &ReservationAssignmentConfig) -> Self {
        Self {
            kind: OptimizationType::ReservationAssignment,
            config: serde_json::json!({
                "defaultPricingMode": config.default_pricing_mode,
                "reservationIds": config.reservation_ids,
            }),
        }
    }
}

/// Known optimization types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    /// Route the job to one of the configured reservations, or on-demand.
    ReservationAssignment,
}

/// Settings for the reservation assignment optimization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationAssignmentConfig {
    pub default_pricing_mode: PricingMode,
    pub reservation_ids: Vec<String>,
}

/// Pricing mode applied when no reservation is a better fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    OnDemand,
    SlotBased,
}

impl PricingMode {
    /// All accepted modes, in their wire spelling.
    pub const ALL: [PricingMode; 2] = [PricingMode::OnDemand, PricingMode::SlotBased];

    /// Wire spelling of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::OnDemand => "on_demand",
            PricingMode::SlotBased => "slot_based",
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingMode {
    type Err = String;

    /// Exact match only; `"ON_DEMAND"` is not a pricing mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PricingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown pricing mode '{}'", s))
    }
}
