//! Dynamic optimizer configuration
//!
//! Read from the variable store on every submission, then validated:
//!
//! ```json
//! { "default_pricing_mode": "on_demand" | "slot_based", "reservation_ids": ["..."] }
//! ```

mod provider;
mod validator;

pub use provider::{ConfigError, ConfigProvider};
pub use validator::{validate, ValidationError, REQUIRED_FIELDS};

use rabbit_protocol::{PricingMode, ReservationAssignmentConfig};
use serde::Serialize;

/// Default variable key
pub const DEFAULT_CONFIG_KEY: &str = "rabbit_bq_optimizer_config";

/// A fully validated optimizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicOptimizerConfig {
    pub default_pricing_mode: PricingMode,
    /// Never empty
    pub reservation_ids: Vec<String>,
}

impl DynamicOptimizerConfig {
    /// Settings for the reservation assignment optimization
    pub fn reservation_assignment(&self) -> ReservationAssignmentConfig {
        ReservationAssignmentConfig {
            default_pricing_mode: self.default_pricing_mode,
            reservation_ids: self.reservation_ids.clone(),
        }
    }
}
