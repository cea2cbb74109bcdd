//! Dynamic configuration validation
//!
//! All-or-nothing: either every rule holds and a complete
//! [`DynamicOptimizerConfig`] comes back, or the first violated rule is reported.

use rabbit_protocol::PricingMode;
use serde_json::Value;

use super::DynamicOptimizerConfig;

/// Required fields, in the order they are reported
pub const REQUIRED_FIELDS: &[&str] = &["reservation_ids", "default_pricing_mode"];

/// Validate a raw configuration document.
///
/// Rules:
/// - `reservation_ids` and `default_pricing_mode` present and non-null
/// - `default_pricing_mode` is exactly the string `on_demand` or `slot_based`
/// - `reservation_ids` is a non-empty array of non-blank strings
pub fn validate(raw: &Value) -> Result<DynamicOptimizerConfig, ValidationError> {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| raw.get(**field).map_or(true, Value::is_null))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let default_pricing_mode = parse_pricing_mode(&raw["default_pricing_mode"])?;
    let reservation_ids = parse_reservation_ids(&raw["reservation_ids"])?;

    Ok(DynamicOptimizerConfig {
        default_pricing_mode,
        reservation_ids,
    })
}

fn parse_pricing_mode(value: &Value) -> Result<PricingMode, ValidationError> {
    let allowed = PricingMode::ALL
        .iter()
        .map(PricingMode::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    value
        .as_str()
        .and_then(|s| s.parse::<PricingMode>().ok())
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "default_pricing_mode".to_string(),
            reason: format!("{} is not one of: {}", value, allowed),
        })
}

fn parse_reservation_ids(value: &Value) -> Result<Vec<String>, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidValue {
        field: "reservation_ids".to_string(),
        reason,
    };

    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("expected a list, got {}", value)))?;

    if items.is_empty() {
        return Err(invalid("no reservation IDs configured".to_string()));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item.as_str() {
            Some(id) if !id.trim().is_empty() => Ok(id.to_string()),
            _ => Err(invalid(format!("entry {} is not a non-blank string: {}", i, item))),
        })
        .collect()
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required configuration fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingFields(_) => "missing_fields",
            ValidationError::InvalidValue { .. } => "invalid_value",
        }
    }
}
