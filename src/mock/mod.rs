//! Test doubles for the interception pipeline
//!
//! - [`MockSubmitter`]: records every submission, fails on demand
//! - [`MockOptimizer`]: canned optimizer results or errors, records calls
//!
//! Used by unit and integration tests, and by embedding hosts that want to
//! exercise their wiring without a warehouse or an optimizer service.

mod failure;
mod optimizer;
mod submitter;

pub use failure::{FailureInjector, FailureRule, Match};
pub use optimizer::MockOptimizer;
pub use submitter::MockSubmitter;
