//! Network policy validation rules
//!
//! Every rule implements [`Validator`] and turns a [`ClusterState`] into an
//! ordered list of violations. A malformed selector aborts the whole run;
//! a selector that simply matches nothing becomes a violation.

mod label_correctness;
pub mod messages;

#[cfg(test)]
mod tests;

pub use label_correctness::LabelCorrectness;

use crate::error::ValidationError;
use crate::models::{ClusterState, Violation};

/// Trait for network policy validation rules
pub trait Validator: Send + Sync {
    /// Human-readable rule name used in logs and reports
    fn name(&self) -> &'static str;

    /// Validate a snapshot, returning violations in a stable order
    fn validate(&self, state: &ClusterState) -> Result<Vec<Violation>, ValidationError>;
}

/// All built-in validation rules, in execution order
pub fn default_validators() -> Vec<Box<dyn Validator>> {
    vec![Box::new(LabelCorrectness::new())]
}
