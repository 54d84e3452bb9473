//! Network policy audit library
//!
//! This crate provides the core functionality for:
//! - Kubernetes label selector matching
//! - Label correctness validation of NetworkPolicies
//! - Cluster state acquisition through pluggable providers
//! - Reports, snapshots and observability

pub mod audit;
pub mod error;
pub mod models;
pub mod observability;
pub mod report;
pub mod rule;
pub mod selector;
pub mod state;

pub use audit::Auditor;
pub use error::{SelectorError, ValidationError};
pub use models::*;
pub use observability::{AuditMetrics, StructuredLogger};
pub use rule::{default_validators, LabelCorrectness, Validator};
pub use selector::{CompiledSelector, LabelSelector, LabelSelectorRequirement, Labels, SelectorSlot};
