//! Fatal errors raised by the validation engine
//!
//! A selector that matches nothing is not an error; it is reported as a
//! [`Violation`](crate::models::Violation). The errors here mean the input
//! itself is malformed and the run cannot produce a trustworthy result.

use crate::models::RuleDirection;
use thiserror::Error;

/// Errors raised while compiling a label selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// Operator is not one of `In`, `NotIn`, `Exists`, `DoesNotExist`
    #[error("invalid operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },

    /// `In`/`NotIn` requires at least one value
    #[error("values must be non-empty for operator {operator} on key {key:?}")]
    EmptyValues { key: String, operator: String },

    /// `Exists`/`DoesNotExist` takes no values
    #[error("values must be empty for operator {operator} on key {key:?}")]
    UnexpectedValues { key: String, operator: String },
}

/// Errors that abort a validation run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The policy's own pod selector is malformed
    #[error("invalid pod selector in network policy [{namespace}/{policy}]")]
    PolicySelector {
        namespace: String,
        policy: String,
        #[source]
        source: SelectorError,
    },

    /// A selector inside an ingress/egress peer is malformed
    #[error("invalid selector in {direction} rule [{position}] of network policy [{namespace}/{policy}]")]
    PeerSelector {
        namespace: String,
        policy: String,
        direction: RuleDirection,
        position: String,
        #[source]
        source: SelectorError,
    },

    /// A policy is stored under a namespace other than its own
    #[error("network policy [{namespace}/{policy}] is stored under namespace {stored_under:?}")]
    NamespaceMismatch {
        namespace: String,
        policy: String,
        stored_under: String,
    },
}
