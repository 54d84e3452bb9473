//! Violation message templates
//!
//! Reports and tests match these strings verbatim. Ingress and egress share
//! the same templates; only the direction name differs.

use crate::models::RuleDirection;

pub const NO_PODS_MATCHING_POD_SELECTOR: &str = "no pods matching pod selector";

pub fn no_namespaces_matching(direction: RuleDirection, position: &str) -> String {
    format!("no namespaces matching labels for {direction} rule [{position}]")
}

pub fn no_pods_matching(direction: RuleDirection, position: &str) -> String {
    format!("no pods matching labels for {direction} rule [{position}]")
}

pub fn no_pods_in_namespaces(direction: RuleDirection, position: &str) -> String {
    format!("no pods in namespaces matching labels for {direction} rule: [{position}]")
}

/// 1-indexed `rule:peer` coordinate from 0-based indices
pub fn position(rule_index: usize, peer_index: usize) -> String {
    format!("{}:{}", rule_index + 1, peer_index + 1)
}
