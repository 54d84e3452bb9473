//! Core data models for the network policy audit

use crate::selector::{LabelSelector, Labels, SelectorSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cluster namespace with its labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Stand-in for the pods a workload would create
///
/// `owner_name` has the form `<kind>/<namespace>/<name>` and is only used
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodCandidate {
    pub owner_name: String,
    #[serde(default)]
    pub labels: Labels,
}

impl PodCandidate {
    pub fn new(owner_name: impl Into<String>, labels: Labels) -> Self {
        Self {
            owner_name: owner_name.into(),
            labels,
        }
    }
}

/// One source or destination entry of a rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyPeer {
    #[serde(default, skip_serializing_if = "is_absent")]
    pub pod_selector: SelectorSlot,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub namespace_selector: SelectorSlot,
}

fn is_absent(slot: &SelectorSlot) -> bool {
    !slot.is_present()
}

impl NetworkPolicyPeer {
    /// Peer selecting pods in the policy's own namespace
    pub fn pods(selector: LabelSelector) -> Self {
        Self {
            pod_selector: SelectorSlot::Present(selector),
            namespace_selector: SelectorSlot::Absent,
        }
    }

    /// Peer selecting every pod in the matched namespaces
    pub fn namespaces(selector: LabelSelector) -> Self {
        Self {
            pod_selector: SelectorSlot::Absent,
            namespace_selector: SelectorSlot::Present(selector),
        }
    }

    /// Peer selecting matching pods in the matched namespaces
    pub fn pods_in_namespaces(namespaces: LabelSelector, pods: LabelSelector) -> Self {
        Self {
            pod_selector: SelectorSlot::Present(pods),
            namespace_selector: SelectorSlot::Present(namespaces),
        }
    }
}

/// Inbound traffic rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default)]
    pub from: Vec<NetworkPolicyPeer>,
}

/// Outbound traffic rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRule {
    #[serde(default)]
    pub to: Vec<NetworkPolicyPeer>,
}

/// The selector-bearing parts of a NetworkPolicy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub pod_selector: LabelSelector,
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
    #[serde(default)]
    pub egress: Vec<EgressRule>,
}

impl NetworkPolicy {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        pod_selector: LabelSelector,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            pod_selector,
            ingress: Vec::new(),
            egress: Vec::new(),
        }
    }

    /// Append an ingress rule with the given `from` peers
    pub fn with_ingress(mut self, from: Vec<NetworkPolicyPeer>) -> Self {
        self.ingress.push(IngressRule { from });
        self
    }

    /// Append an egress rule with the given `to` peers
    pub fn with_egress(mut self, to: Vec<NetworkPolicyPeer>) -> Self {
        self.egress.push(EgressRule { to });
        self
    }

    /// Peer lists of every rule in one direction, in rule order
    pub fn peers(&self, direction: RuleDirection) -> Vec<&[NetworkPolicyPeer]> {
        match direction {
            RuleDirection::Ingress => self.ingress.iter().map(|r| r.from.as_slice()).collect(),
            RuleDirection::Egress => self.egress.iter().map(|r| r.to.as_slice()).collect(),
        }
    }
}

impl fmt::Display for NetworkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Point-in-time snapshot of everything the audit looks at
///
/// Every namespace-keyed collection is a `BTreeMap` so iteration order is
/// stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterState {
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default)]
    pub network_policies: BTreeMap<String, Vec<NetworkPolicy>>,
    #[serde(default)]
    pub pod_candidates: BTreeMap<String, Vec<PodCandidate>>,
}

impl ClusterState {
    /// Pod candidates of one namespace (empty for unknown namespaces)
    pub fn candidates_in(&self, namespace: &str) -> &[PodCandidate] {
        self.pod_candidates
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Store a policy under its own namespace
    pub fn add_policy(&mut self, policy: NetworkPolicy) {
        self.network_policies
            .entry(policy.namespace.clone())
            .or_default()
            .push(policy);
    }

    /// Append pod candidates to a namespace
    pub fn add_candidates(
        &mut self,
        namespace: &str,
        candidates: impl IntoIterator<Item = PodCandidate>,
    ) {
        self.pod_candidates
            .entry(namespace.to_string())
            .or_default()
            .extend(candidates);
    }

    /// Names in `filter` that are not namespaces of this state
    pub fn unknown_namespaces<'a>(&self, filter: &'a [String]) -> Vec<&'a str> {
        filter
            .iter()
            .filter(|name| !self.namespaces.iter().any(|ns| &ns.name == *name))
            .map(String::as_str)
            .collect()
    }

    pub fn policy_count(&self) -> usize {
        self.network_policies.values().map(Vec::len).sum()
    }

    pub fn candidate_count(&self) -> usize {
        self.pod_candidates.values().map(Vec::len).sum()
    }
}

/// Which rule list of a policy produced a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleDirection {
    Ingress,
    Egress,
}

impl fmt::Display for RuleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleDirection::Ingress => write!(f, "Ingress"),
            RuleDirection::Egress => write!(f, "Egress"),
        }
    }
}

/// Category of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    InvalidLabel,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::InvalidLabel => "Invalid Label",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selector that matches nothing, located in its policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub namespace: String,
    pub policy_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<RuleDirection>,
    /// 1-indexed `rule:peer` coordinate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub message: String,
    pub kind: ViolationKind,
}

impl Violation {
    /// Violation of the policy's own pod selector
    pub fn for_policy(policy: &NetworkPolicy, message: impl Into<String>) -> Self {
        Self {
            namespace: policy.namespace.clone(),
            policy_name: policy.name.clone(),
            direction: None,
            position: None,
            message: message.into(),
            kind: ViolationKind::InvalidLabel,
        }
    }

    /// Violation of one rule peer
    pub fn for_peer(
        policy: &NetworkPolicy,
        direction: RuleDirection,
        position: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            namespace: policy.namespace.clone(),
            policy_name: policy.name.clone(),
            direction: Some(direction),
            position: Some(position.to_string()),
            message: message.into(),
            kind: ViolationKind::InvalidLabel,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}]: {}: {}",
            self.namespace, self.policy_name, self.kind, self.message
        )
    }
}
