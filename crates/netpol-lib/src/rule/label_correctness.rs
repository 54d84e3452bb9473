//! Label correctness validation
//!
//! Checks that every label selector of every NetworkPolicy selects at least
//! one real resource: the policy's own pod selector must match a pod
//! candidate in its namespace, and every ingress/egress peer must match at
//! least one namespace and one pod candidate.

use super::messages;
use super::Validator;
use crate::error::{SelectorError, ValidationError};
use crate::models::{
    ClusterState, Namespace, NetworkPolicy, NetworkPolicyPeer, PodCandidate, RuleDirection,
    Violation,
};
use crate::selector::{CompiledSelector, LabelSelector, SelectorSlot};
use tracing::{debug, info};

/// Validator flagging selectors that match no pods or namespaces
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCorrectness;

impl LabelCorrectness {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for LabelCorrectness {
    fn name(&self) -> &'static str {
        "label correctness"
    }

    fn validate(&self, state: &ClusterState) -> Result<Vec<Violation>, ValidationError> {
        let rules = RuleValidator::new(state);
        let mut violations = Vec::new();

        for (namespace, policies) in &state.network_policies {
            for policy in policies {
                if &policy.namespace != namespace {
                    return Err(ValidationError::NamespaceMismatch {
                        namespace: policy.namespace.clone(),
                        policy: policy.name.clone(),
                        stored_under: namespace.clone(),
                    });
                }

                let before = violations.len();

                violations.extend(PolicySelectorValidator::validate(
                    policy,
                    state.candidates_in(namespace),
                )?);
                violations.extend(rules.validate_direction(policy, RuleDirection::Ingress)?);
                violations.extend(rules.validate_direction(policy, RuleDirection::Egress)?);

                debug!(
                    event = "policy_validated",
                    namespace = %policy.namespace,
                    policy = %policy.name,
                    ingress_rules = policy.ingress.len(),
                    egress_rules = policy.egress.len(),
                    violations = violations.len() - before,
                    "Validated network policy labels"
                );
            }
        }

        info!(
            event = "label_correctness_completed",
            policies = state.policy_count(),
            violations = violations.len(),
            "Label correctness validation finished"
        );

        Ok(violations)
    }
}

/// Checks that a policy governs at least one workload in its namespace
struct PolicySelectorValidator;

impl PolicySelectorValidator {
    fn validate(
        policy: &NetworkPolicy,
        candidates: &[PodCandidate],
    ) -> Result<Option<Violation>, ValidationError> {
        let selector = policy
            .pod_selector
            .compile()
            .map_err(|source| ValidationError::PolicySelector {
                namespace: policy.namespace.clone(),
                policy: policy.name.clone(),
                source,
            })?;

        if candidates.iter().any(|c| selector.matches(&c.labels)) {
            Ok(None)
        } else {
            Ok(Some(Violation::for_policy(
                policy,
                messages::NO_PODS_MATCHING_POD_SELECTOR,
            )))
        }
    }
}

/// Walks one direction's rules, addressing every peer by position
struct RuleValidator<'a> {
    peers: PeerValidator<'a>,
}

impl<'a> RuleValidator<'a> {
    fn new(state: &'a ClusterState) -> Self {
        Self {
            peers: PeerValidator { state },
        }
    }

    fn validate_direction(
        &self,
        policy: &NetworkPolicy,
        direction: RuleDirection,
    ) -> Result<Vec<Violation>, ValidationError> {
        let mut violations = Vec::new();

        for (rule_index, peers) in policy.peers(direction).into_iter().enumerate() {
            for (peer_index, peer) in peers.iter().enumerate() {
                let position = messages::position(rule_index, peer_index);
                if let Some(violation) = self.peers.validate(policy, peer, direction, &position)? {
                    violations.push(violation);
                }
            }
        }

        Ok(violations)
    }
}

/// The four shapes a peer can take
#[derive(Debug, Clone, Copy)]
enum PeerShape<'p> {
    PodsInNamespaces {
        namespaces: &'p LabelSelector,
        pods: &'p LabelSelector,
    },
    PodsOnly(&'p LabelSelector),
    NamespacesOnly(&'p LabelSelector),
    MatchAll,
}

impl<'p> PeerShape<'p> {
    fn of(peer: &'p NetworkPolicyPeer) -> Self {
        match (&peer.namespace_selector, &peer.pod_selector) {
            (SelectorSlot::Present(namespaces), SelectorSlot::Present(pods)) => {
                PeerShape::PodsInNamespaces { namespaces, pods }
            }
            (SelectorSlot::Absent, SelectorSlot::Present(pods)) => PeerShape::PodsOnly(pods),
            (SelectorSlot::Present(namespaces), SelectorSlot::Absent) => {
                PeerShape::NamespacesOnly(namespaces)
            }
            (SelectorSlot::Absent, SelectorSlot::Absent) => PeerShape::MatchAll,
        }
    }
}

/// Validates a single peer against the cluster snapshot
struct PeerValidator<'a> {
    state: &'a ClusterState,
}

impl<'a> PeerValidator<'a> {
    fn validate(
        &self,
        policy: &NetworkPolicy,
        peer: &NetworkPolicyPeer,
        direction: RuleDirection,
        position: &str,
    ) -> Result<Option<Violation>, ValidationError> {
        let compile = |selector: &LabelSelector| {
            selector
                .compile()
                .map_err(|source: SelectorError| ValidationError::PeerSelector {
                    namespace: policy.namespace.clone(),
                    policy: policy.name.clone(),
                    direction,
                    position: position.to_string(),
                    source,
                })
        };

        let message = match PeerShape::of(peer) {
            PeerShape::PodsInNamespaces { namespaces, pods } => {
                let namespace_selector = compile(namespaces)?;
                let pod_selector = compile(pods)?;
                let matched = self.matching_namespaces(&namespace_selector);

                if matched.is_empty() {
                    Some(messages::no_namespaces_matching(direction, position))
                } else if !matched
                    .iter()
                    .flat_map(|ns| self.state.candidates_in(&ns.name))
                    .any(|c| pod_selector.matches(&c.labels))
                {
                    Some(messages::no_pods_matching(direction, position))
                } else {
                    None
                }
            }
            PeerShape::PodsOnly(pods) => {
                let pod_selector = compile(pods)?;
                let found = self
                    .state
                    .candidates_in(&policy.namespace)
                    .iter()
                    .any(|c| pod_selector.matches(&c.labels));

                (!found).then(|| messages::no_pods_matching(direction, position))
            }
            PeerShape::NamespacesOnly(namespaces) => {
                let namespace_selector = compile(namespaces)?;
                let matched = self.matching_namespaces(&namespace_selector);
                let pod_count: usize = matched
                    .iter()
                    .map(|ns| self.state.candidates_in(&ns.name).len())
                    .sum();

                if matched.is_empty() {
                    Some(messages::no_namespaces_matching(direction, position))
                } else if pod_count == 0 {
                    Some(messages::no_pods_in_namespaces(direction, position))
                } else {
                    None
                }
            }
            PeerShape::MatchAll => None,
        };

        Ok(message.map(|m| Violation::for_peer(policy, direction, position, m)))
    }

    fn matching_namespaces(&self, selector: &CompiledSelector) -> Vec<&'a Namespace> {
        self.state
            .namespaces
            .iter()
            .filter(|ns| selector.matches(&ns.labels))
            .collect()
    }
}
