//! Scenario tests for label correctness validation
//!
//! Fixtures model two namespaces, `orders` and `payments`, with workloads
//! labelled by `app` and namespaces labelled by `domain`.

use super::*;
use crate::error::{SelectorError, ValidationError};
use crate::models::{
    ClusterState, Namespace, NetworkPolicy, NetworkPolicyPeer, PodCandidate, RuleDirection,
    ViolationKind,
};
use crate::selector::{LabelSelector, Labels};

const LABEL_DOMAIN: &str = "domain";
const LABEL_APP: &str = "app";
const NS_ORDERS: &str = "orders";
const NS_PAYMENTS: &str = "payments";

fn fix_ns_orders() -> Namespace {
    Namespace::new(NS_ORDERS).with_label(LABEL_DOMAIN, NS_ORDERS)
}

fn fix_ns_payments() -> Namespace {
    Namespace::new(NS_PAYMENTS).with_label(LABEL_DOMAIN, NS_PAYMENTS)
}

fn fix_candidate(namespace: &str, app: &str) -> PodCandidate {
    let labels: Labels = [(LABEL_APP.to_string(), app.to_string())].into();
    PodCandidate::new(format!("deployment/{}/{}", namespace, app), labels)
}

fn fix_policy_for_orders_a() -> NetworkPolicy {
    NetworkPolicy::new(
        NS_ORDERS,
        "ingress-for-orders-a",
        LabelSelector::from_labels([(LABEL_APP, "orders-a")]),
    )
}

fn fix_policy_for_payments_a() -> NetworkPolicy {
    NetworkPolicy::new(
        NS_PAYMENTS,
        "ingress-for-payments-a",
        LabelSelector::everything().with_expression(LABEL_APP, "In", &["payments-a"]),
    )
}

fn orders_domain() -> LabelSelector {
    LabelSelector::from_labels([(LABEL_DOMAIN, NS_ORDERS)])
}

fn orders_a() -> LabelSelector {
    LabelSelector::from_labels([(LABEL_APP, "orders-a")])
}

fn state(
    namespaces: Vec<Namespace>,
    policies: Vec<NetworkPolicy>,
    candidates: Vec<(&str, PodCandidate)>,
) -> ClusterState {
    let mut state = ClusterState {
        namespaces,
        ..Default::default()
    };
    for policy in policies {
        state.add_policy(policy);
    }
    for (namespace, candidate) in candidates {
        state.add_candidates(namespace, [candidate]);
    }
    state
}

fn messages_of(state: &ClusterState) -> Vec<String> {
    LabelCorrectness::new()
        .validate(state)
        .unwrap()
        .into_iter()
        .map(|v| v.message)
        .collect()
}

mod policy_selector_tests {
    use super::*;

    #[test]
    fn test_no_violations_when_selector_matches() {
        let given = state(
            vec![fix_ns_orders()],
            vec![fix_policy_for_orders_a()],
            vec![(NS_ORDERS, fix_candidate(NS_ORDERS, "orders-a"))],
        );

        let violations = LabelCorrectness::new().validate(&given).unwrap();

        assert!(violations.is_empty());
    }

    #[test]
    fn test_pod_selector_does_not_match_any_pod() {
        let given = state(
            vec![fix_ns_orders()],
            vec![fix_policy_for_orders_a()],
            vec![(NS_ORDERS, fix_candidate(NS_ORDERS, "orders-b"))],
        );

        let violations = LabelCorrectness::new().validate(&given).unwrap();

        assert_eq!(violations.len(), 1);
        let violation = &violations[0];
        assert_eq!(violation.message, "no pods matching pod selector");
        assert_eq!(violation.namespace, NS_ORDERS);
        assert_eq!(violation.policy_name, "ingress-for-orders-a");
        assert_eq!(violation.kind, ViolationKind::InvalidLabel);
        assert_eq!(violation.direction, None);
        assert_eq!(violation.position, None);
    }

    #[test]
    fn test_candidates_from_other_namespaces_do_not_count() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![fix_policy_for_orders_a()],
            vec![(NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "orders-a"))],
        );

        assert_eq!(messages_of(&given), vec!["no pods matching pod selector"]);
    }

    #[test]
    fn test_returns_many_violations_in_namespace_order() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![fix_policy_for_payments_a(), fix_policy_for_orders_a()],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-b")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-b")),
            ],
        );

        let violations = LabelCorrectness::new().validate(&given).unwrap();

        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].to_string(),
            "[orders:ingress-for-orders-a]: Invalid Label: no pods matching pod selector"
        );
        assert_eq!(
            violations[1].to_string(),
            "[payments:ingress-for-payments-a]: Invalid Label: no pods matching pod selector"
        );
    }

    #[test]
    fn test_empty_pod_selector_needs_at_least_one_candidate() {
        let policy = NetworkPolicy::new(NS_ORDERS, "default-deny", LabelSelector::everything());

        let empty = state(vec![fix_ns_orders()], vec![policy.clone()], vec![]);
        assert_eq!(messages_of(&empty), vec!["no pods matching pod selector"]);

        let populated = state(
            vec![fix_ns_orders()],
            vec![policy],
            vec![(NS_ORDERS, PodCandidate::new("pod/orders/bare", Labels::new()))],
        );
        assert!(messages_of(&populated).is_empty());
    }
}

mod peer_tests {
    use super::*;

    fn payments_policy_with_ingress(peer: NetworkPolicyPeer) -> NetworkPolicy {
        fix_policy_for_payments_a().with_ingress(vec![peer])
    }

    #[test]
    fn test_namespace_and_pod_selector_match() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![payments_policy_with_ingress(
                NetworkPolicyPeer::pods_in_namespaces(orders_domain(), orders_a()),
            )],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-a")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        );

        assert!(messages_of(&given).is_empty());
    }

    #[test]
    fn test_no_namespace_matches_namespace_selector() {
        let given = state(
            vec![
                Namespace::new(NS_ORDERS).with_label(LABEL_DOMAIN, "doesnotexist"),
                fix_ns_payments(),
            ],
            vec![payments_policy_with_ingress(
                NetworkPolicyPeer::pods_in_namespaces(orders_domain(), orders_a()),
            )],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-a")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        );

        let violations = LabelCorrectness::new().validate(&given).unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "no namespaces matching labels for Ingress rule [1:1]"
        );
        assert_eq!(violations[0].direction, Some(RuleDirection::Ingress));
        assert_eq!(violations[0].position.as_deref(), Some("1:1"));
    }

    #[test]
    fn test_no_pods_in_matched_namespaces_match_pod_selector() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![payments_policy_with_ingress(
                NetworkPolicyPeer::pods_in_namespaces(orders_domain(), orders_a()),
            )],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-b")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        );

        assert_eq!(
            messages_of(&given),
            vec!["no pods matching labels for Ingress rule [1:1]"]
        );
    }

    #[test]
    fn test_pods_are_pooled_across_matched_namespaces() {
        let shared = LabelSelector::everything().with_expression(LABEL_DOMAIN, "Exists", &[]);
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![payments_policy_with_ingress(
                NetworkPolicyPeer::pods_in_namespaces(
                    shared,
                    LabelSelector::from_labels([(LABEL_APP, "payments-a")]),
                ),
            )],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-b")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        );

        assert!(messages_of(&given).is_empty());
    }

    #[test]
    fn test_namespace_only_peer_without_pods() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![payments_policy_with_ingress(NetworkPolicyPeer::namespaces(
                orders_domain(),
            ))],
            vec![(NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a"))],
        );

        assert_eq!(
            messages_of(&given),
            vec!["no pods in namespaces matching labels for Ingress rule: [1:1]"]
        );
    }

    #[test]
    fn test_namespace_only_peer_with_any_pod() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![payments_policy_with_ingress(NetworkPolicyPeer::namespaces(
                orders_domain(),
            ))],
            vec![
                (NS_ORDERS, PodCandidate::new("job/orders/migrate", Labels::new())),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        );

        assert!(messages_of(&given).is_empty());
    }

    #[test]
    fn test_namespace_only_peer_without_namespaces() {
        let given = state(
            vec![fix_ns_payments()],
            vec![payments_policy_with_ingress(NetworkPolicyPeer::namespaces(
                orders_domain(),
            ))],
            vec![(NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a"))],
        );

        assert_eq!(
            messages_of(&given),
            vec!["no namespaces matching labels for Ingress rule [1:1]"]
        );
    }

    #[test]
    fn test_pod_only_peer_looks_in_policy_namespace() {
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![payments_policy_with_ingress(NetworkPolicyPeer::pods(orders_a()))],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-a")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        );

        assert_eq!(
            messages_of(&given),
            vec!["no pods matching labels for Ingress rule [1:1]"]
        );
    }

    #[test]
    fn test_match_all_peer_never_violates() {
        let given = state(
            vec![fix_ns_payments()],
            vec![payments_policy_with_ingress(NetworkPolicyPeer::default())],
            vec![(NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a"))],
        );

        assert!(messages_of(&given).is_empty());
    }

    #[test]
    fn test_egress_uses_same_messages() {
        let policy = fix_policy_for_payments_a()
            .with_egress(vec![NetworkPolicyPeer::pods(orders_a())])
            .with_egress(vec![
                NetworkPolicyPeer::default(),
                NetworkPolicyPeer::namespaces(orders_domain()),
            ]);
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![policy],
            vec![(NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a"))],
        );

        let violations = LabelCorrectness::new().validate(&given).unwrap();

        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "no pods matching labels for Egress rule [1:1]",
                "no pods in namespaces matching labels for Egress rule: [2:2]",
            ]
        );
        assert!(violations
            .iter()
            .all(|v| v.direction == Some(RuleDirection::Egress)));
    }
}

mod ordering_tests {
    use super::*;

    fn busy_state() -> ClusterState {
        let missing = LabelSelector::from_labels([(LABEL_APP, "missing")]);
        let policy = NetworkPolicy::new(NS_PAYMENTS, "busy", missing.clone())
            .with_ingress(vec![
                NetworkPolicyPeer::pods(missing.clone()),
                NetworkPolicyPeer::pods(LabelSelector::from_labels([(LABEL_APP, "payments-a")])),
                NetworkPolicyPeer::pods(missing.clone()),
            ])
            .with_ingress(vec![NetworkPolicyPeer::namespaces(missing.clone())])
            .with_egress(vec![NetworkPolicyPeer::pods_in_namespaces(
                orders_domain(),
                missing,
            )]);

        state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![policy, fix_policy_for_orders_a()],
            vec![
                (NS_ORDERS, fix_candidate(NS_ORDERS, "orders-a")),
                (NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a")),
            ],
        )
    }

    #[test]
    fn test_output_order_and_positions() {
        let violations = LabelCorrectness::new().validate(&busy_state()).unwrap();

        let rendered: Vec<_> = violations
            .iter()
            .map(|v| {
                format!(
                    "{}/{} {:?} {:?}",
                    v.namespace, v.policy_name, v.direction, v.position
                )
            })
            .collect();

        assert_eq!(
            rendered,
            vec![
                "payments/busy None None",
                "payments/busy Some(Ingress) Some(\"1:1\")",
                "payments/busy Some(Ingress) Some(\"1:3\")",
                "payments/busy Some(Ingress) Some(\"2:1\")",
                "payments/busy Some(Egress) Some(\"1:1\")",
            ]
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        let given = busy_state();
        let validator = LabelCorrectness::new();

        let first = validator.validate(&given).unwrap();
        let second = validator.validate(&given).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_adding_matching_candidate_removes_only_that_violation() {
        let mut given = busy_state();
        let before = LabelCorrectness::new().validate(&given).unwrap();

        // Satisfies the pod selectors in `payments` but leaves the namespace
        // and cross-namespace peers untouched.
        given.add_candidates(NS_PAYMENTS, [fix_candidate(NS_PAYMENTS, "missing")]);
        let after = LabelCorrectness::new().validate(&given).unwrap();

        let removed: Vec<_> = before.iter().filter(|v| !after.contains(v)).collect();
        assert_eq!(removed.len(), 3);
        assert!(after.iter().all(|v| before.contains(v)));
        assert_eq!(after.len(), 2);
        assert_eq!(
            after[0].message,
            "no namespaces matching labels for Ingress rule [2:1]"
        );
        assert_eq!(after[1].message, "no pods matching labels for Egress rule [1:1]");
    }
}

mod fatal_error_tests {
    use super::*;

    #[test]
    fn test_malformed_peer_selector_aborts_run() {
        let broken = fix_policy_for_payments_a().with_egress(vec![
            NetworkPolicyPeer::pods(orders_a()),
            NetworkPolicyPeer::namespaces(
                LabelSelector::everything().with_expression(LABEL_DOMAIN, "In", &[]),
            ),
        ]);
        // The orders policy sorts first and produces a violation on its own.
        let given = state(
            vec![fix_ns_orders(), fix_ns_payments()],
            vec![fix_policy_for_orders_a(), broken],
            vec![(NS_PAYMENTS, fix_candidate(NS_PAYMENTS, "payments-a"))],
        );

        let err = LabelCorrectness::new().validate(&given).unwrap_err();

        assert_eq!(
            err,
            ValidationError::PeerSelector {
                namespace: NS_PAYMENTS.to_string(),
                policy: "ingress-for-payments-a".to_string(),
                direction: RuleDirection::Egress,
                position: "1:2".to_string(),
                source: SelectorError::EmptyValues {
                    key: LABEL_DOMAIN.to_string(),
                    operator: "In".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_malformed_policy_selector_aborts_run() {
        let broken = NetworkPolicy::new(
            NS_ORDERS,
            "broken",
            LabelSelector::everything().with_expression(LABEL_APP, "Matches", &["x"]),
        );
        let given = state(
            vec![fix_ns_orders()],
            vec![broken],
            vec![(NS_ORDERS, fix_candidate(NS_ORDERS, "orders-a"))],
        );

        let err = LabelCorrectness::new().validate(&given).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::PolicySelector { ref policy, .. } if policy == "broken"
        ));
    }

    #[test]
    fn test_policy_stored_under_wrong_namespace() {
        let mut given = state(vec![fix_ns_orders()], vec![], vec![]);
        given
            .network_policies
            .insert(NS_PAYMENTS.to_string(), vec![fix_policy_for_orders_a()]);

        let err = LabelCorrectness::new().validate(&given).unwrap_err();

        assert!(matches!(err, ValidationError::NamespaceMismatch { .. }));
    }
}

#[test]
fn test_default_validators() {
    let validators = default_validators();
    assert_eq!(validators.len(), 1);
    assert_eq!(validators[0].name(), "label correctness");
}
