//! Audit reports and snapshots
//!
//! Provides:
//! - the [`Report`] document handed to renderers
//! - Markdown rendering
//! - JSON snapshot files of a [`ClusterState`]

use crate::models::{ClusterState, Violation};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Outcome of one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub namespaces: usize,
    pub policies: usize,
    pub pod_candidates: usize,
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn new(state: &ClusterState, violations: Vec<Violation>) -> Self {
        Self {
            generated_at: Utc::now(),
            namespaces: state.namespaces.len(),
            policies: state.policy_count(),
            pod_candidates: state.candidate_count(),
            violations,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}

/// Render the Markdown report
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();

    out.push_str("# Network Policy Report\n\n");
    out.push_str("## Violations\n\n");
    let _ = writeln!(out, "Number of violations: {}", report.violations.len());

    if !report.violations.is_empty() {
        out.push('\n');
        out.push_str("| Namespace | Network Policy Name | Type | Message |\n");
        out.push_str("|-----------|---------------------|------|---------|\n");
        for v in &report.violations {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                escape_cell(&v.namespace),
                escape_cell(&v.policy_name),
                v.kind,
                escape_cell(&v.message)
            );
        }
    }

    out
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Write a snapshot of the cluster state as pretty JSON
pub fn write_snapshot(state: &ClusterState, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(state).context("Failed to serialize snapshot")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))
}

/// Read a snapshot written by [`write_snapshot`]
pub fn read_snapshot(path: &Path) -> Result<ClusterState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Namespace, NetworkPolicy, NetworkPolicyPeer, PodCandidate, RuleDirection};
    use crate::selector::{LabelSelector, Labels};
    use tempfile::TempDir;

    fn fix_policy() -> NetworkPolicy {
        NetworkPolicy::new(
            "orders",
            "ingress-for-orders-a",
            LabelSelector::from_labels([("app", "orders-a")]),
        )
    }

    fn fix_report(violations: Vec<Violation>) -> Report {
        Report {
            generated_at: Utc::now(),
            namespaces: 1,
            policies: 1,
            pod_candidates: 0,
            violations,
        }
    }

    #[test]
    fn test_markdown_without_violations() {
        let md = render_markdown(&fix_report(vec![]));

        assert_eq!(
            md,
            "# Network Policy Report\n\n## Violations\n\nNumber of violations: 0\n"
        );
    }

    #[test]
    fn test_markdown_with_violations() {
        let policy = fix_policy();
        let md = render_markdown(&fix_report(vec![
            Violation::for_policy(&policy, "no pods matching pod selector"),
            Violation::for_peer(
                &policy,
                RuleDirection::Ingress,
                "1:1",
                "no pods matching labels for Ingress rule [1:1]",
            ),
        ]));

        let expected = "# Network Policy Report\n\n\
## Violations\n\n\
Number of violations: 2\n\n\
| Namespace | Network Policy Name | Type | Message |\n\
|-----------|---------------------|------|---------|\n\
| orders | ingress-for-orders-a | Invalid Label | no pods matching pod selector |\n\
| orders | ingress-for-orders-a | Invalid Label | no pods matching labels for Ingress rule [1:1] |\n";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let mut violation = Violation::for_policy(&fix_policy(), "a|b");
        violation.policy_name = "odd|name".to_string();

        let md = render_markdown(&fix_report(vec![violation]));

        assert!(md.contains("| odd\\|name |"));
        assert!(md.contains("| a\\|b |"));
    }

    #[test]
    fn test_report_counts_state() {
        let mut state = ClusterState {
            namespaces: vec![Namespace::new("orders"), Namespace::new("payments")],
            ..Default::default()
        };
        state.add_policy(fix_policy());
        state.add_candidates("orders", [PodCandidate::new("pod/orders/a", Labels::new())]);

        let report = Report::new(&state, vec![]);

        assert_eq!(report.namespaces, 2);
        assert_eq!(report.policies, 1);
        assert_eq!(report.pod_candidates, 1);
        assert!(report.is_clean());
        assert!(report.to_json().unwrap().contains("\"podCandidates\": 1"));
    }

    #[test]
    fn test_snapshot_survives_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.json");

        let mut state = ClusterState {
            namespaces: vec![Namespace::new("orders").with_label("domain", "orders")],
            ..Default::default()
        };
        state.add_policy(fix_policy().with_ingress(vec![
            NetworkPolicyPeer::namespaces(LabelSelector::everything()),
            NetworkPolicyPeer::default(),
        ]));

        write_snapshot(&state, &path).unwrap();
        let loaded = read_snapshot(&path).unwrap();

        assert_eq!(loaded, state);
    }

    #[test]
    fn test_read_missing_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_snapshot(&temp_dir.path().join("absent.json")).unwrap_err();

        assert!(err.to_string().starts_with("Failed to read snapshot from"));
    }
}
