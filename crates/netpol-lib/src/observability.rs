//! Observability infrastructure for the audit
//!
//! Provides:
//! - Prometheus metrics (validation latency, snapshot size, violations)
//! - Structured logging of audit events with tracing

use crate::models::{ClusterState, Violation};
use prometheus::{
    register_histogram, register_int_gauge, register_int_gauge_vec, Encoder, Histogram,
    IntGauge, IntGaugeVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for validation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AuditMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AuditMetricsInner {
    validation_latency_seconds: Histogram,
    namespaces: IntGauge,
    network_policies: IntGauge,
    pod_candidates: IntGauge,
    violations: IntGaugeVec,
    fatal_errors: IntGauge,
}

impl AuditMetricsInner {
    fn new() -> Self {
        Self {
            validation_latency_seconds: register_histogram!(
                "netpol_validation_latency_seconds",
                "Time spent running validation rules over a cluster snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register validation_latency_seconds"),

            namespaces: register_int_gauge!(
                "netpol_snapshot_namespaces",
                "Number of namespaces in the last audited snapshot"
            )
            .expect("Failed to register snapshot_namespaces"),

            network_policies: register_int_gauge!(
                "netpol_snapshot_network_policies",
                "Number of network policies in the last audited snapshot"
            )
            .expect("Failed to register snapshot_network_policies"),

            pod_candidates: register_int_gauge!(
                "netpol_snapshot_pod_candidates",
                "Number of pod candidates in the last audited snapshot"
            )
            .expect("Failed to register snapshot_pod_candidates"),

            violations: register_int_gauge_vec!(
                "netpol_violations",
                "Violations found by the last audit, by namespace and kind",
                &["namespace", "kind"]
            )
            .expect("Failed to register violations"),

            fatal_errors: register_int_gauge!(
                "netpol_fatal_errors_total",
                "Total number of audits aborted by malformed input"
            )
            .expect("Failed to register fatal_errors"),
        }
    }
}

/// Audit metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AuditMetrics {
    _private: (),
}

impl Default for AuditMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AuditMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AuditMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a validation latency observation
    pub fn observe_validation_latency(&self, duration_secs: f64) {
        self.inner().validation_latency_seconds.observe(duration_secs);
    }

    /// Record the size of the audited snapshot
    pub fn set_snapshot_size(&self, state: &ClusterState) {
        let inner = self.inner();
        inner.namespaces.set(state.namespaces.len() as i64);
        inner.network_policies.set(state.policy_count() as i64);
        inner.pod_candidates.set(state.candidate_count() as i64);
    }

    /// Replace the violation gauges with the outcome of the last audit
    pub fn set_violations(&self, violations: &[Violation]) {
        let gauge = &self.inner().violations;
        gauge.reset();
        for v in violations {
            gauge
                .with_label_values(&[v.namespace.as_str(), v.kind.as_str()])
                .inc();
        }
    }

    /// Increment fatal errors counter
    pub fn inc_fatal_errors(&self) {
        self.inner().fatal_errors.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for audit events
#[derive(Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    /// `source` names where the snapshot came from (kube context or file)
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Log audit start
    pub fn log_audit_started(&self, version: &str) {
        info!(
            event = "audit_started",
            source = %self.source,
            version = %version,
            "Network policy audit started"
        );
    }

    /// Log the snapshot that is about to be audited
    pub fn log_state_built(&self, state: &ClusterState) {
        info!(
            event = "state_built",
            source = %self.source,
            namespaces = state.namespaces.len(),
            policies = state.policy_count(),
            pod_candidates = state.candidate_count(),
            "Cluster state ready"
        );
    }

    /// Log a single violation
    pub fn log_violation(&self, rule: &str, violation: &Violation) {
        warn!(
            event = "violation_found",
            source = %self.source,
            rule = %rule,
            namespace = %violation.namespace,
            policy = %violation.policy_name,
            direction = ?violation.direction,
            position = ?violation.position,
            kind = %violation.kind,
            message = %violation.message,
            "Network policy violation"
        );
    }

    /// Log audit completion
    pub fn log_audit_completed(&self, violations: usize, duration_secs: f64) {
        info!(
            event = "audit_completed",
            source = %self.source,
            violations = violations,
            duration_secs = duration_secs,
            "Network policy audit finished"
        );
    }

    /// Log an audit aborted by malformed input
    pub fn log_audit_failed(&self, rule: &str, reason: &str) {
        error!(
            event = "audit_failed",
            source = %self.source,
            rule = %rule,
            reason = %reason,
            "Network policy audit aborted"
        );
    }
}
