//! Audit runner
//!
//! Runs every validator over one snapshot, timing the run and recording the
//! outcome in metrics and logs.

use crate::error::ValidationError;
use crate::models::{ClusterState, Violation};
use crate::observability::{AuditMetrics, StructuredLogger};
use crate::rule::Validator;
use std::time::Instant;

/// Runs validators in order and concatenates their violations
pub struct Auditor {
    validators: Vec<Box<dyn Validator>>,
    metrics: AuditMetrics,
    logger: StructuredLogger,
}

impl Auditor {
    pub fn new(
        validators: Vec<Box<dyn Validator>>,
        metrics: AuditMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            validators,
            metrics,
            logger,
        }
    }

    /// Audit a snapshot; the first fatal error aborts the run
    pub fn run(&self, state: &ClusterState) -> Result<Vec<Violation>, ValidationError> {
        let started = Instant::now();
        self.logger.log_state_built(state);
        self.metrics.set_snapshot_size(state);

        let mut violations = Vec::new();
        for validator in &self.validators {
            match validator.validate(state) {
                Ok(found) => {
                    for violation in &found {
                        self.logger.log_violation(validator.name(), violation);
                    }
                    violations.extend(found);
                }
                Err(err) => {
                    self.metrics.inc_fatal_errors();
                    self.logger
                        .log_audit_failed(validator.name(), &err.to_string());
                    return Err(err);
                }
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.observe_validation_latency(elapsed);
        self.metrics.set_violations(&violations);
        self.logger.log_audit_completed(violations.len(), elapsed);

        Ok(violations)
    }
}
