//! Validate command

use super::{acquire_state, ClusterArgs};
use crate::config::Config;
use crate::output::{print_success, render_report, OutputFormat};
use anyhow::{Context, Result};
use netpol_lib::report::{read_snapshot, Report};
use netpol_lib::{default_validators, AuditMetrics, Auditor, ClusterState, StructuredLogger};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Result of a completed audit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    ViolationsFound,
}

impl From<Verdict> for ExitCode {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Passed => ExitCode::SUCCESS,
            Verdict::ViolationsFound => ExitCode::from(2),
        }
    }
}

/// Options of the validate subcommand
pub struct ValidateArgs {
    pub namespaces: Vec<String>,
    pub from_snapshot: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub metrics_output: Option<PathBuf>,
    pub fail_on_violations: bool,
}

/// Audit a live cluster or a saved snapshot and print the report
pub async fn run(
    cluster_args: &ClusterArgs<'_>,
    config: &Config,
    format: OutputFormat,
    args: ValidateArgs,
) -> Result<Verdict> {
    let source = match &args.from_snapshot {
        Some(path) => path.display().to_string(),
        None => cluster_args.source_name(),
    };
    let logger = StructuredLogger::new(source);
    logger.log_audit_started(env!("CARGO_PKG_VERSION"));

    let state = match &args.from_snapshot {
        Some(path) => {
            let mut state = read_snapshot(path)?;
            restrict_to_namespaces(&mut state, &args.namespaces)?;
            state
        }
        None => acquire_state(cluster_args, config, args.namespaces.clone()).await?,
    };

    let metrics = AuditMetrics::new();
    let auditor = Auditor::new(default_validators(), metrics.clone(), logger);
    let outcome = auditor.run(&state);

    if let Some(path) = &args.metrics_output {
        write_metrics(&metrics, path)?;
    }
    let violations = outcome.context("Validation aborted")?;

    let report = Report::new(&state, violations);
    let rendered = render_report(&report, format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            print_success(&format!("Report written to {}", path.display()));
        }
        None => print!("{}", rendered),
    }

    if !report.is_clean() && args.fail_on_violations {
        return Ok(Verdict::ViolationsFound);
    }
    Ok(Verdict::Passed)
}

/// Keep only the policies of the requested namespaces
///
/// Candidates stay untouched since peers may select any namespace.
fn restrict_to_namespaces(state: &mut ClusterState, namespaces: &[String]) -> Result<()> {
    if namespaces.is_empty() {
        return Ok(());
    }
    let unknown = state.unknown_namespaces(namespaces);
    if !unknown.is_empty() {
        anyhow::bail!("unknown namespaces in filter: [{}]", unknown.join(", "));
    }
    state
        .network_policies
        .retain(|ns, _| namespaces.iter().any(|wanted| wanted == ns));
    Ok(())
}

fn write_metrics(metrics: &AuditMetrics, path: &Path) -> Result<()> {
    let text = metrics.render()?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))
}
