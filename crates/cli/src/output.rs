//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use netpol_lib::report::{render_markdown, Report};
use netpol_lib::Violation;
use tabled::{settings::Style, Table, Tabled};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored table (default)
    #[default]
    Console,
    /// Markdown document
    Markdown,
    /// JSON document
    Json,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Console => "console",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        }
    }
}

/// Row of the violations table
#[derive(Tabled)]
struct ViolationRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Policy")]
    policy: String,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&Violation> for ViolationRow {
    fn from(v: &Violation) -> Self {
        Self {
            namespace: v.namespace.clone(),
            policy: v.policy_name.clone(),
            direction: v
                .direction
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            position: v.position.clone().unwrap_or_else(|| "-".to_string()),
            message: v.message.clone(),
        }
    }
}

/// Render a report in the requested format
pub fn render_report(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(render_console(report)),
        OutputFormat::Markdown => Ok(render_markdown(report)),
        OutputFormat::Json => report.to_json(),
    }
}

fn render_console(report: &Report) -> String {
    let summary = format!(
        "Audited {} network policies across {} namespaces ({} pod candidates)",
        report.policies, report.namespaces, report.pod_candidates
    );

    if report.is_clean() {
        return format!(
            "{}\n{} {}\n",
            summary,
            "✓".green().bold(),
            "No violations found"
        );
    }

    let rows: Vec<ViolationRow> = report.violations.iter().map(ViolationRow::from).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    format!(
        "{}\n{} {}\n{}\n",
        summary,
        "⚠".yellow().bold(),
        format!("{} violation(s) found", report.violations.len()).yellow(),
        table
    )
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}
