//! Network policy validator CLI
//!
//! Audits the label selectors of a cluster's NetworkPolicies and reports
//! every selector that matches nothing.

mod cluster;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::validate::{ValidateArgs, Verdict};
use commands::{snapshot, validate, ClusterArgs};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Network policy validator CLI
#[derive(Parser)]
#[command(name = "netpolvalidator")]
#[command(author, version, about = "Find NetworkPolicy label selectors that match nothing", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses $KUBECONFIG, then ~/.kube/config, if not specified)
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Path to a JSON config file (default: ~/.config/netpolvalidator/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (overrides the configured one)
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate network policies of a cluster or a saved snapshot
    Validate {
        /// Only audit policies of this namespace (repeatable)
        #[arg(long, short)]
        namespace: Vec<String>,

        /// Validate a snapshot file instead of a live cluster
        #[arg(long)]
        from_snapshot: Option<PathBuf>,

        /// Write the report to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write Prometheus metrics in text format to a file
        #[arg(long)]
        metrics_output: Option<PathBuf>,

        /// Exit with status 2 when violations are found
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        fail_on_violations: bool,
    },

    /// Save the cluster state to a file for offline validation
    Snapshot {
        /// Output file path
        #[arg(long, short)]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout is reserved for reports
    let (plain_layer, json_layer) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .init();
}

async fn run(cli: Cli) -> Result<Verdict> {
    let config = config::Config::load(cli.config.as_deref())?;
    let format = match cli.format {
        Some(format) => format,
        None => config.output_format()?,
    };
    let cluster_args = ClusterArgs {
        kubeconfig: cli.kubeconfig.as_deref(),
        context: cli.context.as_deref(),
    };

    match cli.command {
        Commands::Validate {
            namespace,
            from_snapshot,
            output,
            metrics_output,
            fail_on_violations,
        } => {
            let args = ValidateArgs {
                namespaces: namespace,
                from_snapshot,
                output,
                metrics_output,
                fail_on_violations,
            };
            validate::run(&cluster_args, &config, format, args).await
        }
        Commands::Snapshot { output } => {
            snapshot::run(&cluster_args, &config, &output).await?;
            Ok(Verdict::Passed)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(verdict) => verdict.into(),
        Err(err) => {
            output::print_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
