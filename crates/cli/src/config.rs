//! Configuration management for the CLI
//!
//! Layers, lowest priority first: built-in defaults, the JSON config file,
//! `NETPOL_*` environment variables.

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::ValueEnum;
use netpol_lib::state::WorkloadKind;
use kube::config::Kubeconfig;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_PREFIX: &str = "NETPOL";
const KUBECONFIG_ENV: &str = "KUBECONFIG";
const DEFAULT_PAGE_SIZE: i64 = 500;
const DEFAULT_TIMEOUT_SECS: i64 = 10;

/// Rejected configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown output format {0:?}. Supported values: [{1}]")]
    UnknownFormat(String, String),

    #[error("{0}")]
    UnknownWorkload(String),

    #[error("page_size must be greater than zero")]
    ZeroPageSize,

    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default output format (console, markdown, json)
    pub format: String,
    /// Enabled workload strategies, in registration order
    pub workloads: Vec<String>,
    /// Items requested per list call
    pub page_size: u32,
    /// Upper bound for fetching the cluster state
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the given file (or the default location) and
    /// the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let default_workloads: Vec<&str> = WorkloadKind::ALL.iter().map(|k| k.as_str()).collect();

        let mut builder = config::Config::builder()
            .set_default("format", OutputFormat::Console.name())?
            .set_default("workloads", default_workloads)?
            .set_default("page_size", DEFAULT_PAGE_SIZE)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?;

        // An explicit path must exist; the default location is optional
        let file = match path {
            Some(p) => Some((p.to_path_buf(), true)),
            None => Self::config_path().ok().map(|p| (p, false)),
        };
        if let Some((file, required)) = file {
            builder = builder.add_source(
                config::File::from(file)
                    .format(config::FileFormat::Json)
                    .required(required),
            );
        }

        let config: Config = builder
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("workloads"),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the CLI cannot act on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.output_format()?;
        self.workload_kinds()?;
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat, ConfigError> {
        OutputFormat::from_str(&self.format, true).map_err(|_| {
            let supported: Vec<_> = OutputFormat::value_variants()
                .iter()
                .map(|f| f.name())
                .collect();
            ConfigError::UnknownFormat(self.format.clone(), supported.join(", "))
        })
    }

    pub fn workload_kinds(&self) -> Result<Vec<WorkloadKind>, ConfigError> {
        self.workloads
            .iter()
            .map(|w| {
                w.parse::<WorkloadKind>()
                    .map_err(|e| ConfigError::UnknownWorkload(e.to_string()))
            })
            .collect()
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("netpolvalidator")
            .join("config.json"))
    }
}

/// Kubeconfig files to read, in merge order
///
/// An explicit `--kubeconfig` wins. Otherwise every existing file listed in
/// `KUBECONFIG` is used, falling back to `~/.kube/config`.
pub fn kubeconfig_paths(override_path: Option<&str>) -> Result<Vec<PathBuf>> {
    resolve_kubeconfig_paths(override_path, std::env::var_os(KUBECONFIG_ENV))
}

fn resolve_kubeconfig_paths(
    override_path: Option<&str>,
    env_value: Option<OsString>,
) -> Result<Vec<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(vec![PathBuf::from(path)]);
    }

    if let Some(value) = env_value {
        let listed: Vec<PathBuf> = std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !listed.is_empty() {
            let existing: Vec<PathBuf> = listed.iter().filter(|p| p.exists()).cloned().collect();
            if existing.is_empty() {
                anyhow::bail!(
                    "none of the files in {} exist: {}",
                    KUBECONFIG_ENV,
                    value.to_string_lossy()
                );
            }
            return Ok(existing);
        }
    }

    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(vec![home.join(".kube").join("config")])
}

/// Read and merge kubeconfig files; earlier files win on conflicts
pub fn read_kubeconfig(paths: &[PathBuf]) -> Result<Kubeconfig> {
    let mut merged: Option<Kubeconfig> = None;
    for path in paths {
        let next = Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
        merged = Some(match merged {
            Some(current) => current
                .merge(next)
                .with_context(|| format!("Failed to merge kubeconfig {}", path.display()))?,
            None => next,
        });
    }
    merged.context("No kubeconfig file to read")
}
