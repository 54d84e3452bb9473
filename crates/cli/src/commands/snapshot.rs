//! Snapshot command

use super::{acquire_state, ClusterArgs};
use crate::config::Config;
use crate::output::print_success;
use anyhow::Result;
use netpol_lib::report::write_snapshot;
use std::path::Path;

/// Save the current cluster state for offline validation
pub async fn run(cluster_args: &ClusterArgs<'_>, config: &Config, output: &Path) -> Result<()> {
    let state = acquire_state(cluster_args, config, Vec::new()).await?;
    write_snapshot(&state, output)?;

    print_success(&format!(
        "Snapshot with {} namespaces and {} network policies written to {}",
        state.namespaces.len(),
        state.policy_count(),
        output.display()
    ));
    Ok(())
}
