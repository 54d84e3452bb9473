//! CLI subcommands

pub mod snapshot;
pub mod validate;

use crate::cluster::{self, workload_strategies, NamespaceService, NetworkPolicyService};
use crate::config::{kubeconfig_paths, read_kubeconfig, Config};
use anyhow::Result;
use netpol_lib::state::StateBuilder;
use netpol_lib::ClusterState;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Where to find the cluster
pub struct ClusterArgs<'a> {
    pub kubeconfig: Option<&'a str>,
    pub context: Option<&'a str>,
}

impl ClusterArgs<'_> {
    /// Human-readable name of the audited source, used in logs
    pub fn source_name(&self) -> String {
        self.context.unwrap_or("current-context").to_string()
    }
}

/// Fetch the cluster state through the Kubernetes API
pub async fn acquire_state(
    cluster_args: &ClusterArgs<'_>,
    config: &Config,
    namespaces: Vec<String>,
) -> Result<ClusterState> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let paths = kubeconfig_paths(cluster_args.kubeconfig)?;
    let client = cluster::connect(read_kubeconfig(&paths)?, cluster_args.context, timeout).await?;

    let mut builder = StateBuilder::new()
        .namespaces(Arc::new(NamespaceService::new(client.clone(), config.page_size)))
        .network_policies(Arc::new(NetworkPolicyService::new(
            client.clone(),
            config.page_size,
        )))
        .namespace_filter(namespaces)
        .timeout(timeout);

    for (kind, provider) in workload_strategies(&client, &config.workload_kinds()?, config.page_size) {
        builder = builder.pod_candidates(kind.as_str(), provider);
    }

    let state = builder.build().await?;
    info!(
        event = "cluster_state_acquired",
        kubeconfig = ?paths,
        namespaces = state.namespaces.len(),
        policies = state.policy_count(),
        "Cluster state acquired"
    );
    Ok(state)
}
