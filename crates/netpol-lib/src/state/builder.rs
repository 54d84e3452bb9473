//! Cluster state builder
//!
//! Drives the registered providers in a fixed order so that two builds of
//! the same cluster produce identical snapshots.

use super::{NamespacesProvider, NetworkPoliciesProvider, PodCandidatesProvider};
use crate::models::ClusterState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Builder assembling a [`ClusterState`] from cluster providers
pub struct StateBuilder {
    namespaces: Option<Arc<dyn NamespacesProvider>>,
    network_policies: Option<Arc<dyn NetworkPoliciesProvider>>,
    /// Strategies in registration order
    pod_candidates: Vec<(String, Arc<dyn PodCandidatesProvider>)>,
    /// Namespaces whose policies are audited (empty means all)
    namespace_filter: Vec<String>,
    /// Upper bound for the whole acquisition
    timeout: Option<Duration>,
}

impl StateBuilder {
    /// Create a builder with no providers registered
    pub fn new() -> Self {
        Self {
            namespaces: None,
            network_policies: None,
            pod_candidates: Vec::new(),
            namespace_filter: Vec::new(),
            timeout: None,
        }
    }

    /// Set the namespaces provider
    pub fn namespaces(mut self, provider: Arc<dyn NamespacesProvider>) -> Self {
        self.namespaces = Some(provider);
        self
    }

    /// Set the network policies provider
    pub fn network_policies(mut self, provider: Arc<dyn NetworkPoliciesProvider>) -> Self {
        self.network_policies = Some(provider);
        self
    }

    /// Register a pod candidate strategy; candidates are appended in
    /// registration order
    pub fn pod_candidates(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn PodCandidatesProvider>,
    ) -> Self {
        self.pod_candidates.push((name.into(), provider));
        self
    }

    /// Only fetch policies from these namespaces
    ///
    /// Pod candidates are still fetched everywhere since peers may select
    /// any namespace.
    pub fn namespace_filter(mut self, namespaces: Vec<String>) -> Self {
        self.namespace_filter = namespaces;
        self
    }

    /// Bound the whole acquisition by a timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fetch everything and assemble the snapshot
    pub async fn build(&self) -> Result<ClusterState> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.collect())
                .await
                .with_context(|| format!("cluster state acquisition timed out after {:?}", limit))?,
            None => self.collect().await,
        }
    }

    async fn collect(&self) -> Result<ClusterState> {
        let namespaces_provider = self
            .namespaces
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Namespaces provider is required"))?;
        let policies_provider = self
            .network_policies
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Network policies provider is required"))?;

        let mut state = ClusterState {
            namespaces: namespaces_provider
                .get_all_namespaces()
                .await
                .context("while getting all namespaces")?,
            ..Default::default()
        };
        debug!(namespaces = state.namespaces.len(), "Fetched namespaces");

        let unknown = state.unknown_namespaces(&self.namespace_filter);
        if !unknown.is_empty() {
            anyhow::bail!("unknown namespaces in filter: [{}]", unknown.join(", "));
        }

        for namespace in &state.namespaces {
            if !self.namespace_filter.is_empty() && !self.namespace_filter.contains(&namespace.name)
            {
                continue;
            }

            let policies = policies_provider
                .get_network_policies_for_namespace(&namespace.name)
                .await
                .with_context(|| {
                    format!(
                        "while getting network policies for namespace: {}",
                        namespace.name
                    )
                })?;
            debug!(
                namespace = %namespace.name,
                policies = policies.len(),
                "Fetched network policies"
            );
            state
                .network_policies
                .insert(namespace.name.clone(), policies);
        }

        for (strategy, provider) in &self.pod_candidates {
            for namespace in &state.namespaces {
                let candidates = provider
                    .get_pod_candidates_for_namespace(&namespace.name)
                    .await
                    .with_context(|| {
                        format!(
                            "while getting pod candidates for namespace: {}, strategy: {}",
                            namespace.name, strategy
                        )
                    })?;
                debug!(
                    namespace = %namespace.name,
                    strategy = %strategy,
                    candidates = candidates.len(),
                    "Fetched pod candidates"
                );
                state
                    .pod_candidates
                    .entry(namespace.name.clone())
                    .or_default()
                    .extend(candidates);
            }
        }

        info!(
            namespaces = state.namespaces.len(),
            policies = state.policy_count(),
            pod_candidates = state.candidate_count(),
            strategies = self.pod_candidates.len(),
            "Cluster state built"
        );

        Ok(state)
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
