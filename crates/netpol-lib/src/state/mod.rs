//! Cluster state acquisition
//!
//! The audit engine only ever sees a finished [`ClusterState`]. This module
//! defines the provider traits a cluster backend implements and the builder
//! that drives them:
//! - one namespaces provider
//! - one network policies provider
//! - any number of pod candidate strategies (one per workload kind)

mod builder;


pub use builder::StateBuilder;

use crate::models::{Namespace, NetworkPolicy, PodCandidate};
use anyhow::Result;

pub use async_trait::async_trait;

/// Source of every namespace in the cluster
#[async_trait]
pub trait NamespacesProvider: Send + Sync {
    async fn get_all_namespaces(&self) -> Result<Vec<Namespace>>;
}

/// Source of the network policies defined in one namespace
#[async_trait]
pub trait NetworkPoliciesProvider: Send + Sync {
    async fn get_network_policies_for_namespace(&self, namespace: &str)
        -> Result<Vec<NetworkPolicy>>;
}

/// Strategy turning one workload kind into pod candidates
#[async_trait]
pub trait PodCandidatesProvider: Send + Sync {
    async fn get_pod_candidates_for_namespace(&self, namespace: &str)
        -> Result<Vec<PodCandidate>>;
}

/// Workload kinds a pod candidate can originate from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Pod,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 6] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::DaemonSet,
        WorkloadKind::Job,
        WorkloadKind::CronJob,
        WorkloadKind::Pod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::DaemonSet => "daemonset",
            WorkloadKind::Job => "job",
            WorkloadKind::CronJob => "cronjob",
            WorkloadKind::Pod => "pod",
        }
    }

    /// Diagnostic owner name: `<kind>/<namespace>/<name>`
    pub fn owner_name(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}/{}", self.as_str(), namespace, name)
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkloadKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_lowercase();
        WorkloadKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let supported: Vec<_> = WorkloadKind::ALL.iter().map(|k| k.as_str()).collect();
                anyhow::anyhow!(
                    "unknown workload kind {:?}. Supported values: [{}]",
                    s,
                    supported.join(", ")
                )
            })
    }
}
