//! Kubernetes backend for cluster state acquisition
//!
//! Provides:
//! - client bootstrap from a merged kubeconfig
//! - paginated listing shared by every service
//! - conversion of `k8s-openapi` selectors into the audit model
//! - one provider per resource family (namespaces, policies, workloads)

mod namespaces;
mod network_policies;
mod workloads;

pub use namespaces::NamespaceService;
pub use network_policies::NetworkPolicyService;
pub use workloads::workload_strategies;

use anyhow::{Context, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as meta;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use netpol_lib::{LabelSelector, LabelSelectorRequirement};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// Create a client from a loaded kubeconfig and optional context
pub async fn connect(raw: Kubeconfig, context: Option<&str>, timeout: Duration) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };
    let mut config = kube::Config::from_custom_kubeconfig(raw, &options)
        .await
        .context("Failed to load kubeconfig context")?;
    config.read_timeout = Some(timeout);

    debug!(
        event = "client_configured",
        cluster_url = %config.cluster_url,
        context = ?context,
        "Kubernetes client configured"
    );

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// List every object behind `api`, following `continue` tokens
pub(crate) async fn list_all<K>(api: &Api<K>, page_size: u32) -> Result<Vec<K>, kube::Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut items = Vec::new();
    let mut params = ListParams::default().limit(page_size);

    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);

        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => params = params.continue_token(&token),
            _ => break,
        }
    }

    Ok(items)
}

/// Convert an API label selector into the audit model
pub(crate) fn convert_selector(selector: &meta::LabelSelector) -> LabelSelector {
    LabelSelector {
        match_labels: selector.match_labels.clone().unwrap_or_default(),
        match_expressions: selector
            .match_expressions
            .iter()
            .flatten()
            .map(|req| LabelSelectorRequirement {
                key: req.key.clone(),
                operator: req.operator.clone(),
                values: req.values.clone().unwrap_or_default(),
            })
            .collect(),
    }
}
