//! NetworkPolicy provider

use super::{convert_selector, list_all};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1 as networking;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as meta;
use kube::api::Api;
use kube::{Client, ResourceExt};
use netpol_lib::state::NetworkPoliciesProvider;
use netpol_lib::{
    EgressRule, IngressRule, LabelSelector, NetworkPolicy, NetworkPolicyPeer, SelectorSlot,
};

/// Lists the network policies of one namespace
pub struct NetworkPolicyService {
    client: Client,
    page_size: u32,
}

impl NetworkPolicyService {
    pub fn new(client: Client, page_size: u32) -> Self {
        Self { client, page_size }
    }
}

#[async_trait]
impl NetworkPoliciesProvider for NetworkPolicyService {
    async fn get_network_policies_for_namespace(
        &self,
        namespace: &str,
    ) -> Result<Vec<NetworkPolicy>> {
        let api: Api<networking::NetworkPolicy> = Api::namespaced(self.client.clone(), namespace);
        let items = list_all(&api, self.page_size)
            .await
            .with_context(|| {
                format!("while listing network policies from namespace: {}", namespace)
            })?;

        Ok(items.iter().map(|np| convert(namespace, np)).collect())
    }
}

fn convert(namespace: &str, np: &networking::NetworkPolicy) -> NetworkPolicy {
    let mut policy = NetworkPolicy::new(namespace, np.name_any(), LabelSelector::everything());

    if let Some(spec) = &np.spec {
        policy.pod_selector = convert_selector(&spec.pod_selector);
        policy.ingress = spec
            .ingress
            .iter()
            .flatten()
            .map(|rule| IngressRule {
                from: convert_peers(rule.from.as_deref()),
            })
            .collect();
        policy.egress = spec
            .egress
            .iter()
            .flatten()
            .map(|rule| EgressRule {
                to: convert_peers(rule.to.as_deref()),
            })
            .collect();
    }

    policy
}

fn convert_peers(peers: Option<&[networking::NetworkPolicyPeer]>) -> Vec<NetworkPolicyPeer> {
    peers
        .unwrap_or_default()
        .iter()
        .map(|peer| NetworkPolicyPeer {
            pod_selector: slot(peer.pod_selector.as_ref()),
            namespace_selector: slot(peer.namespace_selector.as_ref()),
        })
        .collect()
}

fn slot(selector: Option<&meta::LabelSelector>) -> SelectorSlot {
    match selector {
        Some(s) => SelectorSlot::Present(convert_selector(s)),
        None => SelectorSlot::Absent,
    }
}
