//! Namespace provider

use super::list_all;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace as K8sNamespace;
use kube::api::Api;
use kube::{Client, ResourceExt};
use netpol_lib::state::NamespacesProvider;
use netpol_lib::Namespace;

/// Lists every namespace in the cluster
pub struct NamespaceService {
    client: Client,
    page_size: u32,
}

impl NamespaceService {
    pub fn new(client: Client, page_size: u32) -> Self {
        Self { client, page_size }
    }
}

#[async_trait]
impl NamespacesProvider for NamespaceService {
    async fn get_all_namespaces(&self) -> Result<Vec<Namespace>> {
        let api: Api<K8sNamespace> = Api::all(self.client.clone());
        let items = list_all(&api, self.page_size)
            .await
            .context("while listing namespaces")?;

        Ok(items.iter().map(convert).collect())
    }
}

fn convert(ns: &K8sNamespace) -> Namespace {
    Namespace {
        name: ns.name_any(),
        labels: ns.labels().clone(),
    }
}
