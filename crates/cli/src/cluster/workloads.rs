//! Pod candidate strategies
//!
//! Each workload kind contributes one candidate per object, labelled with the
//! labels its pods would carry. Controllers use their pod template, bare
//! pods use their own labels.

use super::list_all;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use netpol_lib::state::{PodCandidatesProvider, WorkloadKind};
use netpol_lib::{Labels, PodCandidate};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// A namespaced workload resource that implies pod labels
pub trait PodTemplateSource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
    const KIND: WorkloadKind;

    /// Labels of the pods this object creates (or is)
    fn pod_labels(&self) -> Option<&Labels>;
}

impl PodTemplateSource for Deployment {
    const KIND: WorkloadKind = WorkloadKind::Deployment;

    fn pod_labels(&self) -> Option<&Labels> {
        self.spec.as_ref()?.template.metadata.as_ref()?.labels.as_ref()
    }
}

impl PodTemplateSource for StatefulSet {
    const KIND: WorkloadKind = WorkloadKind::StatefulSet;

    fn pod_labels(&self) -> Option<&Labels> {
        self.spec.as_ref()?.template.metadata.as_ref()?.labels.as_ref()
    }
}

impl PodTemplateSource for DaemonSet {
    const KIND: WorkloadKind = WorkloadKind::DaemonSet;

    fn pod_labels(&self) -> Option<&Labels> {
        self.spec.as_ref()?.template.metadata.as_ref()?.labels.as_ref()
    }
}

impl PodTemplateSource for Job {
    const KIND: WorkloadKind = WorkloadKind::Job;

    fn pod_labels(&self) -> Option<&Labels> {
        self.spec.as_ref()?.template.metadata.as_ref()?.labels.as_ref()
    }
}

impl PodTemplateSource for CronJob {
    const KIND: WorkloadKind = WorkloadKind::CronJob;

    fn pod_labels(&self) -> Option<&Labels> {
        self.spec
            .as_ref()?
            .job_template
            .spec
            .as_ref()?
            .template
            .metadata
            .as_ref()?
            .labels
            .as_ref()
    }
}

impl PodTemplateSource for Pod {
    const KIND: WorkloadKind = WorkloadKind::Pod;

    fn pod_labels(&self) -> Option<&Labels> {
        self.metadata.labels.as_ref()
    }
}

/// Pod candidate strategy for one workload kind
pub struct WorkloadService<K> {
    client: Client,
    page_size: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K> WorkloadService<K> {
    pub fn new(client: Client, page_size: u32) -> Self {
        Self {
            client,
            page_size,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K: PodTemplateSource> PodCandidatesProvider for WorkloadService<K> {
    async fn get_pod_candidates_for_namespace(&self, namespace: &str) -> Result<Vec<PodCandidate>> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let items = list_all(&api, self.page_size)
            .await
            .with_context(|| format!("while listing {}s for namespace {}", K::KIND, namespace))?;

        Ok(to_candidates(namespace, &items))
    }
}

fn to_candidates<K: PodTemplateSource>(namespace: &str, items: &[K]) -> Vec<PodCandidate> {
    items
        .iter()
        .map(|item| {
            PodCandidate::new(
                K::KIND.owner_name(namespace, &item.name_any()),
                item.pod_labels().cloned().unwrap_or_default(),
            )
        })
        .collect()
}

/// Build the enabled strategies, keeping the configured order
pub fn workload_strategies(
    client: &Client,
    kinds: &[WorkloadKind],
    page_size: u32,
) -> Vec<(WorkloadKind, Arc<dyn PodCandidatesProvider>)> {
    kinds
        .iter()
        .map(|kind| {
            let client = client.clone();
            let provider: Arc<dyn PodCandidatesProvider> = match kind {
                WorkloadKind::Deployment => {
                    Arc::new(WorkloadService::<Deployment>::new(client, page_size))
                }
                WorkloadKind::StatefulSet => {
                    Arc::new(WorkloadService::<StatefulSet>::new(client, page_size))
                }
                WorkloadKind::DaemonSet => {
                    Arc::new(WorkloadService::<DaemonSet>::new(client, page_size))
                }
                WorkloadKind::Job => Arc::new(WorkloadService::<Job>::new(client, page_size)),
                WorkloadKind::CronJob => Arc::new(WorkloadService::<CronJob>::new(client, page_size)),
                WorkloadKind::Pod => Arc::new(WorkloadService::<Pod>::new(client, page_size)),
            };
            (*kind, provider)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::batch::v1::{CronJobSpec, JobSpec, JobTemplateSpec};
    use k8s_openapi::api::core::v1::PodTemplateSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn fix_labels(app: &str) -> Labels {
        [("app".to_string(), app.to_string())].into()
    }

    fn fix_meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("orders".to_string()),
            ..Default::default()
        }
    }

    fn fix_template(app: &str) -> PodTemplateSpec {
        PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(fix_labels(app)),
                ..Default::default()
            }),
            spec: None,
        }
    }

    #[test]
    fn test_deployment_uses_template_labels() {
        let deploy = Deployment {
            metadata: ObjectMeta {
                labels: Some(fix_labels("not-the-template")),
                ..fix_meta("orders-a")
            },
            spec: Some(DeploymentSpec {
                template: fix_template("orders-a"),
                ..Default::default()
            }),
            status: None,
        };

        let candidates = to_candidates("orders", &[deploy]);

        assert_eq!(
            candidates,
            vec![PodCandidate::new("deployment/orders/orders-a", fix_labels("orders-a"))]
        );
    }

    #[test]
    fn test_cronjob_uses_job_template_labels() {
        let cronjob = CronJob {
            metadata: fix_meta("nightly"),
            spec: Some(CronJobSpec {
                schedule: "0 0 * * *".to_string(),
                job_template: JobTemplateSpec {
                    metadata: None,
                    spec: Some(JobSpec {
                        template: fix_template("nightly"),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        };

        let candidates = to_candidates("orders", &[cronjob]);

        assert_eq!(candidates[0].owner_name, "cronjob/orders/nightly");
        assert_eq!(candidates[0].labels, fix_labels("nightly"));
    }

    #[test]
    fn test_pod_uses_own_labels() {
        let pod = Pod {
            metadata: ObjectMeta {
                labels: Some(fix_labels("debug")),
                ..fix_meta("debug-pod")
            },
            ..Default::default()
        };

        let candidates = to_candidates("orders", &[pod]);

        assert_eq!(candidates[0].owner_name, "pod/orders/debug-pod");
        assert_eq!(candidates[0].labels, fix_labels("debug"));
    }

    #[test]
    fn test_missing_template_gives_empty_labels() {
        let job = Job {
            metadata: fix_meta("migrate"),
            spec: None,
            status: None,
        };

        let candidates = to_candidates("orders", &[job]);

        assert_eq!(candidates[0].owner_name, "job/orders/migrate");
        assert!(candidates[0].labels.is_empty());
    }
}
