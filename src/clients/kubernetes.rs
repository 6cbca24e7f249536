//! Kubernetes implementation of the cluster client
//!
//! Normalizes live `Node` and `Pod` objects into the plain records the
//! recycler consumes, and issues the cordon/evict/delete calls against the
//! API server.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{
    api::{Api, DeleteParams, EvictParams, ListParams, Patch, PatchParams},
    Client,
};
use tracing::debug;

use crate::clients::ClusterClient;
use crate::error::{Error, Result};
use crate::node::{NodeRecord, WorkloadRef};

/// Preferred and legacy zone labels; GKE still sets both
const ZONE_LABEL: &str = "topology.kubernetes.io/zone";
const ZONE_LABEL_BETA: &str = "failure-domain.beta.kubernetes.io/zone";

/// Annotation marking static (mirror) pods, which cannot be evicted
const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

/// Field manager recorded on cordon patches
const FIELD_MANAGER: &str = "node-recycler";

/// Cluster client backed by a live API server connection
pub struct KubeClusterClient {
    client: Client,
    eligibility_label: String,
    self_ref: Option<(String, String)>,
}

impl KubeClusterClient {
    pub fn new(client: Client, eligibility_label: impl Into<String>) -> Self {
        Self {
            client,
            eligibility_label: eligibility_label.into(),
            self_ref: None,
        }
    }

    /// Record the controller's own pod so `own_workload_location` can
    /// resolve it. Without this, self-lookups fail conservatively.
    pub fn with_self(mut self, pod_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.self_ref = Some((pod_name.into(), namespace.into()));
        self
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        Ok(nodes
            .items
            .iter()
            .filter_map(|n| record_from_node(n, &self.eligibility_label))
            .collect())
    }

    async fn set_cordon(&self, name: &str, cordoned: bool) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "spec": { "unschedulable": cordoned } });
        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn list_workloads_on(&self, node_name: &str) -> Result<Vec<WorkloadRef>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&format!("spec.nodeName={}", node_name));
        let pods = api.list(&params).await?;
        Ok(pods.items.iter().filter_map(workload_from_pod).collect())
    }

    async fn evict(&self, workload: &WorkloadRef) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &workload.namespace);
        api.evict(&workload.name, &EvictParams::default())
            .await
            .map_err(|e| Error::EvictionFailed {
                namespace: workload.namespace.clone(),
                name: workload.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn delete_node(&self, name: &str) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn own_workload_location(&self) -> Result<String> {
        let (pod_name, namespace) = self.self_ref.as_ref().ok_or_else(|| {
            Error::SelfLookupFailed("controller identity not configured".to_string())
        })?;
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get(pod_name).await?;
        pod.spec.and_then(|s| s.node_name).ok_or_else(|| {
            Error::SelfLookupFailed(format!(
                "pod {}/{} has no assigned node",
                namespace, pod_name
            ))
        })
    }
}

/// Normalize a live node into a record. Nodes without a name or creation
/// timestamp are skipped.
fn record_from_node(node: &Node, eligibility_label: &str) -> Option<NodeRecord> {
    let name = node.metadata.name.clone()?;
    let creation_time = node.metadata.creation_timestamp.as_ref()?.0;
    let labels = node.metadata.labels.clone().unwrap_or_default();

    let zone = labels
        .get(ZONE_LABEL)
        .or_else(|| labels.get(ZONE_LABEL_BETA))
        .cloned()
        .unwrap_or_default();
    if zone.is_empty() {
        debug!("Node {} carries no zone label", name);
    }

    Some(NodeRecord {
        eligible: labels.contains_key(eligibility_label),
        cordoned: node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false),
        name,
        zone,
        creation_time,
    })
}

/// Normalize a pod into a workload reference, marking whether an eviction
/// would be meaningful
fn workload_from_pod(pod: &Pod) -> Option<WorkloadRef> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());

    let mirror = pod
        .metadata
        .annotations
        .as_ref()
        .map(|a| a.contains_key(MIRROR_POD_ANNOTATION))
        .unwrap_or(false);
    let daemon = pod
        .metadata
        .owner_references
        .as_ref()
        .map(|refs| refs.iter().any(|r| r.kind == "DaemonSet"))
        .unwrap_or(false);
    let finished = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|p| p == "Succeeded" || p == "Failed")
        .unwrap_or(false);

    Some(WorkloadRef {
        name,
        namespace,
        evictable: !(mirror || daemon || finished),
    })
}
