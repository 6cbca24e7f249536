//! In-memory fakes for exercising the recycler against scripted clusters

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::clients::{ClusterClient, InstanceClient, InstanceRef};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::{NodeRecord, WorkloadRef};

use super::RecyclerState;

pub fn test_config() -> Config {
    Config {
        age_to_kill: Duration::from_secs(12 * 3600),
        sleep_time: Duration::from_secs(1),
        eligibility_label: "cloud.google.com/gke-preemptible".to_string(),
        pod_name: "recycler-0".to_string(),
        pod_namespace: "kube-system".to_string(),
        gce_project: Some("test-project".to_string()),
        drain_timeout: Duration::ZERO,
        drain_poll_interval: Duration::from_millis(1),
        api_timeout: Duration::from_secs(5),
        assume_not_self_on_lookup_failure: false,
    }
}

pub fn node(name: &str, hours_old: i64) -> NodeRecord {
    NodeRecord {
        name: name.to_string(),
        zone: "us-east1-b".to_string(),
        creation_time: Utc::now() - ChronoDuration::hours(hours_old),
        eligible: true,
        cordoned: false,
    }
}

pub fn workload(namespace: &str, name: &str) -> WorkloadRef {
    WorkloadRef {
        name: name.to_string(),
        namespace: namespace.to_string(),
        evictable: true,
    }
}

pub fn unevictable(namespace: &str, name: &str) -> WorkloadRef {
    WorkloadRef {
        evictable: false,
        ..workload(namespace, name)
    }
}

fn not_found() -> Error {
    Error::KubeError(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: "not found".to_string(),
        reason: "NotFound".to_string(),
        code: 404,
    }))
}

/// Scripted cluster: nodes and workloads live in memory, every call is
/// recorded in order
#[derive(Default)]
pub struct FakeCluster {
    nodes: Mutex<Vec<NodeRecord>>,
    workloads: Mutex<BTreeMap<String, Vec<WorkloadRef>>>,
    sticky_workloads: BTreeSet<String>,
    own_node: Option<String>,
    list_fails: bool,
    cordon_missing: bool,
    delete_node_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn with_node(self, record: NodeRecord) -> Self {
        self.nodes.lock().unwrap().push(record);
        self
    }

    pub fn with_workloads(self, node_name: &str, workloads: Vec<WorkloadRef>) -> Self {
        self.workloads
            .lock()
            .unwrap()
            .insert(node_name.to_string(), workloads);
        self
    }

    /// Mark a workload whose eviction always fails
    pub fn with_sticky_workload(mut self, qualified_name: &str) -> Self {
        self.sticky_workloads.insert(qualified_name.to_string());
        self
    }

    pub fn with_own_node(mut self, node_name: &str) -> Self {
        self.own_node = Some(node_name.to_string());
        self
    }

    pub fn with_list_failure(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn with_cordon_missing(mut self) -> Self {
        self.cordon_missing = true;
        self
    }

    pub fn with_delete_node_failure(mut self) -> Self {
        self.delete_node_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        self.record("list_nodes".to_string());
        if self.list_fails {
            return Err(Error::KubeError(kube::Error::Api(
                kube::core::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "apiserver unreachable".to_string(),
                    reason: "ServiceUnavailable".to_string(),
                    code: 503,
                },
            )));
        }
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn set_cordon(&self, name: &str, cordoned: bool) -> Result<()> {
        self.record(format!("cordon:{}={}", name, cordoned));
        if self.cordon_missing {
            return Err(not_found());
        }
        for node in self.nodes.lock().unwrap().iter_mut() {
            if node.name == name {
                node.cordoned = cordoned;
            }
        }
        Ok(())
    }

    async fn list_workloads_on(&self, node_name: &str) -> Result<Vec<WorkloadRef>> {
        self.record(format!("list_workloads:{}", node_name));
        Ok(self
            .workloads
            .lock()
            .unwrap()
            .get(node_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn evict(&self, workload: &WorkloadRef) -> Result<()> {
        self.record(format!("evict:{}", workload.qualified_name()));
        if self.sticky_workloads.contains(&workload.qualified_name()) {
            return Err(Error::EvictionFailed {
                namespace: workload.namespace.clone(),
                name: workload.name.clone(),
                reason: "pod disruption budget".to_string(),
            });
        }
        for pods in self.workloads.lock().unwrap().values_mut() {
            pods.retain(|p| p.qualified_name() != workload.qualified_name());
        }
        Ok(())
    }

    async fn delete_node(&self, name: &str) -> Result<()> {
        self.record(format!("delete_node:{}", name));
        if self.delete_node_fails {
            return Err(Error::KubeError(kube::Error::Api(
                kube::core::ErrorResponse {
                    status: "Failure".to_string(),
                    message: "admission webhook rejected the delete".to_string(),
                    reason: "Forbidden".to_string(),
                    code: 403,
                },
            )));
        }
        self.nodes.lock().unwrap().retain(|n| n.name != name);
        Ok(())
    }

    async fn own_workload_location(&self) -> Result<String> {
        self.record("own_workload_location".to_string());
        self.own_node
            .clone()
            .ok_or_else(|| Error::SelfLookupFailed("own pod not found".to_string()))
    }
}

/// Scripted cloud provider
#[derive(Default)]
pub struct FakeInstances {
    missing: bool,
    destroy_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeInstances {
    pub fn with_missing_instance(mut self) -> Self {
        self.missing = true;
        self
    }

    pub fn with_destroy_failure(mut self) -> Self {
        self.destroy_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstanceClient for FakeInstances {
    async fn find_instance(&self, name: &str, zone: &str) -> Result<InstanceRef> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("find:{}/{}", zone, name));
        if self.missing {
            return Err(Error::InstanceNotFound {
                name: name.to_string(),
                zone: zone.to_string(),
            });
        }
        Ok(InstanceRef {
            name: name.to_string(),
            zone: zone.to_string(),
        })
    }

    async fn destroy_instance(&self, instance: &InstanceRef) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("destroy:{}/{}", instance.zone, instance.name));
        if self.destroy_fails {
            return Err(Error::InstanceTerminationFailed {
                name: instance.name.clone(),
                zone: instance.zone.clone(),
                reason: "quota exceeded".to_string(),
            });
        }
        Ok(())
    }
}

/// Wire fakes into a `RecyclerState`, keeping handles for assertions
pub fn state_with(
    cluster: FakeCluster,
    instances: FakeInstances,
) -> (Arc<FakeCluster>, Arc<FakeInstances>, RecyclerState) {
    let cluster = Arc::new(cluster);
    let instances = Arc::new(instances);
    let state = RecyclerState {
        cluster: cluster.clone(),
        instances: instances.clone(),
        config: test_config(),
    };
    (cluster, instances, state)
}
