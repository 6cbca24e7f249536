//! Client seams for the orchestrator and the cloud provider
//!
//! The recycler core talks to Kubernetes and GCE exclusively through these
//! traits, so the termination sequence can be exercised against in-memory
//! fakes.

pub mod gce;
pub mod kubernetes;

use async_trait::async_trait;

use crate::error::Result;
use crate::node::{NodeRecord, WorkloadRef};

/// A resolved compute instance backing a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceRef {
    pub name: String,
    pub zone: String,
}

/// Operations the recycler needs from the container orchestrator
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List every node in the cluster as a normalized record
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>>;

    /// Enable or disable scheduling on a node
    async fn set_cordon(&self, name: &str, cordoned: bool) -> Result<()>;

    /// List the workloads currently scheduled on a node
    async fn list_workloads_on(&self, node_name: &str) -> Result<Vec<WorkloadRef>>;

    /// Request a controlled eviction of a single workload
    async fn evict(&self, workload: &WorkloadRef) -> Result<()>;

    /// Detach a node object from the cluster
    async fn delete_node(&self, name: &str) -> Result<()>;

    /// Name of the node hosting this controller's own pod
    async fn own_workload_location(&self) -> Result<String>;
}

/// Operations the recycler needs from the cloud provider
#[async_trait]
pub trait InstanceClient: Send + Sync {
    /// Resolve the compute instance backing a node
    async fn find_instance(&self, name: &str, zone: &str) -> Result<InstanceRef>;

    /// Destroy a compute instance
    async fn destroy_instance(&self, instance: &InstanceRef) -> Result<()>;
}
