//! The termination sequence for a selected node
//!
//! Steps run strictly in order: cordon, self-check, drain, cluster removal,
//! instance termination. Cordoning comes first so nothing new lands on the
//! node regardless of which branch follows, and the self-check gates every
//! destructive step after it. Nothing here is rolled back or retried: an
//! interrupted sequence leaves the node cordoned, and the next control-loop
//! iteration re-selects it and resumes from the self-check.

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::node::{NodeRecord, WorkloadRef};

use super::{identity, metrics, RecyclerState};

/// Terminal result of one termination sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecycleOutcome {
    /// Node drained, removed from the cluster, and its instance destroyed
    Recycled,

    /// Node object disappeared before the sequence could start
    NodeVanished,

    /// The node hosts this controller; only our own pod was evicted and the
    /// caller must stop the loop
    SelfEvicted,
}

/// Drive a selected node through the termination sequence
pub async fn recycle_node(state: &RecyclerState, node: &NodeRecord) -> Result<RecycleOutcome> {
    // Cordon before the self-check: a condemned node must not receive new
    // workloads even if we are about to die on it.
    if node.cordoned {
        info!("Node {} already cordoned", node.name);
    } else {
        info!("Cordoning node {}", node.name);
        match state.cluster.set_cordon(&node.name, true).await {
            Err(e) if e.is_not_found() => {
                info!("Node {} no longer exists, nothing to do", node.name);
                return Ok(RecycleOutcome::NodeVanished);
            }
            other => other?,
        }
    }

    if identity::is_self_node(state.cluster.as_ref(), &state.config, node).await? {
        info!(
            "Node {} hosts this controller; evicting only our own pod",
            node.name
        );
        let own = WorkloadRef {
            name: state.config.pod_name.clone(),
            namespace: state.config.pod_namespace.clone(),
            evictable: true,
        };
        state.cluster.evict(&own).await?;
        return Ok(RecycleOutcome::SelfEvicted);
    }

    drain(state, node).await?;

    info!("Removing node {} from the cluster", node.name);
    match state.cluster.delete_node(&node.name).await {
        Err(e) if e.is_not_found() => info!("Node {} was already removed", node.name),
        Err(e) => {
            return Err(Error::ClusterRemovalFailed {
                node: node.name.clone(),
                reason: e.to_string(),
            })
        }
        Ok(()) => {}
    }

    terminate_instance(state, node).await?;

    Ok(RecycleOutcome::Recycled)
}

/// Evict every evictable workload, then wait for the node to quiesce
///
/// Individual eviction failures are logged and do not stop the pass; a
/// workload that never leaves surfaces as a drain timeout instead.
async fn drain(state: &RecyclerState, node: &NodeRecord) -> Result<()> {
    let workloads = state.cluster.list_workloads_on(&node.name).await?;
    let evictable: Vec<&WorkloadRef> = workloads.iter().filter(|w| w.evictable).collect();

    info!(
        "Draining node {}: {} workloads to evict",
        node.name,
        evictable.len()
    );
    for workload in &evictable {
        match state.cluster.evict(workload).await {
            Ok(()) => {
                info!("Evicted {}", workload.qualified_name());
                metrics::inc_pod_eviction(true);
            }
            Err(e) => {
                warn!("Failed to evict {}: {}", workload.qualified_name(), e);
                metrics::inc_pod_eviction(false);
            }
        }
    }

    confirm_drained(state, node).await
}

/// Poll until no evictable workload remains on the node, bounded by the
/// configured drain timeout
async fn confirm_drained(state: &RecyclerState, node: &NodeRecord) -> Result<()> {
    let deadline = Instant::now() + state.config.drain_timeout;
    loop {
        let remaining = state
            .cluster
            .list_workloads_on(&node.name)
            .await?
            .iter()
            .filter(|w| w.evictable)
            .count();

        if remaining == 0 {
            info!("Node {} is quiescent", node.name);
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::DrainIncomplete {
                node: node.name.clone(),
                remaining,
            });
        }

        debug!(
            "Waiting for {} workloads to leave node {}",
            remaining, node.name
        );
        sleep(state.config.drain_poll_interval).await;
    }
}

/// Destroy the compute instance backing the node
async fn terminate_instance(state: &RecyclerState, node: &NodeRecord) -> Result<()> {
    if node.zone.is_empty() {
        return Err(Error::InstanceTerminationFailed {
            name: node.name.clone(),
            zone: String::new(),
            reason: "node carries no zone label".to_string(),
        });
    }

    let instance = match state.instances.find_instance(&node.name, &node.zone).await {
        Ok(instance) => instance,
        Err(Error::InstanceNotFound { name, zone }) => {
            warn!("Instance {} in zone {} already gone", name, zone);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    info!(
        "Terminating instance {} in zone {}",
        instance.name, instance.zone
    );
    state
        .instances
        .destroy_instance(&instance)
        .await
        .map_err(|e| match e {
            Error::InstanceTerminationFailed { .. } => e,
            other => Error::InstanceTerminationFailed {
                name: instance.name.clone(),
                zone: instance.zone.clone(),
                reason: other.to_string(),
            },
        })
}
