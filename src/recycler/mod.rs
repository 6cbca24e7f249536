//! Age-based recycling of preemptible nodes
//!
//! Contains the periodic control loop and the leaf pieces it drives:
//! inventory, selection, identity resolution and the termination sequence.

pub mod identity;
pub mod inventory;
pub mod metrics;
pub mod selector;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::clients::{ClusterClient, InstanceClient};
use crate::config::Config;
use crate::error::Result;

pub use sequencer::RecycleOutcome;

/// Shared state for the recycler
pub struct RecyclerState {
    pub cluster: Arc<dyn ClusterClient>,
    pub instances: Arc<dyn InstanceClient>,
    pub config: Config,
}

/// What a single control-loop iteration did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No eligible node exists yet
    Idle,

    /// The oldest eligible node is still younger than the threshold
    BelowThreshold { node: String },

    /// A node was fully recycled
    Recycled { node: String },

    /// The selected node disappeared before it could be processed
    NodeVanished { node: String },

    /// The selected node hosts this controller; only our own pod was evicted
    SelfEvicted { node: String },
}

/// Run one selection and termination cycle
pub async fn run_cycle(state: &RecyclerState) -> Result<CycleOutcome> {
    let records = inventory::list_eligible_nodes(state.cluster.as_ref()).await?;

    let Some(node) = selector::select_oldest(records) else {
        debug!("No eligible nodes in the cluster");
        return Ok(CycleOutcome::Idle);
    };

    let age = node.age(Utc::now());
    metrics::set_oldest_node_age(age.as_secs_f64());

    if age <= state.config.age_to_kill {
        info!(
            "Oldest eligible node {} is {:.1}h old, below the {:.1}h threshold",
            node.name,
            age.as_secs_f64() / 3600.0,
            state.config.age_to_kill.as_secs_f64() / 3600.0
        );
        return Ok(CycleOutcome::BelowThreshold { node: node.name });
    }

    info!(
        "Node {} is {:.1}h old and will be recycled",
        node.name,
        age.as_secs_f64() / 3600.0
    );

    match sequencer::recycle_node(state, &node).await? {
        RecycleOutcome::Recycled => {
            metrics::inc_nodes_recycled();
            Ok(CycleOutcome::Recycled { node: node.name })
        }
        RecycleOutcome::NodeVanished => Ok(CycleOutcome::NodeVanished { node: node.name }),
        RecycleOutcome::SelfEvicted => {
            metrics::inc_self_evictions();
            Ok(CycleOutcome::SelfEvicted { node: node.name })
        }
    }
}

/// Main entry point: run cycles forever, sleeping between them
///
/// Returns only when the controller evicted itself; every other failure is
/// logged and retried on the next iteration.
pub async fn run_recycler(state: Arc<RecyclerState>) -> Result<()> {
    info!("Starting recycler loop");

    loop {
        match run_cycle(&state).await {
            Ok(CycleOutcome::SelfEvicted { node }) => {
                info!(
                    "This controller was running on {}; exiting so the scheduler can restart it elsewhere",
                    node
                );
                return Ok(());
            }
            Ok(CycleOutcome::Recycled { node }) => {
                info!("Node {} recycled successfully", node);
            }
            Ok(CycleOutcome::NodeVanished { node }) => {
                info!(
                    "Node {} disappeared mid-cycle; will re-evaluate next iteration",
                    node
                );
            }
            Ok(_) => {}
            Err(e) => {
                metrics::inc_cycle_failures();
                if e.is_alert() {
                    error!("Cycle failed and needs operator attention: {}", e);
                } else {
                    warn!("Cycle failed, retrying next iteration: {}", e);
                }
            }
        }

        debug!("Sleeping for {:?}", state.config.sleep_time);
        sleep(state.config.sleep_time).await;
    }
}
