//! Node inventory: a fresh, filtered snapshot of the cluster per iteration

use tracing::debug;

use crate::clients::ClusterClient;
use crate::error::{Error, Result};
use crate::node::NodeRecord;

/// List the nodes currently subject to the recycling policy
///
/// A failed cluster query surfaces as `InventoryUnavailable`, which the
/// control loop treats as transient. Ordering is unspecified here; the
/// selector owns it.
pub async fn list_eligible_nodes(cluster: &dyn ClusterClient) -> Result<Vec<NodeRecord>> {
    let nodes = cluster
        .list_nodes()
        .await
        .map_err(|e| Error::InventoryUnavailable(e.to_string()))?;

    let total = nodes.len();
    let eligible: Vec<NodeRecord> = nodes.into_iter().filter(|n| n.eligible).collect();
    debug!(
        "{} of {} nodes are eligible for recycling",
        eligible.len(),
        total
    );
    Ok(eligible)
}
