//! Resolution of the controller's own placement
//!
//! Unknown identity blocks destruction: if we cannot tell whether the
//! candidate hosts this controller, the cycle aborts unless the deployment
//! explicitly opted into assuming otherwise.

use tracing::warn;

use crate::clients::ClusterClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::NodeRecord;

/// Check whether `candidate` is the node hosting this controller's pod
pub async fn is_self_node(
    cluster: &dyn ClusterClient,
    config: &Config,
    candidate: &NodeRecord,
) -> Result<bool> {
    match cluster.own_workload_location().await {
        Ok(host) => Ok(host == candidate.name),
        Err(e) if config.assume_not_self_on_lookup_failure => {
            warn!(
                "Could not resolve our own node ({}); proceeding as configured",
                e
            );
            Ok(false)
        }
        Err(Error::SelfLookupFailed(msg)) => Err(Error::SelfLookupFailed(msg)),
        Err(e) => Err(Error::SelfLookupFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recycler::testutil::{node, test_config, FakeCluster};

    #[tokio::test]
    async fn matches_when_our_pod_runs_on_the_candidate() {
        let cluster = FakeCluster::default().with_own_node("node-a");
        let config = test_config();

        assert!(is_self_node(&cluster, &config, &node("node-a", 20))
            .await
            .unwrap());
        assert!(!is_self_node(&cluster, &config, &node("node-b", 20))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn lookup_failure_is_conservative_by_default() {
        let cluster = FakeCluster::default();
        let config = test_config();

        let err = is_self_node(&cluster, &config, &node("node-a", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SelfLookupFailed(_)));
    }

    #[tokio::test]
    async fn lookup_failure_can_be_waved_through_explicitly() {
        let cluster = FakeCluster::default();
        let mut config = test_config();
        config.assume_not_self_on_lookup_failure = true;

        assert!(!is_self_node(&cluster, &config, &node("node-a", 20))
            .await
            .unwrap());
    }
}
