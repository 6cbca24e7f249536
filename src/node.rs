//! Shared snapshot types describing cluster state
//!
//! Records are rebuilt from live queries on every control-loop iteration;
//! nothing here is persisted or cached across iterations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a cluster node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Node name, unique within the cluster
    pub name: String,

    /// Zone hosting the backing instance; empty when the node carries no
    /// zone label
    pub zone: String,

    /// Creation timestamp reported by the API server
    pub creation_time: DateTime<Utc>,

    /// Whether the node carries the recycling-policy label
    pub eligible: bool,

    /// Whether scheduling is currently disabled on the node
    pub cordoned: bool,
}

impl NodeRecord {
    /// Age of the node at `now`, clamped to zero if the API server clock is
    /// ahead of ours
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.creation_time).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Reference to a single workload (pod) scheduled on a node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,

    /// False for mirror pods, DaemonSet pods and pods already in a terminal
    /// phase; evicting those is impossible or pointless and they must not
    /// hold up a drain
    pub evictable: bool,
}

impl WorkloadRef {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn record(created: DateTime<Utc>) -> NodeRecord {
        NodeRecord {
            name: "node-1".to_string(),
            zone: "us-east1-b".to_string(),
            creation_time: created,
            eligible: true,
            cordoned: false,
        }
    }

    #[test]
    fn age_is_elapsed_time_since_creation() {
        let now = Utc::now();
        let node = record(now - ChronoDuration::hours(20));
        assert_eq!(node.age(now), Duration::from_secs(20 * 3600));
    }

    #[test]
    fn age_clamps_to_zero_on_clock_skew() {
        let now = Utc::now();
        let node = record(now + ChronoDuration::minutes(5));
        assert_eq!(node.age(now), Duration::ZERO);
    }

    #[test]
    fn qualified_name_joins_namespace_and_name() {
        let workload = WorkloadRef {
            name: "web-1".to_string(),
            namespace: "default".to_string(),
            evictable: true,
        };
        assert_eq!(workload.qualified_name(), "default/web-1");
    }
}
