//! Central error types for the node recycler
//!
//! Uses `thiserror` for ergonomic, type-safe error handling with
//! automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Central error type for the node recycler
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error from kube-rs
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// HTTP request error (from reqwest)
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The cluster could not be queried for nodes this cycle
    #[error("Node inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// The controller could not determine which node it is running on
    #[error("Could not resolve controller's own host: {0}")]
    SelfLookupFailed(String),

    /// A single workload refused to be evicted
    #[error("Eviction of {namespace}/{name} failed: {reason}")]
    EvictionFailed {
        namespace: String,
        name: String,
        reason: String,
    },

    /// Workloads were still present on the node when the drain deadline passed
    #[error("{remaining} workloads still on node {node} after drain deadline")]
    DrainIncomplete { node: String, remaining: usize },

    /// The node object could not be detached from the cluster
    #[error("Failed to remove node {node} from the cluster: {reason}")]
    ClusterRemovalFailed { node: String, reason: String },

    /// No compute instance backs the node
    #[error("Instance {name} in zone {zone} not found")]
    InstanceNotFound { name: String, zone: String },

    /// The backing instance could not be destroyed; it keeps billing until
    /// an operator intervenes
    #[error("Failed to terminate instance {name} in zone {zone}: {reason}")]
    InstanceTerminationFailed {
        name: String,
        zone: String,
        reason: String,
    },
}

/// Result type alias for recycler operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Check if this error type is expected to clear on a later cycle
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::KubeError(_)
                | Error::HttpError(_)
                | Error::InventoryUnavailable(_)
                | Error::EvictionFailed { .. }
                | Error::DrainIncomplete { .. }
                | Error::ClusterRemovalFailed { .. }
        )
    }

    /// Check if this error must reach an operator rather than be retried
    /// silently
    pub fn is_alert(&self) -> bool {
        matches!(self, Error::InstanceTerminationFailed { .. })
    }

    /// Check if this error is the API server reporting a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KubeError(kube::Error::Api(resp)) if resp.code == 404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> Error {
        Error::KubeError(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "TestReason".to_string(),
            code,
        }))
    }

    #[test]
    fn not_found_matches_only_404() {
        assert!(api_error(404).is_not_found());
        assert!(!api_error(500).is_not_found());
        assert!(!Error::ConfigError("x".to_string()).is_not_found());
    }

    #[test]
    fn instance_termination_is_alert_worthy() {
        let err = Error::InstanceTerminationFailed {
            name: "node-1".to_string(),
            zone: "us-east1-b".to_string(),
            reason: "quota".to_string(),
        };
        assert!(err.is_alert());
        assert!(!err.is_retriable());
    }

    #[test]
    fn transient_errors_are_retriable() {
        assert!(Error::InventoryUnavailable("timeout".to_string()).is_retriable());
        assert!(Error::DrainIncomplete {
            node: "n".to_string(),
            remaining: 2
        }
        .is_retriable());
        assert!(!Error::ConfigError("bad".to_string()).is_retriable());
    }
}
