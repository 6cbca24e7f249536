//! Age-based recycler for preemptible Kubernetes nodes
//!
//! Preemptible instances get reclaimed by the cloud provider with little
//! warning; recycling the oldest one proactively keeps that disruption on
//! our schedule instead of the provider's. Each cycle the controller lists
//! the nodes carrying the recycling-policy label, picks the oldest, and —
//! if it is over the configured age — cordons it, drains it, removes it
//! from the cluster and destroys the backing instance. When the selected
//! node turns out to host the controller itself, the controller evicts only
//! its own pod and exits so the scheduler can restart it on a younger node.

pub mod clients;
pub mod config;
pub mod error;
pub mod node;
pub mod recycler;
pub mod rest_api;
