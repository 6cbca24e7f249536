//! Prometheus metrics for the node recycler

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

/// Labels for per-eviction counters
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EvictionLabels {
    pub outcome: String,
}

/// Nodes taken through the full termination sequence
pub static NODES_RECYCLED: Lazy<Counter> = Lazy::new(Counter::default);

/// Times the controller found itself on the selected node and evicted itself
pub static SELF_EVICTIONS: Lazy<Counter> = Lazy::new(Counter::default);

/// Pod evictions issued during drains, by outcome
pub static POD_EVICTIONS: Lazy<Family<EvictionLabels, Counter>> = Lazy::new(Family::default);

/// Control-loop cycles that ended in an error
pub static CYCLE_FAILURES: Lazy<Counter> = Lazy::new(Counter::default);

/// Age of the oldest eligible node at the last observation
pub static OLDEST_NODE_AGE: Lazy<Gauge<f64, AtomicU64>> = Lazy::new(Gauge::default);

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();
    registry.register(
        "recycler_nodes_recycled",
        "Nodes fully drained, removed and terminated",
        NODES_RECYCLED.clone(),
    );
    registry.register(
        "recycler_self_evictions",
        "Times the controller evicted its own pod",
        SELF_EVICTIONS.clone(),
    );
    registry.register(
        "recycler_pod_evictions",
        "Pod evictions issued during node drains",
        POD_EVICTIONS.clone(),
    );
    registry.register(
        "recycler_cycle_failures",
        "Control-loop cycles that failed",
        CYCLE_FAILURES.clone(),
    );
    registry.register(
        "recycler_oldest_node_age_seconds",
        "Age of the oldest eligible node in seconds",
        OLDEST_NODE_AGE.clone(),
    );
    registry
});

pub fn inc_nodes_recycled() {
    NODES_RECYCLED.inc();
}

pub fn inc_self_evictions() {
    SELF_EVICTIONS.inc();
}

pub fn inc_pod_eviction(success: bool) {
    let outcome = if success { "evicted" } else { "failed" };
    POD_EVICTIONS
        .get_or_create(&EvictionLabels {
            outcome: outcome.to_string(),
        })
        .inc();
}

pub fn inc_cycle_failures() {
    CYCLE_FAILURES.inc();
}

pub fn set_oldest_node_age(seconds: f64) {
    OLDEST_NODE_AGE.set(seconds);
}
