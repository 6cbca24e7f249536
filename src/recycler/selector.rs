//! Deterministic oldest-node selection

use crate::node::NodeRecord;

/// Pick the oldest record. Ties on creation time break by name so
/// equal-aged nodes select identically across iterations.
///
/// An empty input means "nothing eligible exists yet" and returns `None`;
/// it is not an error.
pub fn select_oldest(mut records: Vec<NodeRecord>) -> Option<NodeRecord> {
    records.sort_by(|a, b| {
        a.creation_time
            .cmp(&b.creation_time)
            .then_with(|| a.name.cmp(&b.name))
    });
    records.into_iter().next()
}
