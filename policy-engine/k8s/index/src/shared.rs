use crate::snapshot::Snapshot;
use arc_swap::ArcSwap;
use policy_engine_core::{AllowedResult, Flow};
use std::sync::Arc;

/// The installed snapshot. Replaced whole, never modified in place.
type SharedSnapshot = Arc<ArcSwap<Snapshot>>;

/// Publishes snapshots. Owned by the index, so there is only ever a single writer.
#[derive(Debug)]
pub(crate) struct Writer(SharedSnapshot);

/// Evaluates flows against the most recently published snapshot without blocking the writer.
#[derive(Clone, Debug)]
pub struct SnapshotReader(SharedSnapshot);

pub(crate) fn pair() -> (Writer, SnapshotReader) {
    let shared = SharedSnapshot::new(ArcSwap::from_pointee(Snapshot::default()));
    (Writer(shared.clone()), SnapshotReader(shared))
}

// === impl Writer ===

impl Writer {
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        tracing::debug!(generation = snapshot.generation(), "Publishing snapshot");
        self.0.store(Arc::new(snapshot));
    }
}

// === impl SnapshotReader ===

impl SnapshotReader {
    /// Returns the current snapshot. The snapshot remains valid after newer ones are published.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.0.load_full()
    }

    pub fn evaluate(&self, flow: &Flow) -> AllowedResult {
        self.0.load().evaluate(flow)
    }
}
