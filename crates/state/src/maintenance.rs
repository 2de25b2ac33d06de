//! Background maintenance: the presence-ring clear and store GC tickers.

use std::sync::{Arc, Weak};
use std::time::Duration;

use shardview_store::{now_ms, Error as StoreError};

use crate::StateTracker;

/// How often the presence dedup ring forgets everything.
const RING_CLEAR_INTERVAL: Duration = Duration::from_secs(1);

/// How often expired records are swept and the store compacted.
const GC_INTERVAL: Duration = Duration::from_secs(60);

/// Cap on deletions per sweep transaction.
const SWEEP_BATCH: usize = 10_000;

/// Spawns the maintenance task. It holds the tracker weakly, so it winds
/// down on shutdown or as soon as the tracker is dropped.
pub(crate) fn spawn(tracker: &Arc<StateTracker>) {
    let weak: Weak<StateTracker> = Arc::downgrade(tracker);
    let mut shutdown = tracker.shutdown.subscribe();

    tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        let mut ring_tick =
            tokio::time::interval_at(start + RING_CLEAR_INTERVAL, RING_CLEAR_INTERVAL);
        let mut gc_tick = tokio::time::interval_at(start + GC_INTERVAL, GC_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ring_tick.tick() => {
                    let Some(tracker) = weak.upgrade() else { break };
                    tracker.presence_filter.clear();
                }
                _ = gc_tick.tick() => {
                    let Some(tracker) = weak.upgrade() else { break };
                    tracker.run_gc();
                }
            }
        }
        tracing::debug!("maintenance task stopped");
    });
}

impl StateTracker {
    /// One GC cycle: sweep expired records, then compact the store.
    pub(crate) fn run_gc(&self) {
        tracing::info!("starting store gc");

        match self.store.sweep_expired(now_ms(), SWEEP_BATCH) {
            Ok(removed) if removed > 0 => tracing::info!(removed, "swept expired records"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
        }

        match self.store.compact() {
            Ok(_) => {}
            Err(StoreError::Conflict) => {
                // A transaction held the store; next cycle gets it.
                tracing::warn!("store busy, skipping compaction");
            }
            Err(e) => tracing::warn!(error = %e, "compaction failed"),
        }

        tracing::info!("store gc done");
    }
}
