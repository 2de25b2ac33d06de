//! Per-shard workers.
//!
//! One worker exists per shard. A worker owns the encode and decode buffers
//! its mutators reuse, guarded by a mutex that doubles as the shard's
//! serialization primitive: no two mutators for the same shard ever run
//! concurrently, whichever sync mode delivered the event.

use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, mpsc, Mutex};

use shardview_types::GatewayEvent;

use crate::StateTracker;

/// Capacity of the per-shard event queue used in channel sync mode.
pub(crate) const EVENT_QUEUE_CAPACITY: usize = 10;

/// Buffers owned by one shard, reused across its events.
#[derive(Default, Debug)]
pub(crate) struct WorkerInner {
    /// Staging buffer for record encoding. The store copies out of it on
    /// insert, so it is free again once a set returns.
    pub(crate) encode_buf: Vec<u8>,
    /// Staging buffer for hot-path reads.
    pub(crate) decode_buf: Vec<u8>,
}

/// One shard's worker.
#[derive(Debug)]
pub(crate) struct ShardWorker {
    pub(crate) shard_id: u32,
    /// Serializes all mutations for this shard and protects the buffers.
    pub(crate) inner: Mutex<WorkerInner>,
    /// Queue feeding the receiver task in channel sync mode.
    pub(crate) tx: mpsc::Sender<GatewayEvent>,
}

impl ShardWorker {
    /// Builds the worker and its queue receiver. The receiver is spawned by
    /// the tracker only when channel sync mode is enabled; otherwise it is
    /// dropped and channel-mode sends fail fast instead of queueing into
    /// nowhere.
    pub(crate) fn new(shard_id: u32) -> (Arc<ShardWorker>, mpsc::Receiver<GatewayEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let worker = Arc::new(ShardWorker {
            shard_id,
            inner: Mutex::new(WorkerInner::default()),
            tx,
        });
        (worker, rx)
    }
}

/// Receiver loop for channel sync mode: applies queued events one at a time
/// until shutdown fires or the tracker goes away. Handler errors are logged
/// and the loop keeps going; a persistently failing store shows up in the
/// log, not on the caller.
pub(crate) async fn run(
    tracker: Weak<StateTracker>,
    worker: Arc<ShardWorker>,
    mut rx: mpsc::Receiver<GatewayEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                let Some(tracker) = tracker.upgrade() else { break };
                let mut inner = worker.inner.lock().await;
                if let Err(e) = tracker.apply_event(&mut inner, worker.shard_id, &event) {
                    tracing::error!(shard = worker.shard_id, error = %e, "failed applying event");
                }
            }
        }
    }
    tracing::debug!(shard = worker.shard_id, "shard worker stopped");
}
