//! Persistent sharded gateway state cache.
//!
//! Maintains a queryable materialized view of the world described by a
//! high-rate gateway event stream, spilled to an embedded KV store so
//! tracked state can exceed RAM. The pieces:
//!
//! - One worker per shard serializes that shard's mutations and owns its
//!   encode/decode buffers ([`SyncMode`] picks how callers hand events over)
//! - Mutators apply each event type inside retried store transactions
//! - Accessors and iterators read concurrently through snapshots
//! - A maintenance task sweeps expired records, compacts the store, and
//!   clears the presence dedup ring
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use shardview::{Options, StateTracker, SyncMode};
//! use shardview_types::{GatewayEvent, Guild};
//!
//! let tracker = StateTracker::open(
//!     2,
//!     Options { track_channels: true, ..Default::default() },
//! )
//! .await?;
//!
//! let guild = Guild { id: "100".into(), name: "A".into(), ..Default::default() };
//! tracker.handle_event(0, GatewayEvent::GuildCreate(guild), SyncMode::Mutex).await?;
//! assert_eq!(tracker.guild("100")?.name, "A");
//! tracker.close();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod accessors;
mod config;
mod dispatch;
mod error;
mod iterators;
mod maintenance;
mod mutators;
mod presence_filter;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::TempDir;
use tokio::sync::broadcast;

use shardview_store::{wipe_dir, Store};
use shardview_types::User;

pub use config::Options;
pub use dispatch::SyncMode;
pub use error::{EventError, Result, StoreError};
pub use shardview_store::RecordFlags;

use presence_filter::PresenceUpdateFilter;
use worker::ShardWorker;

/// The state tracker: one instance per process, shared behind an `Arc`.
#[derive(Debug)]
pub struct StateTracker {
    pub(crate) store: Store,
    pub(crate) opts: Options,
    pub(crate) workers: Vec<Arc<ShardWorker>>,
    /// In-memory mirror of the persisted self-user row for lock-cheap
    /// hot-path reads.
    pub(crate) self_user: RwLock<Option<User>>,
    pub(crate) presence_filter: PresenceUpdateFilter,
    pub(crate) shutdown: broadcast::Sender<()>,
    /// Keeps a per-run temporary store directory alive (and removes it on
    /// drop) when no explicit path was configured.
    _temp_dir: Option<TempDir>,
}

impl StateTracker {
    /// Opens the tracker: prepares the store directory, opens the store
    /// (verifying the on-disk format version), builds one worker per shard,
    /// and spawns the background tasks. Must be called within a tokio
    /// runtime.
    ///
    /// `num_shards` below 1 is clamped to 1.
    ///
    /// # Errors
    ///
    /// - `StoreError::Misconfiguration` when `track_messages` is set
    ///   without a `message_ttl`.
    /// - `StoreError::DifferentFormatVersion` when reusing a directory
    ///   written by an incompatible build (only reachable with
    ///   `keep_old_messages_on_start`, which skips the wipe).
    /// - `StoreError::Io` / `StoreError::Storage` on filesystem or engine
    ///   failures.
    pub async fn open(num_shards: u32, opts: Options) -> Result<Arc<StateTracker>> {
        let num_shards = num_shards.max(1);

        if opts.track_messages && opts.message_ttl.is_none() {
            return Err(StoreError::Misconfiguration {
                message: "track_messages requires message_ttl".into(),
            });
        }

        let (dir, temp_dir) = resolve_dir(&opts)?;
        let store = Store::open(&dir)?;

        if opts.keep_old_messages_on_start {
            let removed = store.flush_old_data(true)?;
            tracing::info!(removed, "flushed stale state, keeping messages");
        }

        let mut workers = Vec::with_capacity(num_shards as usize);
        let mut receivers = Vec::with_capacity(num_shards as usize);
        for shard_id in 0..num_shards {
            let (worker, rx) = ShardWorker::new(shard_id);
            workers.push(worker);
            receivers.push(rx);
        }

        let (shutdown, _) = broadcast::channel(1);
        let tracker = Arc::new(StateTracker {
            store,
            opts,
            workers,
            self_user: RwLock::new(None),
            presence_filter: PresenceUpdateFilter::new(num_shards),
            shutdown,
            _temp_dir: temp_dir,
        });

        if tracker.opts.use_channel_sync_mode {
            for (worker, rx) in tracker.workers.iter().zip(receivers) {
                tokio::spawn(worker::run(
                    Arc::downgrade(&tracker),
                    Arc::clone(worker),
                    rx,
                    tracker.shutdown.subscribe(),
                ));
            }
        }

        maintenance::spawn(&tracker);

        tracing::info!(num_shards, "state tracker open");
        Ok(tracker)
    }

    /// Signals shutdown: workers finish the event they are on, queued
    /// events are dropped, and the maintenance tickers stop. The store
    /// itself closes when the last `Arc` drops.
    pub fn close(&self) {
        let _ = self.shutdown.send(());
    }
}

fn resolve_dir(opts: &Options) -> Result<(PathBuf, Option<TempDir>)> {
    match &opts.db_path {
        Some(path) => {
            if !opts.keep_old_messages_on_start {
                // Fresh session: drop the previous run's state wholesale
                // rather than row by row.
                wipe_dir(path)?;
            }
            Ok((path.clone(), None))
        }
        None => {
            let temp = tempfile::Builder::new()
                .prefix("shardview-")
                .tempdir()
                .map_err(|source| StoreError::Io { path: std::env::temp_dir(), source })?;
            Ok((temp.path().to_path_buf(), Some(temp)))
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Builds a tracker without spawning background tasks, so mutators can
    //! be exercised synchronously.

    use super::*;

    pub(crate) fn tracker(opts: Options) -> (tempfile::TempDir, Arc<StateTracker>) {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let store = Store::open(dir.path()).expect("open store");

        let num_shards = 1;
        let (worker, _rx) = ShardWorker::new(0);
        let (shutdown, _) = broadcast::channel(1);

        let tracker = Arc::new(StateTracker {
            store,
            opts,
            workers: vec![worker],
            self_user: RwLock::new(None),
            presence_filter: PresenceUpdateFilter::new(num_shards),
            shutdown,
            _temp_dir: None,
        });
        (dir, tracker)
    }

    pub(crate) fn worker_buffers() -> crate::worker::WorkerInner {
        crate::worker::WorkerInner::default()
    }
}
