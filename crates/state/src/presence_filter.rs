//! Presence-update deduplication.
//!
//! A bot sharing many guilds with the same user receives one presence update
//! per guild within moments of each other. The filter remembers which users
//! changed presence recently — across all shards — and drops the repeats.
//! The memory is wiped every second by the maintenance task, so a false
//! positive can only suppress a legitimate second change for under a second,
//! and a false negative merely costs one extra write.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

/// Recently-seen user IDs, one sequence per shard.
#[derive(Debug)]
pub(crate) struct PresenceUpdateFilter {
    shards: RwLock<Vec<Vec<u64>>>,
}

impl PresenceUpdateFilter {
    pub(crate) fn new(num_shards: u32) -> Self {
        PresenceUpdateFilter {
            shards: RwLock::new(vec![Vec::new(); num_shards as usize]),
        }
    }

    /// Returns `true` when `user_id` was already seen this interval (the
    /// caller drops the update). Otherwise records it against `shard_id`
    /// and returns `false`.
    pub(crate) fn check_user(&self, shard_id: u32, user_id: u64) -> bool {
        let guard = self.shards.upgradable_read();
        if guard.iter().any(|seen| seen.contains(&user_id)) {
            return true;
        }
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        guard[shard_id as usize].push(user_id);
        false
    }

    /// Forgets everything. Called on a one-second tick.
    pub(crate) fn clear(&self) {
        for seen in self.shards.write().iter_mut() {
            seen.clear();
        }
    }
}
