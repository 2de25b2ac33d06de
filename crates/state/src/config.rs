//! Tracker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Options controlling what the tracker persists and how.
///
/// Every boolean defaults to off; an empty `Options::default()` yields a
/// tracker that stores guilds, channels, roles, and emojis (those have no
/// opt-out) in a per-run temporary directory.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Store directory. `None` picks a fresh temporary directory that is
    /// removed when the tracker drops.
    pub db_path: Option<PathBuf>,

    /// Spawn the per-shard receiver tasks needed by
    /// [`SyncMode::Channel`](crate::SyncMode::Channel). Without this, events
    /// handed over in channel mode are dropped with a warning.
    pub use_channel_sync_mode: bool,

    /// Track messages. Requires [`Options::message_ttl`].
    pub track_messages: bool,

    /// How long message rows live before they expire. Required when
    /// `track_messages` is set; open fails with a misconfiguration error
    /// otherwise.
    pub message_ttl: Option<Duration>,

    /// Track presence updates.
    pub track_presences: bool,

    /// Track guild members.
    pub track_members: bool,

    /// Track roles.
    pub track_roles: bool,

    /// Track channels.
    pub track_channels: bool,

    /// Keep message rows from a previous run. When unset the store
    /// directory is wiped on open; when set, everything except messages is
    /// flushed and rebuilt from the ready burst.
    pub keep_old_messages_on_start: bool,

    /// Soft-delete messages by flagging them instead of removing the row.
    /// The row remains readable (and expires on its original TTL) until the
    /// sweep reclaims it.
    pub keep_deleted_messages: bool,
}
