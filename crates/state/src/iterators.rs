//! Prefix-scoped iteration over tracked entities.
//!
//! Callbacks return `true` to keep iterating. Each call runs inside its own
//! read snapshot, so a scan observes a consistent point-in-time view.
//! Message callbacks additionally receive the row's flag byte.

use shardview_store::{keys, RecordFlags};
use shardview_types::{Guild, Member, Message, Presence, VoiceState};

use crate::error::Result;
use crate::StateTracker;

impl StateTracker {
    /// Visits every guild in ascending ID order.
    pub fn iterate_guilds(&self, mut f: impl FnMut(Guild) -> bool) -> Result<()> {
        self.store.snapshot()?.scan_values(&keys::guild_prefix(), |_, guild| f(guild))
    }

    /// Visits every member of a guild in ascending user-ID order.
    pub fn iterate_guild_members(
        &self,
        guild_id: &str,
        mut f: impl FnMut(Member) -> bool,
    ) -> Result<()> {
        self.store.snapshot()?.scan_values(&keys::member_prefix(guild_id), |_, member| f(member))
    }

    /// Visits every voice state of a guild.
    pub fn iterate_guild_voice_states(
        &self,
        guild_id: &str,
        mut f: impl FnMut(VoiceState) -> bool,
    ) -> Result<()> {
        self.store
            .snapshot()?
            .scan_values(&keys::voice_state_prefix(guild_id), |_, voice| f(voice))
    }

    /// Visits every tracked presence.
    pub fn iterate_presences(&self, mut f: impl FnMut(Presence) -> bool) -> Result<()> {
        self.store.snapshot()?.scan_values(&keys::presence_prefix(), |_, presence| f(presence))
    }

    /// Visits a channel's messages oldest-first (ascending snowflake).
    pub fn iterate_channel_messages(
        &self,
        channel_id: &str,
        mut f: impl FnMut(RecordFlags, Message) -> bool,
    ) -> Result<()> {
        self.store
            .snapshot()?
            .scan_values(&keys::channel_message_prefix(channel_id), |meta, message| {
                f(meta.flags, message)
            })
    }

    /// Visits a channel's messages newest-first. Snowflakes are
    /// time-ordered, so the reverse scan from the channel's maximum
    /// possible key yields strictly descending message IDs.
    pub fn iterate_channel_messages_newest_first(
        &self,
        channel_id: &str,
        mut f: impl FnMut(RecordFlags, Message) -> bool,
    ) -> Result<()> {
        self.store.snapshot()?.scan_values_rev(
            &keys::channel_message_prefix(channel_id),
            &keys::last_message_seek(channel_id),
            |meta, message| f(meta.flags, message),
        )
    }

    /// Visits every message of every channel.
    pub fn iterate_all_messages(
        &self,
        mut f: impl FnMut(RecordFlags, Message) -> bool,
    ) -> Result<()> {
        self.store
            .snapshot()?
            .scan_values(&keys::message_prefix(), |meta, message| f(meta.flags, message))
    }

    /// The newest messages of a channel, newest first. `limit == 0` returns
    /// them all. Soft-deleted rows are skipped unless `include_deleted`.
    pub fn last_channel_messages(
        &self,
        channel_id: &str,
        limit: usize,
        include_deleted: bool,
    ) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        self.iterate_channel_messages_newest_first(channel_id, |flags, message| {
            if !include_deleted && flags.contains(RecordFlags::DELETED) {
                return true;
            }
            messages.push(message);
            limit == 0 || messages.len() < limit
        })?;
        Ok(messages)
    }
}
