//! Single-entity read APIs.
//!
//! Each accessor opens its own read snapshot; readers run concurrently with
//! the shard workers and never block them. `NotFound` surfaces verbatim.

use shardview_store::{keys, RecordFlags};
use shardview_types::{Channel, Guild, Member, Message, Presence, User, VoiceState};

use crate::error::Result;
use crate::StateTracker;

impl StateTracker {
    /// The bot user from the most recent ready payload of any shard, or
    /// `None` before the first ready. Served from the in-memory mirror, no
    /// store access.
    #[must_use]
    pub fn self_user(&self) -> Option<User> {
        self.self_user.read().clone()
    }

    /// Fetches a guild. Its `members`, `presences`, and `voice_states` are
    /// always empty — those are queried separately.
    pub fn guild(&self, guild_id: &str) -> Result<Guild> {
        self.store.get(&keys::guild_key(guild_id)).map(|(g, _)| g)
    }

    /// Fetches one guild member.
    pub fn member(&self, guild_id: &str, user_id: &str) -> Result<Member> {
        self.store.get(&keys::member_key(guild_id, user_id)).map(|(m, _)| m)
    }

    /// Fetches a channel.
    pub fn channel(&self, channel_id: &str) -> Result<Channel> {
        self.store.get(&keys::channel_key(channel_id)).map(|(c, _)| c)
    }

    /// Fetches a message along with its flag byte, so callers can tell a
    /// soft-deleted row apart from a live one.
    pub fn channel_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(Message, RecordFlags)> {
        self.store
            .get(&keys::channel_message_key(channel_id, message_id))
            .map(|(m, meta)| (m, meta.flags))
    }

    /// Fetches a user's presence.
    pub fn presence(&self, user_id: &str) -> Result<Presence> {
        self.store.get(&keys::presence_key(user_id)).map(|(p, _)| p)
    }

    /// Fetches a voice state.
    pub fn voice_state(&self, guild_id: &str, user_id: &str) -> Result<VoiceState> {
        self.store.get(&keys::voice_state_key(guild_id, user_id)).map(|(v, _)| v)
    }
}
