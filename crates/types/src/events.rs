//! The gateway dispatch event model.
//!
//! Events arrive from the (external) shard connection manager already decoded
//! into these variants; this enum is the contract boundary between the wire
//! layer and the state tracker.

use serde::{Deserialize, Serialize};

use crate::types::{Channel, Emoji, Guild, Member, Message, Presence, Ready, Role, VoiceState};

/// A dispatch event addressed to one shard's worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// The undecoded envelope emitted for every dispatch before
    /// type-specific decoding. Dropped on the dispatcher fast path.
    RawEnvelope,
    /// Handshake payload with the bot user and initial guild list.
    Ready(Ready),
    /// A guild became available or was joined.
    GuildCreate(Guild),
    /// Guild settings changed.
    GuildUpdate(Guild),
    /// The guild was left or became unavailable.
    GuildDelete(Guild),
    /// A user joined a guild.
    MemberAdd(Member),
    /// A member's nick/roles changed.
    MemberUpdate(Member),
    /// A user left a guild.
    MemberRemove(Member),
    /// A role was created.
    RoleCreate {
        /// Owning guild.
        guild_id: String,
        /// The created role.
        role: Role,
    },
    /// A role was updated.
    RoleUpdate {
        /// Owning guild.
        guild_id: String,
        /// The updated role.
        role: Role,
    },
    /// A role was deleted.
    RoleDelete {
        /// Owning guild.
        guild_id: String,
        /// The deleted role's ID.
        role_id: String,
    },
    /// A channel was created.
    ChannelCreate(Channel),
    /// A channel was updated.
    ChannelUpdate(Channel),
    /// A channel was deleted.
    ChannelDelete(Channel),
    /// A guild's emoji set was replaced.
    EmojisUpdate {
        /// Owning guild.
        guild_id: String,
        /// The full new emoji set.
        emojis: Vec<Emoji>,
    },
    /// A message was posted.
    MessageCreate(Message),
    /// A message was edited. Fields absent from the wire arrive empty and
    /// merge onto stored state.
    MessageUpdate(Message),
    /// A message was deleted.
    MessageDelete {
        /// Channel the message was posted in.
        channel_id: String,
        /// The deleted message's ID.
        message_id: String,
    },
    /// A user's presence changed.
    PresenceUpdate(Presence),
    /// A user's voice connection changed.
    VoiceStateUpdate(VoiceState),
}

impl GatewayEvent {
    /// The event's type name, used to annotate handler errors and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayEvent::RawEnvelope => "RawEnvelope",
            GatewayEvent::Ready(_) => "Ready",
            GatewayEvent::GuildCreate(_) => "GuildCreate",
            GatewayEvent::GuildUpdate(_) => "GuildUpdate",
            GatewayEvent::GuildDelete(_) => "GuildDelete",
            GatewayEvent::MemberAdd(_) => "MemberAdd",
            GatewayEvent::MemberUpdate(_) => "MemberUpdate",
            GatewayEvent::MemberRemove(_) => "MemberRemove",
            GatewayEvent::RoleCreate { .. } => "RoleCreate",
            GatewayEvent::RoleUpdate { .. } => "RoleUpdate",
            GatewayEvent::RoleDelete { .. } => "RoleDelete",
            GatewayEvent::ChannelCreate(_) => "ChannelCreate",
            GatewayEvent::ChannelUpdate(_) => "ChannelUpdate",
            GatewayEvent::ChannelDelete(_) => "ChannelDelete",
            GatewayEvent::EmojisUpdate { .. } => "EmojisUpdate",
            GatewayEvent::MessageCreate(_) => "MessageCreate",
            GatewayEvent::MessageUpdate(_) => "MessageUpdate",
            GatewayEvent::MessageDelete { .. } => "MessageDelete",
            GatewayEvent::PresenceUpdate(_) => "PresenceUpdate",
            GatewayEvent::VoiceStateUpdate(_) => "VoiceStateUpdate",
        }
    }
}
