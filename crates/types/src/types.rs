//! Domain entities tracked by the state cache.
//!
//! Field layout follows the gateway wire shapes. Identifiers are kept as the
//! decimal snowflake strings they arrive as; the store parses them into
//! binary key components at the key-encoding boundary.
//!
//! `Guild` carries `members`, `presences`, and `voice_states` because guild
//! create payloads deliver them inline, but those collections are stripped
//! before the guild row is persisted — each lives under its own key.

use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID.
    pub id: String,
    /// Account name.
    pub username: String,
    /// Four-digit tag disambiguating equal usernames.
    pub discriminator: String,
    /// Avatar hash, empty when unset.
    pub avatar: String,
    /// Whether the account is a bot.
    pub bot: bool,
}

/// A guild (server): the root aggregate containing channels, roles, and
/// emojis inline, with members/messages/presences/voice states stored under
/// their own keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    /// Snowflake ID.
    pub id: String,
    /// Guild name.
    pub name: String,
    /// Icon hash.
    pub icon: String,
    /// Splash image hash.
    pub splash: String,
    /// Snowflake ID of the owning user.
    pub owner_id: String,
    /// Voice region identifier.
    pub region: String,
    /// AFK timeout in seconds.
    pub afk_timeout: u32,
    /// Channel users are moved to when AFK.
    pub afk_channel_id: String,
    /// Whether the guild embed is enabled.
    pub embed_enabled: bool,
    /// Channel the guild embed points at.
    pub embed_channel_id: String,
    /// Required verification level.
    pub verification_level: u8,
    /// Default message notification setting.
    pub default_message_notifications: u8,
    /// Member count as reported by the gateway, maintained by explicit
    /// member add/remove events afterwards.
    pub member_count: i64,
    /// Whether the guild is considered large by the gateway.
    pub large: bool,
    /// Set on placeholder guilds in the ready payload and on outage
    /// deletes.
    pub unavailable: bool,
    /// Channels registered on this guild.
    pub channels: Vec<Channel>,
    /// Roles, stored inline (no independent key).
    pub roles: Vec<Role>,
    /// Emojis, stored inline (no independent key).
    pub emojis: Vec<Emoji>,
    /// Wire-only: stripped before persistence.
    pub members: Vec<Member>,
    /// Wire-only: stripped before persistence.
    pub presences: Vec<Presence>,
    /// Wire-only: stripped before persistence.
    pub voice_states: Vec<VoiceState>,
}

/// A guild membership row, unique per `(guild_id, user.id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member's user account.
    pub user: User,
    /// Owning guild.
    pub guild_id: String,
    /// Per-guild nickname.
    pub nick: String,
    /// Role IDs held by this member.
    pub roles: Vec<String>,
    /// Join timestamp as delivered on the wire.
    pub joined_at: String,
    /// Server-deafened.
    pub deaf: bool,
    /// Server-muted.
    pub mute: bool,
}

/// Channel variants distinguished by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// A text channel inside a guild; registered on the parent guild.
    #[default]
    GuildText,
    /// A direct-message channel.
    Dm,
    /// A voice channel inside a guild.
    GuildVoice,
    /// A group direct-message channel.
    GroupDm,
    /// A category grouping other channels.
    GuildCategory,
}

/// A permission overwrite attached to a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    /// Role or user snowflake this overwrite applies to.
    pub id: String,
    /// `"role"` or `"member"`.
    pub kind: String,
    /// Allowed permission bits.
    pub allow: u64,
    /// Denied permission bits.
    pub deny: u64,
}

/// A channel. Guild-text channels are additionally registered in the parent
/// guild's `channels` list; every variant is stored under the global channel
/// key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Snowflake ID.
    pub id: String,
    /// Owning guild, empty for DM variants.
    pub guild_id: String,
    /// Channel name.
    pub name: String,
    /// Channel topic.
    pub topic: String,
    /// Channel variant.
    pub kind: ChannelKind,
    /// Sort position.
    pub position: i32,
    /// Whether the channel is marked NSFW.
    pub nsfw: bool,
    /// Snowflake of the most recent message.
    pub last_message_id: String,
    /// Permission overwrites.
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

/// A role, stored inline on its guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Snowflake ID.
    pub id: String,
    /// Role name.
    pub name: String,
    /// Display color.
    pub color: u32,
    /// Whether members are hoisted in the sidebar.
    pub hoist: bool,
    /// Sort position.
    pub position: i32,
    /// Permission bits.
    pub permissions: u64,
    /// Managed by an integration.
    pub managed: bool,
    /// Mentionable by everyone.
    pub mentionable: bool,
}

/// A custom emoji, stored inline on its guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    /// Snowflake ID.
    pub id: String,
    /// Emoji name.
    pub name: String,
    /// Roles allowed to use the emoji.
    pub roles: Vec<String>,
    /// Managed by an integration.
    pub managed: bool,
    /// Requires colons in chat.
    pub require_colons: bool,
    /// Animated emoji.
    pub animated: bool,
}

/// An embed attached to a message. Only the fields the cache preserves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Embed title.
    pub title: String,
    /// Embed description.
    pub description: String,
    /// Source URL.
    pub url: String,
    /// Embed type tag.
    pub kind: String,
}

/// A file attachment on a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Snowflake ID.
    pub id: String,
    /// Original file name.
    pub filename: String,
    /// Download URL.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
}

/// A chat message, keyed by `(channel_id, id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID.
    pub id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Owning guild, empty for DMs.
    pub guild_id: String,
    /// Message text.
    pub content: String,
    /// Creation timestamp as delivered on the wire.
    pub timestamp: String,
    /// Last edit timestamp, empty when never edited.
    pub edited_timestamp: String,
    /// Author; update events may omit it.
    pub author: Option<User>,
    /// Mentioned users.
    pub mentions: Vec<User>,
    /// Embeds.
    pub embeds: Vec<Embed>,
    /// Attachments.
    pub attachments: Vec<Attachment>,
}

/// An activity shown on a presence (playing/streaming/listening).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity name.
    pub name: String,
    /// Activity type discriminant.
    pub kind: u8,
    /// Stream URL, when applicable.
    pub url: String,
}

/// A user's presence, keyed by user ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// The user this presence belongs to. Partial on the wire: only `id` is
    /// guaranteed, remaining fields merge onto prior state.
    pub user: User,
    /// Online status string (`online`, `idle`, `dnd`, `offline`).
    pub status: String,
    /// Current activity.
    pub game: Option<Activity>,
    /// Per-guild nickname delivered with the presence.
    pub nick: String,
}

/// A voice connection state, keyed by `(guild_id, user_id)`. An update with
/// an empty `channel_id` means the user left voice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    /// Owning guild.
    pub guild_id: String,
    /// Voice channel, empty on leave.
    pub channel_id: String,
    /// The connected user.
    pub user_id: String,
    /// Voice session identifier.
    pub session_id: String,
    /// Server-deafened.
    pub deaf: bool,
    /// Server-muted.
    pub mute: bool,
    /// Self-deafened.
    pub self_deaf: bool,
    /// Self-muted.
    pub self_mute: bool,
    /// Suppressed by the server.
    pub suppress: bool,
}

/// The initial payload delivered on gateway handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    /// The connected bot user.
    pub user: User,
    /// Gateway session identifier.
    pub session_id: String,
    /// Initial guild list; entries may be unavailable placeholders carrying
    /// only an ID.
    pub guilds: Vec<Guild>,
}

impl Guild {
    /// Looks up an inline role by ID.
    #[must_use]
    pub fn find_role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    /// Looks up an inline emoji by ID.
    #[must_use]
    pub fn find_emoji(&self, emoji_id: &str) -> Option<&Emoji> {
        self.emojis.iter().find(|e| e.id == emoji_id)
    }

    /// Looks up a registered channel by ID.
    #[must_use]
    pub fn find_channel(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == channel_id)
    }
}
