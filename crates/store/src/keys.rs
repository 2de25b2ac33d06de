//! Binary key schema.
//!
//! Every persisted entity maps to a fixed-width key of a single type tag
//! followed by one or two big-endian snowflake components:
//!
//! ```text
//! Guild          9  [g][guild_id:u64]
//! Member        17  [f][guild_id:u64][user_id:u64]
//! Channel        9  [c][channel_id:u64]
//! ChannelMessage 17  [m][channel_id:u64][message_id:u64]
//! Presence       9  [p][user_id:u64]
//! VoiceState    17  [v][guild_id:u64][user_id:u64]
//! SelfUser       1  [q]
//! Meta           1  [t]
//! ```
//!
//! Big-endian encoding makes lexicographic key order equal numeric order,
//! and snowflakes are time-ordered, so range scans over a prefix come out in
//! chronological order. Malformed ID strings parse to a zero component; the
//! resulting key cannot match a real row.

use shardview_types::snowflake;

const TAG_GUILD: u8 = b'g';
const TAG_MEMBER: u8 = b'f';
const TAG_CHANNEL: u8 = b'c';
const TAG_MESSAGE: u8 = b'm';
const TAG_PRESENCE: u8 = b'p';
const TAG_VOICE_STATE: u8 = b'v';
const TAG_SELF_USER: u8 = b'q';
const TAG_META: u8 = b't';

/// Width of a single-component key.
pub const SHORT_KEY_LEN: usize = 9;
/// Width of a two-component key.
pub const LONG_KEY_LEN: usize = 17;

/// Key of the self-user record.
pub const SELF_USER_KEY: [u8; 1] = [TAG_SELF_USER];
/// Key of the Meta record holding the format version.
pub const META_KEY: [u8; 1] = [TAG_META];

fn short_key(tag: u8, id: &str) -> [u8; SHORT_KEY_LEN] {
    let mut key = [0u8; SHORT_KEY_LEN];
    key[0] = tag;
    key[1..].copy_from_slice(&snowflake::parse(id).to_be_bytes());
    key
}

fn long_key(tag: u8, first: &str, second: &str) -> [u8; LONG_KEY_LEN] {
    let mut key = [0u8; LONG_KEY_LEN];
    key[0] = tag;
    key[1..9].copy_from_slice(&snowflake::parse(first).to_be_bytes());
    key[9..].copy_from_slice(&snowflake::parse(second).to_be_bytes());
    key
}

/// Key of a guild row.
#[must_use]
pub fn guild_key(guild_id: &str) -> [u8; SHORT_KEY_LEN] {
    short_key(TAG_GUILD, guild_id)
}

/// Key of a member row.
#[must_use]
pub fn member_key(guild_id: &str, user_id: &str) -> [u8; LONG_KEY_LEN] {
    long_key(TAG_MEMBER, guild_id, user_id)
}

/// Key of a channel row.
#[must_use]
pub fn channel_key(channel_id: &str) -> [u8; SHORT_KEY_LEN] {
    short_key(TAG_CHANNEL, channel_id)
}

/// Key of a message row.
#[must_use]
pub fn channel_message_key(channel_id: &str, message_id: &str) -> [u8; LONG_KEY_LEN] {
    long_key(TAG_MESSAGE, channel_id, message_id)
}

/// Key of a presence row.
#[must_use]
pub fn presence_key(user_id: &str) -> [u8; SHORT_KEY_LEN] {
    short_key(TAG_PRESENCE, user_id)
}

/// Key of a voice-state row.
#[must_use]
pub fn voice_state_key(guild_id: &str, user_id: &str) -> [u8; LONG_KEY_LEN] {
    long_key(TAG_VOICE_STATE, guild_id, user_id)
}

/// Prefix matching every guild row.
#[must_use]
pub fn guild_prefix() -> [u8; 1] {
    [TAG_GUILD]
}

/// Prefix matching every member of one guild.
#[must_use]
pub fn member_prefix(guild_id: &str) -> [u8; SHORT_KEY_LEN] {
    short_key(TAG_MEMBER, guild_id)
}

/// Prefix matching every message row regardless of channel.
#[must_use]
pub fn message_prefix() -> [u8; 1] {
    [TAG_MESSAGE]
}

/// Prefix matching every message of one channel.
#[must_use]
pub fn channel_message_prefix(channel_id: &str) -> [u8; SHORT_KEY_LEN] {
    short_key(TAG_MESSAGE, channel_id)
}

/// Prefix matching every presence row.
#[must_use]
pub fn presence_prefix() -> [u8; 1] {
    [TAG_PRESENCE]
}

/// Prefix matching every voice state of one guild.
#[must_use]
pub fn voice_state_prefix(guild_id: &str) -> [u8; SHORT_KEY_LEN] {
    short_key(TAG_VOICE_STATE, guild_id)
}

/// Seek key one past the newest possible message of a channel, used to start
/// reverse (newest-first) scans.
#[must_use]
pub fn last_message_seek(channel_id: &str) -> [u8; LONG_KEY_LEN] {
    let mut key = [0xFFu8; LONG_KEY_LEN];
    key[..SHORT_KEY_LEN].copy_from_slice(&channel_message_prefix(channel_id));
    key
}

/// Whether a raw key addresses a message row. Used by the startup flush to
/// optionally preserve messages.
#[must_use]
pub fn is_message_key(key: &[u8]) -> bool {
    key.first() == Some(&TAG_MESSAGE)
}

/// Whether a raw key is the Meta record.
#[must_use]
pub fn is_meta_key(key: &[u8]) -> bool {
    key == META_KEY
}

/// The exclusive upper bound of a prefix scan: the prefix incremented as a
/// big-endian integer. Returns `None` when the prefix is all `0xFF` and the
/// scan is unbounded above.
#[must_use]
pub fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    for byte in upper.iter_mut().rev() {
        if *byte < 0xFF {
            *byte += 1;
            return Some(upper);
        }
        *byte = 0;
    }
    None
}
