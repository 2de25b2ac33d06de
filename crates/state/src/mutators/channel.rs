//! Channel rows and their registration on the parent guild.

use shardview_store::{keys, RecordFlags, WriteTxn};
use shardview_types::{Channel, ChannelKind, Guild};

use crate::error::Result;
use crate::mutators::maybe;
use crate::worker::WorkerInner;
use crate::StateTracker;

impl StateTracker {
    /// Writes a channel under the global channel key. Guild-text channels
    /// are additionally registered on the parent guild when `add_to_guild`
    /// is set (guild create passes `false` because the guild row it just
    /// wrote already carries the list).
    ///
    /// Replacing a registered channel preserves its stored permission
    /// overwrites when the incoming payload has none — some update shapes
    /// omit them.
    pub(crate) fn channel_create_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        incoming: &Channel,
        add_to_guild: bool,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self
                .store
                .update(|txn| self.channel_create_update(w, Some(txn), incoming, add_to_guild));
        };

        let mut channel = incoming.clone();

        if channel.kind == ChannelKind::GuildText && add_to_guild {
            let guild_key = keys::guild_key(&channel.guild_id);
            let (mut guild, _) = txn.get::<Guild>(&guild_key)?;

            match guild.channels.iter_mut().find(|c| c.id == channel.id) {
                Some(existing) => {
                    if channel.permission_overwrites.is_empty() {
                        channel.permission_overwrites = existing.permission_overwrites.clone();
                    }
                    *existing = channel.clone();
                }
                None => guild.channels.push(channel.clone()),
            }

            txn.set_record(&mut w.encode_buf, &guild_key, &guild, 0, RecordFlags::empty())?;
        }

        txn.set_record(
            &mut w.encode_buf,
            &keys::channel_key(&channel.id),
            &channel,
            0,
            RecordFlags::empty(),
        )
    }

    /// Deletes a channel. An unknown channel is a silent success; a
    /// guild-text channel is also unregistered from its parent guild when
    /// the guild still exists.
    pub(crate) fn channel_delete(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        channel_id: &str,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.channel_delete(w, Some(txn), channel_id));
        };

        let key = keys::channel_key(channel_id);
        let Some((channel, _)) = maybe(txn.get::<Channel>(&key))? else {
            return Ok(());
        };

        if channel.kind == ChannelKind::GuildText {
            let guild_key = keys::guild_key(&channel.guild_id);
            if let Some((mut guild, _)) = maybe(txn.get::<Guild>(&guild_key))? {
                guild.channels.retain(|c| c.id != channel.id);
                txn.set_record(&mut w.encode_buf, &guild_key, &guild, 0, RecordFlags::empty())?;
            }
        }

        txn.delete(&key)
    }
}
