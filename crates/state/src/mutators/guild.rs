//! Guild lifecycle, plus the role and emoji aggregates stored inline on the
//! guild record.

use shardview_store::{keys, RecordFlags, WriteTxn};
use shardview_types::{Emoji, Guild, Ready, Role};

use crate::error::Result;
use crate::mutators::LOAD_CHUNK;
use crate::worker::WorkerInner;
use crate::StateTracker;

impl StateTracker {
    /// Applies a ready payload: refresh the self-user (memory mirror and
    /// persisted row), then run a guild create for every guild in the
    /// burst, unavailable placeholders included.
    pub(crate) fn ready(&self, w: &mut WorkerInner, ready: &Ready) -> Result<()> {
        *self.self_user.write() = Some(ready.user.clone());
        self.store.update(|txn| {
            txn.set_record(
                &mut w.encode_buf,
                &keys::SELF_USER_KEY,
                &ready.user,
                0,
                RecordFlags::empty(),
            )
        })?;

        for guild in &ready.guilds {
            self.guild_create(w, guild)?;
        }
        Ok(())
    }

    /// Persists a guild and everything delivered inline with it.
    ///
    /// The guild row itself is stripped of members, presences, and voice
    /// states — those live under their own keys. Channels and voice states
    /// register in the same transaction as the guild; members and presences
    /// load afterwards in chunks of [`LOAD_CHUNK`], each chunk its own
    /// transaction, so a 100k-member guild cannot blow the transaction size.
    pub(crate) fn guild_create(&self, w: &mut WorkerInner, guild: &Guild) -> Result<()> {
        self.store.update(|txn| {
            let mut stripped = guild.clone();
            stripped.members = Vec::new();
            stripped.presences = Vec::new();
            stripped.voice_states = Vec::new();
            txn.set_record(
                &mut w.encode_buf,
                &keys::guild_key(&guild.id),
                &stripped,
                0,
                RecordFlags::empty(),
            )?;

            for channel in &guild.channels {
                let mut channel = channel.clone();
                if channel.guild_id.is_empty() {
                    channel.guild_id = guild.id.clone();
                }
                // The guild row written above already carries the channel
                // list, so no read-modify-write of it here.
                self.channel_create_update(w, Some(txn), &channel, false)?;
            }

            for voice in &guild.voice_states {
                let mut voice = voice.clone();
                if voice.guild_id.is_empty() {
                    voice.guild_id = guild.id.clone();
                }
                self.voice_state_update(w, Some(txn), &voice)?;
            }
            Ok(())
        })?;

        if self.opts.track_members {
            for chunk in guild.members.chunks(LOAD_CHUNK) {
                self.store.update(|txn| {
                    for member in chunk {
                        let mut member = member.clone();
                        if member.guild_id.is_empty() {
                            member.guild_id = guild.id.clone();
                        }
                        self.member_update(w, Some(txn), &member)?;
                    }
                    Ok(())
                })?;
            }
        }

        if self.opts.track_presences {
            for chunk in guild.presences.chunks(LOAD_CHUNK) {
                self.store.update(|txn| {
                    for presence in chunk {
                        self.presence_add_update(w, Some(txn), presence, true)?;
                    }
                    Ok(())
                })?;
            }
        }

        Ok(())
    }

    /// Copies the update-mutable fields onto the stored guild. The
    /// aggregates (channels, roles, emojis) and the member count are owned
    /// by their own events and survive untouched.
    pub(crate) fn guild_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        incoming: &Guild,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.guild_update(w, Some(txn), incoming));
        };

        let key = keys::guild_key(&incoming.id);
        let (mut stored, _) = txn.get::<Guild>(&key)?;

        stored.name = incoming.name.clone();
        stored.icon = incoming.icon.clone();
        stored.splash = incoming.splash.clone();
        stored.owner_id = incoming.owner_id.clone();
        stored.region = incoming.region.clone();
        stored.afk_timeout = incoming.afk_timeout;
        stored.afk_channel_id = incoming.afk_channel_id.clone();
        stored.embed_enabled = incoming.embed_enabled;
        stored.embed_channel_id = incoming.embed_channel_id.clone();
        stored.verification_level = incoming.verification_level;
        stored.default_message_notifications = incoming.default_message_notifications;

        txn.set_record(&mut w.encode_buf, &key, &stored, 0, RecordFlags::empty())
    }

    /// Deletes the guild row only. Members and messages under it become
    /// orphans: invisible (accessors go through the guild) and reclaimed by
    /// TTL expiry and the sweep rather than cascaded here.
    pub(crate) fn guild_delete(&self, guild_id: &str) -> Result<()> {
        self.store.update(|txn| txn.delete(&keys::guild_key(guild_id)))
    }

    /// Replace-or-append a role on the guild's inline list.
    pub(crate) fn role_create_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        guild_id: &str,
        role: &Role,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self
                .store
                .update(|txn| self.role_create_update(w, Some(txn), guild_id, role));
        };

        let key = keys::guild_key(guild_id);
        let (mut guild, _) = txn.get::<Guild>(&key)?;

        match guild.roles.iter_mut().find(|r| r.id == role.id) {
            Some(existing) => *existing = role.clone(),
            None => guild.roles.push(role.clone()),
        }

        txn.set_record(&mut w.encode_buf, &key, &guild, 0, RecordFlags::empty())
    }

    /// Removes a role from the guild's inline list.
    pub(crate) fn role_delete(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        guild_id: &str,
        role_id: &str,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.role_delete(w, Some(txn), guild_id, role_id));
        };

        let key = keys::guild_key(guild_id);
        let (mut guild, _) = txn.get::<Guild>(&key)?;
        guild.roles.retain(|r| r.id != role_id);

        txn.set_record(&mut w.encode_buf, &key, &guild, 0, RecordFlags::empty())
    }

    /// Replaces the guild's emoji set wholesale — the event carries the
    /// full new set, so removed emojis disappear and changed ones update.
    pub(crate) fn emojis_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        guild_id: &str,
        emojis: &[Emoji],
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.emojis_update(w, Some(txn), guild_id, emojis));
        };

        let key = keys::guild_key(guild_id);
        let (mut guild, _) = txn.get::<Guild>(&key)?;
        guild.emojis = emojis.to_vec();

        txn.set_record(&mut w.encode_buf, &key, &guild, 0, RecordFlags::empty())
    }
}
