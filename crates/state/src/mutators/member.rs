//! Member rows and the guild member count.

use shardview_store::{keys, RecordFlags, WriteTxn};
use shardview_types::{Guild, Member};

use crate::error::Result;
use crate::mutators::maybe;
use crate::worker::WorkerInner;
use crate::StateTracker;

impl StateTracker {
    /// Handles an explicit member join. With `update_count` the parent
    /// guild's `member_count` is incremented first — but only when the
    /// member row does not already exist, so a duplicated add event cannot
    /// drift the count.
    pub(crate) fn member_add(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        member: &Member,
        update_count: bool,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self
                .store
                .update(|txn| self.member_add(w, Some(txn), member, update_count));
        };

        if update_count {
            let known =
                maybe(txn.get::<Member>(&keys::member_key(&member.guild_id, &member.user.id)))?
                    .is_some();
            if !known {
                // An add for a guild we no longer hold is just the row write.
                if let Some((mut guild, _)) =
                    maybe(txn.get::<Guild>(&keys::guild_key(&member.guild_id)))?
                {
                    guild.member_count += 1;
                    txn.set_record(
                        &mut w.encode_buf,
                        &keys::guild_key(&member.guild_id),
                        &guild,
                        0,
                        RecordFlags::empty(),
                    )?;
                }
            }
        }

        self.member_update(w, Some(txn), member)
    }

    /// Unconditional overwrite of the member row.
    pub(crate) fn member_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        member: &Member,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.member_update(w, Some(txn), member));
        };

        txn.set_record(
            &mut w.encode_buf,
            &keys::member_key(&member.guild_id, &member.user.id),
            member,
            0,
            RecordFlags::empty(),
        )
    }

    /// Handles a member leave: optionally decrement the guild's
    /// `member_count` (guarded the same way as the add path), then delete
    /// the row.
    pub(crate) fn member_remove(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        guild_id: &str,
        user_id: &str,
        update_count: bool,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self
                .store
                .update(|txn| self.member_remove(w, Some(txn), guild_id, user_id, update_count));
        };

        let key = keys::member_key(guild_id, user_id);

        if update_count {
            let known = maybe(txn.get::<Member>(&key))?.is_some();
            if known {
                if let Some((mut guild, _)) = maybe(txn.get::<Guild>(&keys::guild_key(guild_id)))? {
                    guild.member_count -= 1;
                    txn.set_record(
                        &mut w.encode_buf,
                        &keys::guild_key(guild_id),
                        &guild,
                        0,
                        RecordFlags::empty(),
                    )?;
                }
            }
        }

        txn.delete(&key)
    }
}
