//! Message rows: TTL'd writes, field-wise update merge, and soft delete.

use shardview_store::{keys, now_ms, RecordFlags, WriteTxn};
use shardview_types::Message;

use crate::error::Result;
use crate::mutators::maybe;
use crate::worker::WorkerInner;
use crate::StateTracker;

impl StateTracker {
    /// Creates or updates a message. Update events carry only the changed
    /// fields, so non-empty incoming fields merge onto the stored row; a
    /// repeat of the same payload is a no-op on the stored value. Every
    /// write restarts the message TTL.
    pub(crate) fn message_create_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        incoming: &Message,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.message_create_update(w, Some(txn), incoming));
        };

        let key = keys::channel_message_key(&incoming.channel_id, &incoming.id);

        let message = match maybe(txn.get_with_buffer::<Message>(&key, &mut w.decode_buf))? {
            Some((mut stored, _)) => {
                if !incoming.content.is_empty() {
                    stored.content = incoming.content.clone();
                }
                if !incoming.edited_timestamp.is_empty() {
                    stored.edited_timestamp = incoming.edited_timestamp.clone();
                }
                if !incoming.mentions.is_empty() {
                    stored.mentions = incoming.mentions.clone();
                }
                if !incoming.embeds.is_empty() {
                    stored.embeds = incoming.embeds.clone();
                }
                if !incoming.attachments.is_empty() {
                    stored.attachments = incoming.attachments.clone();
                }
                if !incoming.timestamp.is_empty() {
                    stored.timestamp = incoming.timestamp.clone();
                }
                if incoming.author.is_some() {
                    stored.author = incoming.author.clone();
                }
                stored
            }
            None => incoming.clone(),
        };

        let expires_at_ms = match self.opts.message_ttl {
            Some(ttl) => now_ms().saturating_add(ttl.as_millis() as u64),
            None => 0,
        };

        txn.set_record(&mut w.encode_buf, &key, &message, expires_at_ms, RecordFlags::empty())
    }

    /// Deletes a message. With `keep_deleted_messages` the row is rewritten
    /// carrying the `DELETED` flag instead — still readable on request, and
    /// its original expiry keeps running.
    pub(crate) fn message_delete(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        channel_id: &str,
        message_id: &str,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self
                .store
                .update(|txn| self.message_delete(w, Some(txn), channel_id, message_id));
        };

        let key = keys::channel_message_key(channel_id, message_id);

        if !self.opts.keep_deleted_messages {
            return txn.delete(&key);
        }

        let Some((message, meta)) = maybe(txn.get_with_buffer::<Message>(&key, &mut w.decode_buf))?
        else {
            // Never seen (or already expired): nothing to flag.
            return Ok(());
        };

        let mut flags = meta.flags;
        flags.insert(RecordFlags::DELETED);
        txn.set_record(&mut w.encode_buf, &key, &message, meta.expires_at_ms, flags)
    }
}
