//! Presence and voice-state rows.

use shardview_store::{keys, RecordFlags, WriteTxn};
use shardview_types::{Presence, VoiceState};

use crate::error::Result;
use crate::mutators::maybe;
use crate::worker::WorkerInner;
use crate::StateTracker;

impl StateTracker {
    /// Writes a presence. Presence payloads are partial — the user object
    /// may carry only an ID and the status may be empty — so unless
    /// `force_add` (ready bursts, where the payload is authoritative) the
    /// non-empty incoming fields merge onto any stored presence. `game` and
    /// `nick` always overwrite: an empty value there means cleared.
    pub(crate) fn presence_add_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        incoming: &Presence,
        force_add: bool,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self
                .store
                .update(|txn| self.presence_add_update(w, Some(txn), incoming, force_add));
        };

        let key = keys::presence_key(&incoming.user.id);

        let presence = if force_add {
            incoming.clone()
        } else {
            match maybe(txn.get::<Presence>(&key))? {
                Some((mut stored, _)) => {
                    if !incoming.user.username.is_empty() {
                        stored.user.username = incoming.user.username.clone();
                    }
                    if !incoming.user.discriminator.is_empty() {
                        stored.user.discriminator = incoming.user.discriminator.clone();
                    }
                    if !incoming.user.avatar.is_empty() {
                        stored.user.avatar = incoming.user.avatar.clone();
                    }
                    if !incoming.status.is_empty() {
                        stored.status = incoming.status.clone();
                    }
                    stored.game = incoming.game.clone();
                    stored.nick = incoming.nick.clone();
                    stored
                }
                None => incoming.clone(),
            }
        };

        txn.set_record(&mut w.encode_buf, &key, &presence, 0, RecordFlags::empty())
    }

    /// Writes a voice state; an empty `channel_id` means the user left
    /// voice and deletes the row instead (absent row included).
    pub(crate) fn voice_state_update(
        &self,
        w: &mut WorkerInner,
        txn: Option<&WriteTxn>,
        voice: &VoiceState,
    ) -> Result<()> {
        let Some(txn) = txn else {
            return self.store.update(|txn| self.voice_state_update(w, Some(txn), voice));
        };

        let key = keys::voice_state_key(&voice.guild_id, &voice.user_id);

        if voice.channel_id.is_empty() {
            return txn.delete(&key);
        }

        txn.set_record(&mut w.encode_buf, &key, voice, 0, RecordFlags::empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use shardview_types::{Activity, Presence, User, VoiceState};

    use crate::error::StoreError;
    use crate::testutil;
    use crate::Options;

    #[test]
    fn presence_roundtrip() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        let mut w = testutil::worker_buffers();

        let p = Presence {
            user: User { id: "5".into(), username: "bob".into(), ..Default::default() },
            nick: "boiman".into(),
            ..Default::default()
        };
        tracker.presence_add_update(&mut w, None, &p, false).expect("create");

        let fetched = tracker.presence("5").expect("fetch");
        assert_eq!(fetched.user.username, "bob");
        assert_eq!(fetched.nick, "boiman");
    }

    #[test]
    fn partial_update_merges_onto_stored_presence() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        let mut w = testutil::worker_buffers();

        let initial = Presence {
            user: User { id: "5".into(), username: "bob".into(), ..Default::default() },
            status: "online".into(),
            nick: "x".into(),
            ..Default::default()
        };
        tracker.presence_add_update(&mut w, None, &initial, true).expect("seed");

        // Partial payload: bare user, empty status, a game, cleared nick.
        let update = Presence {
            user: User { id: "5".into(), ..Default::default() },
            status: String::new(),
            game: Some(Activity { name: "chess".into(), kind: 0, url: String::new() }),
            nick: String::new(),
        };
        tracker.presence_add_update(&mut w, None, &update, false).expect("merge");

        let fetched = tracker.presence("5").expect("fetch");
        assert_eq!(fetched.user.username, "bob", "empty username must not clobber");
        assert_eq!(fetched.status, "online", "empty status must not clobber");
        assert_eq!(fetched.game.as_ref().unwrap().name, "chess");
        assert_eq!(fetched.nick, "", "nick always overwrites");
    }

    #[test]
    fn force_add_overwrites_without_reading() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        let mut w = testutil::worker_buffers();

        let initial = Presence {
            user: User { id: "5".into(), username: "bob".into(), ..Default::default() },
            status: "online".into(),
            ..Default::default()
        };
        tracker.presence_add_update(&mut w, None, &initial, true).expect("seed");

        let replacement = Presence {
            user: User { id: "5".into(), ..Default::default() },
            status: String::new(),
            ..Default::default()
        };
        tracker.presence_add_update(&mut w, None, &replacement, true).expect("replace");

        let fetched = tracker.presence("5").expect("fetch");
        assert_eq!(fetched.user.username, "", "force add is a plain overwrite");
        assert_eq!(fetched.status, "");
    }

    #[test]
    fn voice_join_move_leave() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        let mut w = testutil::worker_buffers();

        let join = VoiceState {
            guild_id: "1".into(),
            user_id: "5".into(),
            channel_id: "2".into(),
            mute: true,
            ..Default::default()
        };
        tracker.voice_state_update(&mut w, None, &join).expect("join");

        let fetched = tracker.voice_state("1", "5").expect("fetch");
        assert_eq!(fetched.channel_id, "2");
        assert!(fetched.mute);

        let moved = VoiceState { channel_id: "3".into(), ..join.clone() };
        tracker.voice_state_update(&mut w, None, &moved).expect("move");
        assert_eq!(tracker.voice_state("1", "5").expect("fetch").channel_id, "3");

        let leave = VoiceState { channel_id: String::new(), ..join };
        tracker.voice_state_update(&mut w, None, &leave).expect("leave");
        assert!(matches!(tracker.voice_state("1", "5"), Err(StoreError::NotFound)));
    }

    #[test]
    fn voice_leave_for_unknown_user_is_silent() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        let mut w = testutil::worker_buffers();

        let leave = VoiceState {
            guild_id: "1".into(),
            user_id: "404".into(),
            channel_id: String::new(),
            ..Default::default()
        };
        tracker.voice_state_update(&mut w, None, &leave).expect("noop leave");
    }
}
