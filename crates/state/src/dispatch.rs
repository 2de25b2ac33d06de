//! Event dispatch: the entry point from the gateway.

use shardview_types::{snowflake, GatewayEvent};

use crate::error::{EventError, Result};
use crate::worker::WorkerInner;
use crate::StateTracker;

/// How `handle_event` synchronizes with the addressed shard worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Enqueue on the worker's bounded queue and return immediately. The
    /// caller gets no ordering guarantee between its return and the state
    /// update, and handler errors only show up in the log. Needs
    /// [`Options::use_channel_sync_mode`](crate::Options::use_channel_sync_mode);
    /// without the receiver tasks the event is dropped with a warning.
    Channel,
    /// Apply under the worker's lock before returning: the caller reads its
    /// own write afterwards and receives the handler's error.
    Mutex,
    /// The caller declares it already serializes this shard's events.
    /// Application still funnels through the worker lock (misuse degrades
    /// to contention, never torn buffers), but no cross-call ordering is
    /// added on top of the caller's own.
    Unsynchronized,
}

impl StateTracker {
    /// Feeds one gateway dispatch to the addressed shard.
    ///
    /// The undecoded envelope variant is dropped on the fast path: the
    /// gateway emits it ahead of every typed event.
    ///
    /// # Panics
    ///
    /// Panics when `shard_id` is out of range — shard routing is fixed at
    /// open time, so this is a wiring bug in the caller.
    ///
    /// # Errors
    ///
    /// In [`SyncMode::Mutex`] and [`SyncMode::Unsynchronized`], the handler
    /// error wrapped with the event's type name. [`SyncMode::Channel`]
    /// always returns `Ok`.
    pub async fn handle_event(
        &self,
        shard_id: u32,
        event: GatewayEvent,
        mode: SyncMode,
    ) -> Result<(), EventError> {
        if matches!(event, GatewayEvent::RawEnvelope) {
            return Ok(());
        }

        assert!(
            (shard_id as usize) < self.workers.len(),
            "shard {shard_id} out of range: tracker was opened with {} shards",
            self.workers.len(),
        );
        let worker = &self.workers[shard_id as usize];

        match mode {
            SyncMode::Channel => {
                if worker.tx.send(event).await.is_err() {
                    tracing::warn!(
                        shard = shard_id,
                        "event dropped: no receiver task (channel sync mode disabled or shut down)"
                    );
                }
                Ok(())
            }
            SyncMode::Mutex | SyncMode::Unsynchronized => {
                let mut inner = worker.inner.lock().await;
                self.apply_event(&mut inner, shard_id, &event)
            }
        }
    }

    /// Routes one event to its mutator, honoring the tracking options.
    /// Events for disabled trackers are dropped silently.
    pub(crate) fn apply_event(
        &self,
        w: &mut WorkerInner,
        shard_id: u32,
        event: &GatewayEvent,
    ) -> Result<(), EventError> {
        self.route_event(w, shard_id, event)
            .map_err(|source| EventError { kind: event.kind(), source })
    }

    fn route_event(
        &self,
        w: &mut WorkerInner,
        shard_id: u32,
        event: &GatewayEvent,
    ) -> Result<()> {
        let opts = &self.opts;
        match event {
            GatewayEvent::RawEnvelope => Ok(()),

            GatewayEvent::Ready(ready) => self.ready(w, ready),

            GatewayEvent::GuildCreate(guild) => self.guild_create(w, guild),
            GatewayEvent::GuildUpdate(guild) => self.guild_update(w, None, guild),
            GatewayEvent::GuildDelete(guild) => self.guild_delete(&guild.id),

            GatewayEvent::MemberAdd(member) if opts.track_members => {
                self.member_add(w, None, member, true)
            }
            GatewayEvent::MemberUpdate(member) if opts.track_members => {
                self.member_update(w, None, member)
            }
            GatewayEvent::MemberRemove(member) if opts.track_members => {
                self.member_remove(w, None, &member.guild_id, &member.user.id, true)
            }
            GatewayEvent::MemberAdd(_)
            | GatewayEvent::MemberUpdate(_)
            | GatewayEvent::MemberRemove(_) => Ok(()),

            GatewayEvent::RoleCreate { guild_id, role }
            | GatewayEvent::RoleUpdate { guild_id, role }
                if opts.track_roles =>
            {
                self.role_create_update(w, None, guild_id, role)
            }
            GatewayEvent::RoleDelete { guild_id, role_id } if opts.track_roles => {
                self.role_delete(w, None, guild_id, role_id)
            }
            GatewayEvent::RoleCreate { .. }
            | GatewayEvent::RoleUpdate { .. }
            | GatewayEvent::RoleDelete { .. } => Ok(()),

            GatewayEvent::ChannelCreate(channel) | GatewayEvent::ChannelUpdate(channel)
                if opts.track_channels =>
            {
                self.channel_create_update(w, None, channel, true)
            }
            GatewayEvent::ChannelDelete(channel) if opts.track_channels => {
                self.channel_delete(w, None, &channel.id)
            }
            GatewayEvent::ChannelCreate(_)
            | GatewayEvent::ChannelUpdate(_)
            | GatewayEvent::ChannelDelete(_) => Ok(()),

            GatewayEvent::EmojisUpdate { guild_id, emojis } => {
                self.emojis_update(w, None, guild_id, emojis)
            }

            GatewayEvent::MessageCreate(message) | GatewayEvent::MessageUpdate(message)
                if opts.track_messages =>
            {
                self.message_create_update(w, None, message)
            }
            GatewayEvent::MessageDelete { channel_id, message_id } if opts.track_messages => {
                self.message_delete(w, None, channel_id, message_id)
            }
            GatewayEvent::MessageCreate(_)
            | GatewayEvent::MessageUpdate(_)
            | GatewayEvent::MessageDelete { .. } => Ok(()),

            GatewayEvent::PresenceUpdate(presence) if opts.track_presences => {
                // Shared-guild bursts deliver the same change once per
                // guild; only the first sighting within the interval is
                // applied.
                if self.presence_filter.check_user(shard_id, snowflake::parse(&presence.user.id)) {
                    return Ok(());
                }
                self.presence_add_update(w, None, presence, false)
            }
            GatewayEvent::PresenceUpdate(_) => Ok(()),

            GatewayEvent::VoiceStateUpdate(voice) => self.voice_state_update(w, None, voice),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use shardview_types::{GatewayEvent, Guild, Member, Message, Presence, User};

    use super::SyncMode;
    use crate::error::StoreError;
    use crate::testutil;
    use crate::Options;

    fn guild_event(id: &str) -> GatewayEvent {
        GatewayEvent::GuildCreate(Guild { id: id.into(), ..Default::default() })
    }

    #[tokio::test]
    async fn raw_envelope_is_dropped() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        tracker.handle_event(0, GatewayEvent::RawEnvelope, SyncMode::Mutex).await.expect("ok");
        // Out-of-range shard would have panicked had the envelope not been
        // fast-pathed.
        tracker.handle_event(99, GatewayEvent::RawEnvelope, SyncMode::Mutex).await.expect("ok");
    }

    #[tokio::test]
    #[should_panic(expected = "out of range")]
    async fn out_of_range_shard_panics() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        let _ = tracker.handle_event(1, guild_event("1"), SyncMode::Mutex).await;
    }

    #[tokio::test]
    async fn mutex_mode_reads_its_own_write() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        tracker.handle_event(0, guild_event("100"), SyncMode::Mutex).await.expect("apply");
        assert!(tracker.guild("100").is_ok());
    }

    #[tokio::test]
    async fn unsynchronized_mode_applies_too() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        tracker
            .handle_event(0, guild_event("100"), SyncMode::Unsynchronized)
            .await
            .expect("apply");
        assert!(tracker.guild("100").is_ok());
    }

    #[tokio::test]
    async fn handler_errors_carry_the_event_kind() {
        let (_dir, tracker) = testutil::tracker(Options::default());
        // Updating a guild that was never created fails with NotFound.
        let event =
            GatewayEvent::GuildUpdate(Guild { id: "404".into(), ..Default::default() });
        let err = tracker.handle_event(0, event, SyncMode::Mutex).await.unwrap_err();
        assert_eq!(err.kind, "GuildUpdate");
        assert!(matches!(err.source, StoreError::NotFound));
    }

    #[tokio::test]
    async fn disabled_trackers_drop_events_silently() {
        let (_dir, tracker) = testutil::tracker(Options::default());

        let member = Member {
            user: User { id: "5".into(), ..Default::default() },
            guild_id: "1".into(),
            ..Default::default()
        };
        let message = Message { id: "3".into(), channel_id: "2".into(), ..Default::default() };
        let presence = Presence {
            user: User { id: "5".into(), ..Default::default() },
            ..Default::default()
        };

        tracker
            .handle_event(0, GatewayEvent::MemberAdd(member), SyncMode::Mutex)
            .await
            .expect("dropped");
        tracker
            .handle_event(0, GatewayEvent::MessageCreate(message), SyncMode::Mutex)
            .await
            .expect("dropped");
        tracker
            .handle_event(0, GatewayEvent::PresenceUpdate(presence), SyncMode::Mutex)
            .await
            .expect("dropped");

        assert!(matches!(tracker.member("1", "5"), Err(StoreError::NotFound)));
        assert!(matches!(tracker.channel_message("2", "3"), Err(StoreError::NotFound)));
        assert!(matches!(tracker.presence("5"), Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn presence_bursts_deduplicate() {
        let (_dir, tracker) = testutil::tracker(Options {
            track_presences: true,
            ..Default::default()
        });

        let online = Presence {
            user: User { id: "5".into(), ..Default::default() },
            status: "online".into(),
            ..Default::default()
        };
        tracker
            .handle_event(0, GatewayEvent::PresenceUpdate(online), SyncMode::Mutex)
            .await
            .expect("first");

        // The same user's burst repeat within the interval is dropped, so
        // the stored status stays put.
        let idle = Presence {
            user: User { id: "5".into(), ..Default::default() },
            status: "idle".into(),
            ..Default::default()
        };
        tracker
            .handle_event(0, GatewayEvent::PresenceUpdate(idle.clone()), SyncMode::Mutex)
            .await
            .expect("duplicate");
        assert_eq!(tracker.presence("5").expect("fetch").status, "online");

        // After the ring clears, the change goes through.
        tracker.presence_filter.clear();
        tracker
            .handle_event(0, GatewayEvent::PresenceUpdate(idle), SyncMode::Mutex)
            .await
            .expect("after clear");
        assert_eq!(tracker.presence("5").expect("fetch").status, "idle");
    }

    #[tokio::test]
    async fn channel_mode_without_receivers_drops_without_error() {
        // testutil trackers never spawn receiver tasks, matching a tracker
        // opened without use_channel_sync_mode.
        let (_dir, tracker) = testutil::tracker(Options::default());
        tracker.handle_event(0, guild_event("100"), SyncMode::Channel).await.expect("ok");
        assert!(matches!(tracker.guild("100"), Err(StoreError::NotFound)));
    }
}
