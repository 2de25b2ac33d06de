//! End-to-end scenarios through the public tracker API.

use std::time::Duration;

use shardview::{Options, StateTracker, StoreError, SyncMode};
use shardview_types::{
    Activity, Channel, ChannelKind, GatewayEvent, Guild, Member, Message, Presence, Ready, Role,
    User, VoiceState,
};

fn all_tracking() -> Options {
    Options {
        track_messages: true,
        message_ttl: Some(Duration::from_secs(3600)),
        track_presences: true,
        track_members: true,
        track_roles: true,
        track_channels: true,
        keep_deleted_messages: true,
        ..Default::default()
    }
}

async fn apply(tracker: &StateTracker, event: GatewayEvent) {
    tracker.handle_event(0, event, SyncMode::Mutex).await.expect("event applied");
}

#[tokio::test]
async fn guild_lifecycle() {
    let tracker = StateTracker::open(1, all_tracking()).await.expect("open");

    let guild = Guild { id: "100".into(), name: "A".into(), member_count: 0, ..Default::default() };
    apply(&tracker, GatewayEvent::GuildCreate(guild)).await;

    assert_eq!(tracker.guild("100").expect("fetch").name, "A");

    let mut count = 0;
    tracker
        .iterate_guilds(|_| {
            count += 1;
            true
        })
        .expect("iterate");
    assert_eq!(count, 1);

    apply(
        &tracker,
        GatewayEvent::GuildDelete(Guild { id: "100".into(), ..Default::default() }),
    )
    .await;
    assert!(matches!(tracker.guild("100"), Err(StoreError::NotFound)));

    tracker.close();
}

#[tokio::test]
async fn channel_dual_index() {
    let tracker = StateTracker::open(1, all_tracking()).await.expect("open");

    apply(
        &tracker,
        GatewayEvent::GuildCreate(Guild { id: "1".into(), ..Default::default() }),
    )
    .await;
    apply(
        &tracker,
        GatewayEvent::ChannelCreate(Channel {
            id: "2".into(),
            guild_id: "1".into(),
            kind: ChannelKind::GuildText,
            ..Default::default()
        }),
    )
    .await;

    assert_eq!(tracker.channel("2").expect("channel").guild_id, "1");
    let guild = tracker.guild("1").expect("guild");
    assert_eq!(guild.channels.len(), 1);
    assert_eq!(guild.channels[0].id, "2");

    apply(
        &tracker,
        GatewayEvent::ChannelDelete(Channel { id: "2".into(), ..Default::default() }),
    )
    .await;
    assert!(matches!(tracker.channel("2"), Err(StoreError::NotFound)));
    assert!(tracker.guild("1").expect("guild").channels.is_empty());

    tracker.close();
}

#[tokio::test]
async fn role_on_guild() {
    let tracker = StateTracker::open(1, all_tracking()).await.expect("open");

    apply(
        &tracker,
        GatewayEvent::GuildCreate(Guild { id: "1".into(), ..Default::default() }),
    )
    .await;
    apply(
        &tracker,
        GatewayEvent::RoleCreate {
            guild_id: "1".into(),
            role: Role { id: "2".into(), name: "Admin".into(), color: 100, ..Default::default() },
        },
    )
    .await;

    let guild = tracker.guild("1").expect("guild");
    let role = guild.find_role("2").expect("role present");
    assert_eq!(role.name, "Admin");
    assert_eq!(role.color, 100);

    apply(&tracker, GatewayEvent::RoleDelete { guild_id: "1".into(), role_id: "2".into() }).await;
    assert!(tracker.guild("1").expect("guild").find_role("2").is_none());

    tracker.close();
}

#[tokio::test]
async fn message_soft_delete_keeps_flagged_row() {
    let tracker = StateTracker::open(1, all_tracking()).await.expect("open");

    apply(
        &tracker,
        GatewayEvent::MessageCreate(Message {
            id: "3".into(),
            channel_id: "2".into(),
            content: "hi".into(),
            author: Some(User { id: "5".into(), ..Default::default() }),
            ..Default::default()
        }),
    )
    .await;

    let (message, flags) = tracker.channel_message("2", "3").expect("fetch");
    assert_eq!(message.content, "hi");
    assert_eq!(flags, shardview::RecordFlags::empty());

    apply(
        &tracker,
        GatewayEvent::MessageDelete { channel_id: "2".into(), message_id: "3".into() },
    )
    .await;

    let (message, flags) = tracker.channel_message("2", "3").expect("still readable");
    assert_eq!(message.content, "hi");
    assert!(flags.contains(shardview::RecordFlags::DELETED));

    // Hidden from the default listing, visible on request.
    assert!(tracker.last_channel_messages("2", 0, false).expect("list").is_empty());
    assert_eq!(tracker.last_channel_messages("2", 0, true).expect("list").len(), 1);

    tracker.close();
}

#[tokio::test]
async fn presence_partial_update_merges() {
    let tracker = StateTracker::open(1, all_tracking()).await.expect("open");

    apply(
        &tracker,
        GatewayEvent::Ready(Ready {
            user: User { id: "42".into(), username: "bot".into(), ..Default::default() },
            guilds: vec![Guild {
                id: "1".into(),
                presences: vec![Presence {
                    user: User { id: "5".into(), username: "bob".into(), ..Default::default() },
                    status: "online".into(),
                    nick: "x".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }),
    )
    .await;

    apply(
        &tracker,
        GatewayEvent::PresenceUpdate(Presence {
            user: User { id: "5".into(), ..Default::default() },
            status: String::new(),
            game: Some(Activity { name: "chess".into(), ..Default::default() }),
            nick: String::new(),
        }),
    )
    .await;

    let presence = tracker.presence("5").expect("fetch");
    assert_eq!(presence.user.username, "bob");
    assert_eq!(presence.status, "online");
    assert_eq!(presence.game.expect("game").name, "chess");
    assert_eq!(presence.nick, "");

    tracker.close();
}

#[tokio::test]
async fn voice_leave_removes_the_row() {
    let tracker = StateTracker::open(1, all_tracking()).await.expect("open");

    apply(
        &tracker,
        GatewayEvent::VoiceStateUpdate(VoiceState {
            guild_id: "1".into(),
            user_id: "5".into(),
            channel_id: "2".into(),
            ..Default::default()
        }),
    )
    .await;
    assert_eq!(tracker.voice_state("1", "5").expect("fetch").channel_id, "2");

    apply(
        &tracker,
        GatewayEvent::VoiceStateUpdate(VoiceState {
            guild_id: "1".into(),
            user_id: "5".into(),
            channel_id: String::new(),
            ..Default::default()
        }),
    )
    .await;
    assert!(matches!(tracker.voice_state("1", "5"), Err(StoreError::NotFound)));

    tracker.close();
}

#[tokio::test]
async fn ready_burst_populates_members_and_self_user() {
    let tracker = StateTracker::open(2, all_tracking()).await.expect("open");

    let members: Vec<Member> = (0..2500)
        .map(|i| Member {
            user: User { id: (1000 + i as u64).to_string(), ..Default::default() },
            ..Default::default()
        })
        .collect();

    tracker
        .handle_event(
            1,
            GatewayEvent::Ready(Ready {
                user: User { id: "42".into(), username: "bot".into(), ..Default::default() },
                guilds: vec![Guild {
                    id: "1".into(),
                    name: "big".into(),
                    members,
                    ..Default::default()
                }],
                ..Default::default()
            }),
            SyncMode::Mutex,
        )
        .await
        .expect("ready");

    assert_eq!(tracker.self_user().expect("self user").username, "bot");

    let mut count = 0;
    tracker
        .iterate_guild_members("1", |_| {
            count += 1;
            true
        })
        .expect("iterate");
    assert_eq!(count, 2500);

    tracker.close();
}

#[tokio::test]
async fn channel_sync_mode_applies_asynchronously() {
    let opts = Options { use_channel_sync_mode: true, ..all_tracking() };
    let tracker = StateTracker::open(1, opts).await.expect("open");

    tracker
        .handle_event(
            0,
            GatewayEvent::GuildCreate(Guild { id: "100".into(), name: "A".into(), ..Default::default() }),
            SyncMode::Channel,
        )
        .await
        .expect("enqueue");

    // No ordering guarantee between the call and application; poll briefly.
    let mut found = false;
    for _ in 0..100 {
        if tracker.guild("100").is_ok() {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(found, "queued event was never applied");

    tracker.close();
}

#[tokio::test]
async fn restart_keeps_messages_and_flushes_the_rest() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let base = Options {
        db_path: Some(dir.path().join("store")),
        ..all_tracking()
    };

    {
        let tracker = StateTracker::open(1, base.clone()).await.expect("first open");
        apply(
            &tracker,
            GatewayEvent::GuildCreate(Guild { id: "1".into(), name: "A".into(), ..Default::default() }),
        )
        .await;
        apply(
            &tracker,
            GatewayEvent::MessageCreate(Message {
                id: "3".into(),
                channel_id: "2".into(),
                content: "hi".into(),
                ..Default::default()
            }),
        )
        .await;
        tracker.close();
    }

    // Restart preserving messages: the guild is flushed (the ready burst
    // would rebuild it), the message survives.
    {
        let opts = Options { keep_old_messages_on_start: true, ..base.clone() };
        let tracker = StateTracker::open(1, opts).await.expect("second open");
        assert!(matches!(tracker.guild("1"), Err(StoreError::NotFound)));
        let (message, _) = tracker.channel_message("2", "3").expect("message kept");
        assert_eq!(message.content, "hi");
        tracker.close();
    }

    // Restart without keeping: the directory is wiped, messages included.
    {
        let tracker = StateTracker::open(1, base).await.expect("third open");
        assert!(matches!(tracker.channel_message("2", "3"), Err(StoreError::NotFound)));
        tracker.close();
    }
}

#[tokio::test]
async fn open_requires_ttl_when_tracking_messages() {
    let opts = Options { track_messages: true, message_ttl: None, ..Default::default() };
    let err = StateTracker::open(1, opts).await.unwrap_err();
    assert!(matches!(err, StoreError::Misconfiguration { .. }));
}
