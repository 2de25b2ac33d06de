//! Feeds a synthetic gateway session through the tracker and queries the
//! resulting state.
//!
//! Run with `cargo run -p shardview --example gateway_sim`.

use std::time::Duration;

use shardview::{Options, StateTracker, SyncMode};
use shardview_types::{
    Channel, ChannelKind, GatewayEvent, Guild, Member, Message, Presence, Ready, Role, User,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let tracker = StateTracker::open(
        1,
        Options {
            track_messages: true,
            message_ttl: Some(Duration::from_secs(3600)),
            track_presences: true,
            track_members: true,
            track_roles: true,
            track_channels: true,
            keep_deleted_messages: true,
            ..Default::default()
        },
    )
    .await?;

    // The handshake burst: bot user plus one guild with inline state.
    let ready = Ready {
        user: User { id: "42".into(), username: "demo-bot".into(), bot: true, ..Default::default() },
        session_id: "session-1".into(),
        guilds: vec![Guild {
            id: "100".into(),
            name: "demo guild".into(),
            member_count: 2,
            channels: vec![Channel {
                id: "200".into(),
                guild_id: "100".into(),
                name: "general".into(),
                kind: ChannelKind::GuildText,
                ..Default::default()
            }],
            members: (0..2)
                .map(|i| Member {
                    user: User { id: (500 + i).to_string(), ..Default::default() },
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }],
    };
    tracker.handle_event(0, GatewayEvent::Ready(ready), SyncMode::Mutex).await?;

    // A slice of steady-state traffic.
    tracker
        .handle_event(
            0,
            GatewayEvent::RoleCreate {
                guild_id: "100".into(),
                role: Role { id: "300".into(), name: "admin".into(), ..Default::default() },
            },
            SyncMode::Mutex,
        )
        .await?;

    for id in ["401", "402", "403"] {
        tracker
            .handle_event(
                0,
                GatewayEvent::MessageCreate(Message {
                    id: id.into(),
                    channel_id: "200".into(),
                    content: format!("message {id}"),
                    author: Some(User { id: "500".into(), ..Default::default() }),
                    ..Default::default()
                }),
                SyncMode::Mutex,
            )
            .await?;
    }
    tracker
        .handle_event(
            0,
            GatewayEvent::MessageDelete { channel_id: "200".into(), message_id: "402".into() },
            SyncMode::Mutex,
        )
        .await?;
    tracker
        .handle_event(
            0,
            GatewayEvent::PresenceUpdate(Presence {
                user: User { id: "500".into(), username: "alice".into(), ..Default::default() },
                status: "online".into(),
                ..Default::default()
            }),
            SyncMode::Mutex,
        )
        .await?;

    // Query the materialized view.
    let me = tracker.self_user().expect("ready was applied");
    println!("logged in as {}", me.username);

    let guild = tracker.guild("100")?;
    println!(
        "guild {} ({} members, {} channels, {} roles)",
        guild.name,
        guild.member_count,
        guild.channels.len(),
        guild.roles.len()
    );

    println!("latest messages in #general (deleted hidden):");
    for message in tracker.last_channel_messages("200", 10, false)? {
        println!("  [{}] {}", message.id, message.content);
    }

    println!("presence of alice: {}", tracker.presence("500")?.status);

    tracker.close();
    Ok(())
}
