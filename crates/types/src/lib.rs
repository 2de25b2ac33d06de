//! Core types for the shardview gateway state cache.
//!
//! This crate provides the foundational types shared by the store facade and
//! the state tracker:
//! - Domain entities (guilds, members, channels, messages, presences, ...)
//! - The gateway dispatch event model
//! - The value codec used for persisted entities
//! - Snowflake identifier parsing

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod events;
pub mod snowflake;
pub mod types;

pub use codec::{decode, encode, encode_into, CodecError};
pub use events::GatewayEvent;
pub use types::*;
