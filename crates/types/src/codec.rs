//! Value encoding/decoding for persisted entities.
//!
//! Wraps postcard serialization behind a small function surface with
//! consistent error handling via snafu. The wire format is internal: it only
//! has to round-trip and stay stable across restarts under the same store
//! format version.

use serde::{de::DeserializeOwned, Serialize};
use snafu::Snafu;

/// Errors from value encoding or decoding.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Serialization failed.
    #[snafu(display("Encode error: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Deserialization failed (truncated or malformed input).
    #[snafu(display("Decode error: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },
}

/// Encodes a value to a freshly allocated byte vector.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(value).map_err(|source| CodecError::Encode { source })
}

/// Encodes a value into a reusable buffer.
///
/// The buffer is cleared first and holds exactly the encoded value on
/// success. On failure the buffer is left cleared, so a worker can keep
/// reusing it without inspecting the error.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode_into<T: Serialize>(value: &T, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    buf.clear();
    match postcard::to_extend(value, std::mem::take(buf)) {
        Ok(out) => {
            *buf = out;
            Ok(())
        }
        Err(source) => Err(CodecError::Encode { source }),
    }
}

/// Decodes a value from bytes.
///
/// # Errors
///
/// Returns `CodecError::Decode` on truncated or malformed input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    postcard::from_bytes(bytes).map_err(|source| CodecError::Decode { source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::{Guild, Member, Message, Presence, User, VoiceState};

    #[test]
    fn encode_decode_roundtrip_member() {
        let member = Member {
            user: User { id: "123".into(), username: "bob".into(), ..Default::default() },
            guild_id: "321".into(),
            nick: "nickname".into(),
            roles: vec!["1".into(), "2".into()],
            ..Default::default()
        };

        let bytes = encode(&member).expect("encode");
        let back: Member = decode(&bytes).expect("decode");
        assert_eq!(back, member);
    }

    #[test]
    fn encode_decode_roundtrip_guild() {
        let guild = Guild {
            id: "100".into(),
            name: "A".into(),
            member_count: 10,
            verification_level: 2,
            ..Default::default()
        };

        let bytes = encode(&guild).expect("encode");
        let back: Guild = decode(&bytes).expect("decode");
        assert_eq!(back, guild);
    }

    #[test]
    fn encode_decode_roundtrip_message() {
        let message = Message {
            id: "3".into(),
            channel_id: "2".into(),
            content: "hi".into(),
            author: Some(User { id: "5".into(), ..Default::default() }),
            ..Default::default()
        };

        let bytes = encode(&message).expect("encode");
        let back: Message = decode(&bytes).expect("decode");
        assert_eq!(back, message);
    }

    #[test]
    fn encode_decode_roundtrip_presence_and_voice() {
        let presence = Presence {
            user: User { id: "5".into(), username: "bob".into(), ..Default::default() },
            status: "online".into(),
            nick: "billy".into(),
            ..Default::default()
        };
        let voice = VoiceState {
            guild_id: "1".into(),
            user_id: "5".into(),
            channel_id: "2".into(),
            mute: true,
            ..Default::default()
        };

        let p: Presence = decode(&encode(&presence).unwrap()).unwrap();
        let v: VoiceState = decode(&encode(&voice).unwrap()).unwrap();
        assert_eq!(p, presence);
        assert_eq!(v, voice);
    }

    #[test]
    fn encode_into_reuses_buffer() {
        let user = User { id: "1".into(), ..Default::default() };
        let mut buf = Vec::new();

        encode_into(&user, &mut buf).expect("first encode");
        let first = buf.clone();

        // A second encode into the same buffer must not accumulate bytes.
        encode_into(&user, &mut buf).expect("second encode");
        assert_eq!(buf, first);

        let back: User = decode(&buf).expect("decode");
        assert_eq!(back, user);
    }

    #[test]
    fn decode_truncated_fails() {
        let bytes = encode(&Guild { id: "100".into(), name: "A".into(), ..Default::default() })
            .expect("encode");
        let err = decode::<Guild>(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn decode_garbage_fails() {
        let err = decode::<Message>(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }
}
