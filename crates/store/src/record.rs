//! The record envelope: per-entry expiry and flag byte.
//!
//! The engine stores opaque values, so entry-level metadata travels in a
//! fixed header ahead of the encoded payload:
//!
//! ```text
//! [expires_at_unix_ms: u64 BE][flags: u8][payload...]
//! ```
//!
//! `expires_at_ms == 0` means the record never expires. The header decodes
//! without touching the payload, which lets the expiry sweep and flag
//! filters skip full deserialization.

use serde::Serialize;

use shardview_types::CodecError;

/// Envelope header width.
pub const HEADER_LEN: usize = 9;

/// Per-record flag byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFlags(u8);

impl RecordFlags {
    /// The record is soft-deleted; hidden from reads unless explicitly
    /// requested.
    pub const DELETED: RecordFlags = RecordFlags(0x01);
    /// Reserved: the record predates the current session.
    pub const OLD: RecordFlags = RecordFlags(0x02);

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        RecordFlags(0)
    }

    /// Constructs from a raw byte.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        RecordFlags(bits)
    }

    /// The raw byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: RecordFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    pub fn insert(&mut self, other: RecordFlags) {
        self.0 |= other.0;
    }
}

/// Decoded envelope header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordMeta {
    /// Absolute expiry in Unix milliseconds; 0 = never.
    pub expires_at_ms: u64,
    /// The record's flag byte.
    pub flags: RecordFlags,
}

impl RecordMeta {
    /// Whether the record has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms > 0 && now_ms > self.expires_at_ms
    }
}

/// Splits a raw record into its header and payload. `None` when the record
/// is shorter than the envelope header.
#[must_use]
pub fn split(raw: &[u8]) -> Option<(RecordMeta, &[u8])> {
    if raw.len() < HEADER_LEN {
        return None;
    }
    let expires_at_ms = u64::from_be_bytes(raw[..8].try_into().ok()?);
    let flags = RecordFlags::from_bits(raw[8]);
    Some((RecordMeta { expires_at_ms, flags }, &raw[HEADER_LEN..]))
}

/// Encodes a record into a reusable buffer: envelope header, then the
/// postcard payload. The buffer is cleared first and left cleared on
/// failure.
pub fn encode_record<T: Serialize>(
    value: &T,
    meta: RecordMeta,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    buf.clear();
    buf.extend_from_slice(&meta.expires_at_ms.to_be_bytes());
    buf.push(meta.flags.bits());
    match postcard::to_extend(value, std::mem::take(buf)) {
        Ok(out) => {
            *buf = out;
            Ok(())
        }
        Err(source) => Err(CodecError::Encode { source }),
    }
}
