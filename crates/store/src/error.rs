//! Error types for the store facade.

use std::path::PathBuf;

use snafu::{IntoError, Location, Snafu};

use shardview_types::CodecError;

/// Result type for store operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the store facade.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The requested key does not exist (or its record has expired).
    #[snafu(display("Key not found"))]
    NotFound,

    /// Another transaction held the store; the operation can be retried.
    ///
    /// The engine serializes write transactions, so key-range conflicts
    /// cannot occur between writers; this arises from whole-store contention
    /// such as compaction racing open transactions.
    #[snafu(display("Transaction conflict"))]
    Conflict,

    /// A stored record failed to decode.
    #[snafu(display("Decode error: {source}"))]
    Decode {
        /// The underlying codec error.
        source: CodecError,
        /// Source code location for debugging.
        #[snafu(implicit)]
        location: Location,
    },

    /// A value failed to encode.
    #[snafu(display("Encode error: {source}"))]
    Encode {
        /// The underlying codec error.
        source: CodecError,
        /// Source code location for debugging.
        #[snafu(implicit)]
        location: Location,
    },

    /// The storage engine failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// The underlying engine error.
        source: redb::Error,
        /// Source code location for debugging.
        #[snafu(implicit)]
        location: Location,
    },

    /// A filesystem operation on the store directory failed.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        /// The path the operation touched.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The on-disk format version differs from the compiled one. No upgrade
    /// is attempted; the caller decides whether to wipe and retry.
    #[snafu(display("Store was written with format version {stored}, this build uses {expected}"))]
    DifferentFormatVersion {
        /// Version found in the Meta record.
        stored: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// The store was set up with unusable parameters.
    #[snafu(display("Misconfiguration: {message}"))]
    Misconfiguration {
        /// What was wrong.
        message: String,
    },
}

impl From<CodecError> for Error {
    fn from(source: CodecError) -> Self {
        match source {
            CodecError::Encode { .. } => EncodeSnafu.into_error(source),
            CodecError::Decode { .. } => DecodeSnafu.into_error(source),
        }
    }
}

impl Error {
    /// Wraps any engine error into [`Error::Storage`].
    pub(crate) fn storage(source: impl Into<redb::Error>) -> Self {
        StorageSnafu.into_error(source.into())
    }

    /// A decode failure caused by a record shorter than its envelope header.
    pub(crate) fn truncated_record() -> Self {
        DecodeSnafu.into_error(CodecError::Decode {
            source: postcard::Error::DeserializeUnexpectedEnd,
        })
    }
}
