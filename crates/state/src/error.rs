//! Tracker error types.
//!
//! Accessors surface the store facade's error verbatim (callers match on
//! [`StoreError::NotFound`] directly); event application wraps it with the
//! event's type name for diagnostics.

use snafu::Snafu;

pub use shardview_store::Error as StoreError;

/// Result type for tracker operations that touch the store.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// An event handler failed.
#[derive(Debug, Snafu)]
#[snafu(display("{kind} event failed: {source}"))]
pub struct EventError {
    /// Type name of the event that failed.
    pub kind: &'static str,
    /// The underlying store error.
    pub source: StoreError,
}
