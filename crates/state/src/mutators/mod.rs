//! State mutators: one module per entity family.
//!
//! Every mutator is transaction-optional: called with `None` it re-enters
//! itself through [`Store::update`](shardview_store::Store::update), so a
//! conflicted attempt re-runs from scratch on a fresh transaction. Mutators
//! therefore never cache reads across attempts — each read happens inside
//! the transaction that will commit it.

mod channel;
mod guild;
mod member;
mod message;
mod presence;

use crate::error::{Result, StoreError};

/// Guild-create member and presence loads are split into chunks of this
/// many rows, each committed in its own transaction, so a large initial
/// sync stays under the engine's transaction size.
pub(crate) const LOAD_CHUNK: usize = 1_000;

/// Maps `NotFound` to `None` for reads where absence is a legitimate state.
pub(crate) fn maybe<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}
