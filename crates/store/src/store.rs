//! The store facade over the embedded engine.
//!
//! Wraps a single redb database holding one byte-keyed table. Values carry
//! the record envelope from [`crate::record`]; reads treat expired records
//! as absent, and a periodic sweep reclaims them physically.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{fs, thread};

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use snafu::{ensure, IntoError, ResultExt};

use shardview_types::decode;

use crate::error::{DecodeSnafu, DifferentFormatVersionSnafu, Error, IoSnafu, MisconfigurationSnafu, Result};
use crate::keys::{self, META_KEY};
use crate::record::{self, RecordFlags, RecordMeta};

/// The single table holding every state row.
const STATE_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("state");

/// The on-disk format version. Bumped on any change to the key schema, the
/// record envelope, or the value encoding; stores written under a different
/// version fail to open.
pub const FORMAT_VERSION: u32 = 1;

/// Database file name inside the store directory.
const DB_FILE: &str = "state.redb";

/// How long to back off before retrying a conflicted update.
const CONFLICT_BACKOFF: Duration = Duration::from_millis(1);

/// The Meta record guarding the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    /// Format version the store was created with.
    pub format_version: u32,
}

/// Current wall-clock time in Unix milliseconds.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Removes an existing store directory before a fresh start.
///
/// The directory is renamed to `<path>_tmp` first so the removal is atomic
/// with respect to anything still looking at the original path, then deleted
/// recursively and recreated empty.
///
/// # Errors
///
/// Returns `Error::Io` if any filesystem step fails.
pub fn wipe_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push("_tmp");
        let tmp = path.with_file_name(name);
        fs::rename(path, &tmp).context(IoSnafu { path: path.to_path_buf() })?;
        fs::remove_dir_all(&tmp).context(IoSnafu { path: tmp })?;
    }
    fs::create_dir_all(path).context(IoSnafu { path: path.to_path_buf() })?;
    Ok(())
}

/// The embedded store holding all tracked state.
///
/// Cheap to share behind an `Arc`; transactions are handed out as owned
/// [`ReadTxn`] / [`WriteTxn`] values. The engine permits any number of
/// snapshot readers concurrently with one writer.
#[derive(Debug)]
pub struct Store {
    // The engine hands out transactions through a shared reference but
    // compaction needs exclusive access, hence the lock. Transaction begin
    // only takes it briefly in read mode.
    db: RwLock<Database>,
}

impl Store {
    /// Opens (or creates) the store in `dir` and verifies the format
    /// version recorded in the Meta row.
    ///
    /// # Errors
    ///
    /// - `Error::Misconfiguration` for an empty or filesystem-root path.
    /// - `Error::DifferentFormatVersion` when the persisted Meta row was
    ///   written by an incompatible build. No upgrade is attempted.
    /// - `Error::Io` / `Error::Storage` on filesystem or engine failures.
    pub fn open(dir: &Path) -> Result<Store> {
        ensure!(
            !dir.as_os_str().is_empty(),
            MisconfigurationSnafu { message: "no store path specified" }
        );
        ensure!(
            dir != Path::new("/"),
            MisconfigurationSnafu {
                message: "refusing to use the filesystem root as a store path"
            }
        );

        fs::create_dir_all(dir).context(IoSnafu { path: dir.to_path_buf() })?;

        let db = Database::create(dir.join(DB_FILE)).map_err(Error::storage)?;

        // Make sure the table exists before the first reader shows up.
        let txn = db.begin_write().map_err(Error::storage)?;
        txn.open_table(STATE_TABLE).map_err(Error::storage)?;
        txn.commit().map_err(Error::storage)?;

        let store = Store { db: RwLock::new(db) };
        store.check_format_version()?;
        Ok(store)
    }

    fn check_format_version(&self) -> Result<()> {
        match self.snapshot()?.get::<MetaInfo>(&META_KEY) {
            Ok((meta, _)) => {
                ensure!(
                    meta.format_version == FORMAT_VERSION,
                    DifferentFormatVersionSnafu {
                        stored: meta.format_version,
                        expected: FORMAT_VERSION,
                    }
                );
                Ok(())
            }
            Err(Error::NotFound) => self.update(|txn| {
                txn.set(&META_KEY, &MetaInfo { format_version: FORMAT_VERSION })
            }),
            Err(e) => Err(e),
        }
    }

    /// Opens a read snapshot. Readers never block writers or each other.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the engine cannot start a transaction.
    pub fn snapshot(&self) -> Result<ReadTxn> {
        let txn = self.db.read().begin_read().map_err(Error::storage)?;
        let table = txn.open_table(STATE_TABLE).map_err(Error::storage)?;
        Ok(ReadTxn { table, _txn: txn })
    }

    fn begin_write(&self) -> Result<WriteTxn> {
        let txn = self.db.read().begin_write().map_err(Error::storage)?;
        Ok(WriteTxn { txn })
    }

    /// Runs `f` inside a write transaction and commits.
    ///
    /// On [`Error::Conflict`] the transaction is discarded, a warning is
    /// logged, and `f` re-runs on a fresh transaction after a 1 ms backoff,
    /// indefinitely. `f` must therefore be idempotent: writes from a
    /// conflicted attempt never reach the store. Any other error aborts the
    /// transaction and is returned as-is.
    ///
    /// # Errors
    ///
    /// Whatever non-conflict error `f` or the commit produces.
    pub fn update<T>(&self, mut f: impl FnMut(&WriteTxn) -> Result<T>) -> Result<T> {
        loop {
            let txn = self.begin_write()?;
            match f(&txn) {
                Ok(value) => match txn.commit() {
                    Ok(()) => return Ok(value),
                    Err(Error::Conflict) => {}
                    Err(e) => return Err(e),
                },
                Err(Error::Conflict) => {}
                Err(e) => return Err(e),
            }
            tracing::warn!("transaction conflict, retrying");
            thread::sleep(CONFLICT_BACKOFF);
        }
    }

    /// Reads and decodes one record outside any caller transaction.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when the key is absent or the record expired.
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<(T, RecordMeta)> {
        self.snapshot()?.get(key)
    }

    /// [`Store::get`] variant that stages the raw record in a caller-owned
    /// buffer, growing it as needed. Hot paths reuse one buffer per worker
    /// to avoid a per-call allocation.
    ///
    /// # Errors
    ///
    /// Same as [`Store::get`].
    pub fn get_with_buffer<T: DeserializeOwned>(
        &self,
        key: &[u8],
        buf: &mut Vec<u8>,
    ) -> Result<(T, RecordMeta)> {
        self.snapshot()?.get_with_buffer(key, buf)
    }

    /// Physically removes expired records, committing at most `max_batch`
    /// deletions per transaction to stay under the engine's transaction
    /// size. Returns the number of records reclaimed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` on engine failures.
    pub fn sweep_expired(&self, now_ms: u64, max_batch: usize) -> Result<usize> {
        let mut total = 0;
        loop {
            let removed = self.update(|txn| {
                let mut expired: Vec<Vec<u8>> = Vec::new();
                let mut table = txn.txn.open_table(STATE_TABLE).map_err(Error::storage)?;
                for item in table.iter().map_err(Error::storage)? {
                    let (key, value) = item.map_err(Error::storage)?;
                    if let Some((meta, _)) = record::split(value.value()) {
                        if meta.is_expired(now_ms) {
                            expired.push(key.value().to_vec());
                            if expired.len() >= max_batch {
                                break;
                            }
                        }
                    }
                }
                for key in &expired {
                    table.remove(key.as_slice()).map_err(Error::storage)?;
                }
                Ok(expired.len())
            })?;
            total += removed;
            if removed < max_batch {
                return Ok(total);
            }
        }
    }

    /// Deletes every row except the Meta record and, when `keep_messages`
    /// is set, message rows. Used on startup to drop state from a previous
    /// session before the ready burst rebuilds it.
    ///
    /// Deletions are chunked into transactions of 100 000 keys so a large
    /// store cannot overflow a single transaction. Returns the number of
    /// rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` on engine failures.
    pub fn flush_old_data(&self, keep_messages: bool) -> Result<usize> {
        let mut total = 0;
        loop {
            let removed = self.update(|txn| {
                let mut doomed: Vec<Vec<u8>> = Vec::new();
                let mut table = txn.txn.open_table(STATE_TABLE).map_err(Error::storage)?;
                for item in table.iter().map_err(Error::storage)? {
                    let (key, _) = item.map_err(Error::storage)?;
                    let key = key.value();
                    if keys::is_meta_key(key) || (keep_messages && keys::is_message_key(key)) {
                        continue;
                    }
                    doomed.push(key.to_vec());
                    if doomed.len() >= FLUSH_CHUNK {
                        break;
                    }
                }
                for key in &doomed {
                    table.remove(key.as_slice()).map_err(Error::storage)?;
                }
                Ok(doomed.len())
            })?;
            total += removed;
            if removed < FLUSH_CHUNK {
                return Ok(total);
            }
        }
    }

    /// Compacts the database file, reclaiming space freed by the sweep.
    /// Returns whether the file shrank.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` when a transaction is in flight (the caller skips
    /// this cycle and retries later); `Error::Storage` otherwise.
    pub fn compact(&self) -> Result<bool> {
        let mut db = self.db.write();
        match db.compact() {
            Ok(shrank) => Ok(shrank),
            Err(redb::CompactionError::TransactionInProgress) => Err(Error::Conflict),
            Err(e) => Err(Error::storage(e)),
        }
    }
}

/// Chunk size for the startup flush.
const FLUSH_CHUNK: usize = 100_000;

/// A read snapshot over the state table.
pub struct ReadTxn {
    table: redb::ReadOnlyTable<&'static [u8], &'static [u8]>,
    // Held so the snapshot outlives every read through `table`.
    _txn: redb::ReadTransaction,
}

impl ReadTxn {
    /// Reads and decodes one record.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when the key is absent or the record expired;
    /// `Error::Decode` on a corrupt record.
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<(T, RecordMeta)> {
        let guard = self.table.get(key).map_err(Error::storage)?.ok_or(Error::NotFound)?;
        decode_record(guard.value())
    }

    /// [`ReadTxn::get`] staging the raw record in a caller-owned buffer.
    ///
    /// # Errors
    ///
    /// Same as [`ReadTxn::get`].
    pub fn get_with_buffer<T: DeserializeOwned>(
        &self,
        key: &[u8],
        buf: &mut Vec<u8>,
    ) -> Result<(T, RecordMeta)> {
        let guard = self.table.get(key).map_err(Error::storage)?.ok_or(Error::NotFound)?;
        buf.clear();
        buf.extend_from_slice(guard.value());
        drop(guard);
        decode_record(buf)
    }

    /// Scans all live (non-expired) records under `prefix` in key order.
    /// The callback receives `(key, meta, payload)` and returns `false` to
    /// stop early.
    ///
    /// # Errors
    ///
    /// `Error::Storage` on iterator failures, `Error::Decode` on corrupt
    /// records, or whatever the callback returns.
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        mut f: impl FnMut(&[u8], RecordMeta, &[u8]) -> Result<bool>,
    ) -> Result<()> {
        use std::ops::Bound;

        let upper = keys::next_prefix(prefix);
        let bounds = (
            Bound::Included(prefix),
            match upper.as_deref() {
                Some(hi) => Bound::Excluded(hi),
                None => Bound::Unbounded,
            },
        );
        let now = now_ms();
        for item in self.table.range::<&[u8]>(bounds).map_err(Error::storage)? {
            let (key, value) = item.map_err(Error::storage)?;
            let (meta, payload) =
                record::split(value.value()).ok_or_else(Error::truncated_record)?;
            if meta.is_expired(now) {
                continue;
            }
            if !f(key.value(), meta, payload)? {
                break;
            }
        }
        Ok(())
    }

    /// Typed forward scan: decodes each live record under `prefix` and hands
    /// it to the callback, which returns `false` to stop early.
    ///
    /// # Errors
    ///
    /// Same as [`ReadTxn::scan_prefix`], plus `Error::Decode` when a payload
    /// fails to deserialize.
    pub fn scan_values<T: DeserializeOwned>(
        &self,
        prefix: &[u8],
        mut f: impl FnMut(RecordMeta, T) -> bool,
    ) -> Result<()> {
        self.scan_prefix(prefix, |_, meta, payload| {
            let value = decode::<T>(payload)?;
            Ok(f(meta, value))
        })
    }

    /// Typed reverse scan from `seek` down through `prefix`.
    ///
    /// # Errors
    ///
    /// Same as [`ReadTxn::scan_values`].
    pub fn scan_values_rev<T: DeserializeOwned>(
        &self,
        prefix: &[u8],
        seek: &[u8],
        mut f: impl FnMut(RecordMeta, T) -> bool,
    ) -> Result<()> {
        self.scan_prefix_rev(prefix, seek, |_, meta, payload| {
            let value = decode::<T>(payload)?;
            Ok(f(meta, value))
        })
    }

    /// Reverse scan: starts at `seek` (inclusive) and walks toward `prefix`,
    /// visiting records in descending key order. With a seek key of
    /// `[prefix][0xFF…]` this yields newest-first iteration over
    /// time-ordered snowflake keys.
    ///
    /// # Errors
    ///
    /// Same as [`ReadTxn::scan_prefix`].
    pub fn scan_prefix_rev(
        &self,
        prefix: &[u8],
        seek: &[u8],
        mut f: impl FnMut(&[u8], RecordMeta, &[u8]) -> Result<bool>,
    ) -> Result<()> {
        use std::ops::Bound;

        let bounds = (Bound::Included(prefix), Bound::Included(seek));
        let now = now_ms();
        for item in self.table.range::<&[u8]>(bounds).map_err(Error::storage)?.rev() {
            let (key, value) = item.map_err(Error::storage)?;
            let (meta, payload) =
                record::split(value.value()).ok_or_else(Error::truncated_record)?;
            if meta.is_expired(now) {
                continue;
            }
            if !f(key.value(), meta, payload)? {
                break;
            }
        }
        Ok(())
    }
}

/// An open write transaction. Dropped without [`WriteTxn::commit`] it
/// aborts, discarding every write.
pub struct WriteTxn {
    txn: redb::WriteTransaction,
}

impl WriteTxn {
    /// Reads one record through the transaction, observing its own
    /// uncommitted writes.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when the key is absent or the record expired.
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<(T, RecordMeta)> {
        let table = self.txn.open_table(STATE_TABLE).map_err(Error::storage)?;
        let guard = table.get(key).map_err(Error::storage)?.ok_or(Error::NotFound)?;
        decode_record(guard.value())
    }

    /// [`WriteTxn::get`] staging the raw record in a caller-owned buffer.
    ///
    /// # Errors
    ///
    /// Same as [`WriteTxn::get`].
    pub fn get_with_buffer<T: DeserializeOwned>(
        &self,
        key: &[u8],
        buf: &mut Vec<u8>,
    ) -> Result<(T, RecordMeta)> {
        let table = self.txn.open_table(STATE_TABLE).map_err(Error::storage)?;
        let guard = table.get(key).map_err(Error::storage)?.ok_or(Error::NotFound)?;
        buf.clear();
        buf.extend_from_slice(guard.value());
        drop(guard);
        drop(table);
        decode_record(buf)
    }

    /// Writes a record with no expiry and no flags.
    ///
    /// # Errors
    ///
    /// `Error::Encode` or `Error::Storage`.
    pub fn set<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        self.set_record(&mut Vec::new(), key, value, 0, RecordFlags::empty())
    }

    /// Writes a record expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// `Error::Encode` or `Error::Storage`.
    pub fn set_with_ttl<T: Serialize>(&self, key: &[u8], value: &T, ttl: Duration) -> Result<()> {
        let expires = now_ms().saturating_add(ttl.as_millis() as u64);
        self.set_record(&mut Vec::new(), key, value, expires, RecordFlags::empty())
    }

    /// Core write: encodes `value` behind an envelope carrying an absolute
    /// expiry (`0` = never) and a flag byte, staged in the caller's reusable
    /// buffer. The engine copies the bytes during insert, so the buffer is
    /// free for reuse as soon as this returns; it is cleared before use and
    /// on encode failure.
    ///
    /// # Errors
    ///
    /// `Error::Encode` or `Error::Storage`.
    pub fn set_record<T: Serialize>(
        &self,
        buf: &mut Vec<u8>,
        key: &[u8],
        value: &T,
        expires_at_ms: u64,
        flags: RecordFlags,
    ) -> Result<()> {
        let meta = RecordMeta { expires_at_ms, flags };
        record::encode_record(value, meta, buf)
            .map_err(|source| crate::error::EncodeSnafu.into_error(source))?;
        let mut table = self.txn.open_table(STATE_TABLE).map_err(Error::storage)?;
        table.insert(key, buf.as_slice()).map_err(Error::storage)?;
        Ok(())
    }

    /// Removes a record. An absent key is not an error.
    ///
    /// # Errors
    ///
    /// `Error::Storage` on engine failures.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut table = self.txn.open_table(STATE_TABLE).map_err(Error::storage)?;
        table.remove(key).map_err(Error::storage)?;
        Ok(())
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// `Error::Storage` if the engine fails to persist.
    pub fn commit(self) -> Result<()> {
        self.txn.commit().map_err(Error::storage)
    }
}

fn decode_record<T: DeserializeOwned>(raw: &[u8]) -> Result<(T, RecordMeta)> {
    let (meta, payload) = record::split(raw).ok_or_else(Error::truncated_record)?;
    if meta.is_expired(now_ms()) {
        return Err(Error::NotFound);
    }
    let value = decode(payload).map_err(|source| DecodeSnafu.into_error(source))?;
    Ok((value, meta))
}
