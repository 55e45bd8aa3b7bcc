//! Core traits for the snapshot boundary and the buffer surface
//!
//! This module defines the two seams of the system:
//! - [`Snapshot`]: the consumed remote-read boundary, implemented by
//!   storage backends and mocked in tests.
//! - [`MemBuffer`]: the capability surface shared by every buffered view —
//!   the plain ordered buffer handed out by the pool, the lazy condition
//!   buffer, the buffered read/write store, and the union store itself.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Key, Value};

/// An immutable, point-in-time remote read view of the key-value store
///
/// Implementations perform the actual network reads. All methods are
/// synchronous; timeouts and retries are the implementation's concern, not
/// the overlay's. `Send + Sync` because the overlay is shared between the
/// buffered store and the union store as one instance, which must stay
/// free to move with its single-owner transaction.
pub trait Snapshot: Send + Sync {
    /// Read a single key
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` if the key is absent, or the backend's
    /// failure otherwise.
    fn get(&self, key: &Key) -> Result<Value>;

    /// Read a set of keys in one round-trip
    ///
    /// Absent keys are simply missing from the returned map; their absence
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the batched read fails as a whole.
    fn batch_get(&self, keys: &[Key]) -> Result<HashMap<Key, Value>>;

    /// Read the range `[start, end)` in one round-trip, up to `limit` entries
    ///
    /// An empty `end` key means "to the end of the keyspace" (the empty
    /// key orders before every other key, so it is useless as a real
    /// exclusive bound). A `limit` of 0 means no cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the ranged read fails as a whole.
    fn range_get(&self, start: &Key, end: &Key, limit: usize) -> Result<HashMap<Key, Value>>;

    /// Release the snapshot and any resources held by the backend
    ///
    /// Must be idempotent: the overlay may be released while other handles
    /// still exist.
    fn release(&self);
}

/// The shared surface of every buffered key-value view
///
/// `get` and `seek` take `&mut self`: the lazy condition buffer
/// materializes its backing instance on first use (including on seek), and
/// option-aware views may record a lazy condition during a read. `delete`
/// means "make the key read as absent from this view": plain buffers
/// remove the entry, the store layers record a tombstone that shadows the
/// snapshot.
pub trait MemBuffer {
    /// Read a key from this view
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` if the view has no value for the key.
    fn get(&mut self, key: &Key) -> Result<Value>;

    /// Write a key-value pair into this view
    ///
    /// # Errors
    ///
    /// Store-level implementations reject empty values (`Error::EmptyValue`);
    /// plain buffers accept them as sentinels.
    fn set(&mut self, key: Key, value: Value) -> Result<()>;

    /// Make a key read as absent from this view
    ///
    /// # Errors
    ///
    /// Returns an error only if recording the deletion fails.
    fn delete(&mut self, key: &Key) -> Result<()>;

    /// Iterate entries in ascending key order, starting at the first key
    /// `>= start` (`None` = from the beginning)
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot produce an iterator.
    fn seek(&mut self, start: Option<&Key>) -> Result<Box<dyn Iterator<Item = (Key, Value)> + '_>>;
}
