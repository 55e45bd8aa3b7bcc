//! Buffered read/write store
//!
//! `BufferStore` merges the snapshot overlay with a transaction-local write
//! buffer to give read-your-own-writes semantics: reads consult the buffer
//! first and fall through to the overlay, writes land only in the buffer.
//! A deletion is recorded as a tombstone — a buffered empty value — so it
//! shadows the snapshot on reads and still shows up when the buffer is
//! walked to encode the commit.

use std::sync::Arc;

use unionkv_core::{Error, Key, MemBuffer, Result, Value};
use unionkv_buffer::MemDbBuffer;

use crate::cache_snapshot::CacheSnapshot;
use crate::union_iter::UnionIter;

/// Read-your-own-writes store over a shared snapshot overlay
#[derive(Debug)]
pub struct BufferStore {
    buffer: MemDbBuffer,
    snapshot: Arc<CacheSnapshot>,
}

impl BufferStore {
    /// Create a store reading through `snapshot`
    pub fn new(snapshot: Arc<CacheSnapshot>) -> Self {
        Self {
            buffer: MemDbBuffer::new(),
            snapshot,
        }
    }

    /// The raw buffered entry for a key, tombstones included
    ///
    /// `None` means the buffer holds nothing for the key — the snapshot
    /// decides. The union store uses this to branch before going remote.
    pub fn buffered(&self, key: &Key) -> Option<Value> {
        self.buffer.get(key).ok()
    }

    /// Read a key: buffer first, then the snapshot overlay
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` for a buffered tombstone or a key absent
    /// from both layers; remote failures propagate.
    pub fn get(&self, key: &Key) -> Result<Value> {
        match self.buffered(key) {
            Some(value) if value.is_empty() => Err(Error::NotExist(key.clone())),
            Some(value) => Ok(value),
            None => self.snapshot.get(key),
        }
    }

    /// Buffer a write
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyValue` for a zero-length value: empty values
    /// are the tombstone sentinel and cannot be stored.
    pub fn set(&mut self, key: Key, value: Value) -> Result<()> {
        if value.is_empty() {
            return Err(Error::EmptyValue(key));
        }
        self.buffer.set(key, value);
        Ok(())
    }

    /// Buffer a deletion (tombstone)
    pub fn delete(&mut self, key: &Key) {
        self.buffer.set(key.clone(), Value::new());
    }

    /// Merged ascending iteration over the buffer and the overlay's cache
    ///
    /// Buffered entries shadow cached ones; tombstones suppress their key.
    /// Remote data enters the view via the prefetch calls, never here.
    pub fn seek(&self, start: Option<&Key>) -> UnionIter<'_> {
        UnionIter::new(
            Box::new(self.buffer.seek(start)),
            self.snapshot.cached_range(start),
        )
    }

    /// Apply `f` to every buffered pair in key order, tombstones included
    ///
    /// # Errors
    ///
    /// The first error from `f` aborts the walk and is returned.
    pub fn walk_buffer<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Key, &Value) -> Result<()>,
    {
        for (key, value) in self.buffer.seek(None) {
            f(&key, &value)?;
        }
        Ok(())
    }

    /// Number of buffered mutations (writes and tombstones)
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered mutations
    pub fn release(&mut self) {
        self.buffer.clear();
    }
}

impl MemBuffer for BufferStore {
    fn get(&mut self, key: &Key) -> Result<Value> {
        BufferStore::get(self, key)
    }

    fn set(&mut self, key: Key, value: Value) -> Result<()> {
        BufferStore::set(self, key, value)
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        BufferStore::delete(self, key);
        Ok(())
    }

    fn seek(&mut self, start: Option<&Key>) -> Result<Box<dyn Iterator<Item = (Key, Value)> + '_>> {
        Ok(Box::new(BufferStore::seek(self, start)))
    }
}
