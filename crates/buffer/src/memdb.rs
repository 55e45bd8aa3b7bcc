//! In-memory ordered key-value buffer
//!
//! `MemDbBuffer` is the workhorse buffer of the system: the write buffer of
//! the buffered store, the backing instance of the lazy condition buffer,
//! and the element type recycled by the pool. It is a `BTreeMap` behind a
//! small façade, so iteration is always in ascending key order.
//!
//! Empty values are stored verbatim. Whether an empty value means
//! "tombstone" or "assert absence" is decided by the layer above; this
//! buffer does not interpret values at all.

use std::collections::BTreeMap;
use std::ops::Bound;

use unionkv_core::{Error, Key, MemBuffer, Result, Value};

/// Ordered in-memory buffer over `BTreeMap<Key, Value>`
#[derive(Debug, Default)]
pub struct MemDbBuffer {
    entries: BTreeMap<Key, Value>,
}

impl MemDbBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a buffered value
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` if the key has no entry.
    pub fn get(&self, key: &Key) -> Result<Value> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotExist(key.clone()))
    }

    /// Insert or overwrite an entry (empty values permitted)
    pub fn set(&mut self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    /// Remove an entry, returning its value if it was present
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Iterate entries in ascending key order starting at the first key
    /// `>= start` (`None` = from the beginning)
    pub fn seek<'a>(&'a self, start: Option<&Key>) -> impl Iterator<Item = (Key, Value)> + 'a {
        let lower = match start {
            Some(k) => Bound::Included(k.clone()),
            None => Bound::Unbounded,
        };
        self.entries
            .range((lower, Bound::Unbounded))
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MemBuffer for MemDbBuffer {
    fn get(&mut self, key: &Key) -> Result<Value> {
        MemDbBuffer::get(self, key)
    }

    fn set(&mut self, key: Key, value: Value) -> Result<()> {
        MemDbBuffer::set(self, key, value);
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.remove(key);
        Ok(())
    }

    fn seek(&mut self, start: Option<&Key>) -> Result<Box<dyn Iterator<Item = (Key, Value)> + '_>> {
        Ok(Box::new(MemDbBuffer::seek(self, start)))
    }
}
