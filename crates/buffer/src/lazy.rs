//! Lazily-backed recorder of condition pairs
//!
//! `LazyConditionBuffer` records per-transaction predicates — key to
//! expected value, where an empty expected value means "key must not
//! exist" — without touching storage. The backing buffer is acquired from
//! the pool only on the first write, so a transaction that records no
//! conditions allocates nothing and pays nothing at validation time.
//!
//! The state is an explicit two-variant machine rather than a nullable
//! reference: every operation branches once on the state, and the empty
//! fast path is visible in the type.

use std::sync::Arc;

use tracing::trace;

use unionkv_core::{Error, Key, MemBuffer, Result, Value};

use crate::memdb::MemDbBuffer;
use crate::pool::BufferPool;

/// Backing-instance state of the buffer
#[derive(Debug)]
enum LazyState {
    /// Nothing recorded; no backing instance held
    Empty,
    /// Backing instance acquired from the pool
    Materialized(MemDbBuffer),
}

/// Buffer-backed recorder of lazy condition pairs
///
/// Reads on an empty buffer never allocate. Writes materialize a backing
/// instance from the pool; `release` returns it. Recording a key twice
/// overwrites the expected value — the last recorded condition wins.
#[derive(Debug)]
pub struct LazyConditionBuffer {
    pool: Arc<BufferPool>,
    state: LazyState,
}

impl LazyConditionBuffer {
    /// Create an empty buffer drawing from `pool`
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            state: LazyState::Empty,
        }
    }

    fn materialize(&mut self) -> &mut MemDbBuffer {
        if let LazyState::Empty = self.state {
            trace!("materializing lazy condition buffer");
            self.state = LazyState::Materialized(self.pool.acquire());
        }
        match &mut self.state {
            LazyState::Materialized(buf) => buf,
            LazyState::Empty => unreachable!("state was just materialized"),
        }
    }

    /// Read a recorded condition value
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` if nothing was ever recorded or the key
    /// has no recorded condition. Never allocates.
    pub fn get(&self, key: &Key) -> Result<Value> {
        match &self.state {
            LazyState::Empty => Err(Error::NotExist(key.clone())),
            LazyState::Materialized(buf) => buf.get(key),
        }
    }

    /// Record a condition pair (empty `value` = "key must not exist")
    ///
    /// Materializes the backing instance on first call.
    pub fn set(&mut self, key: Key, value: Value) {
        self.materialize().set(key, value);
    }

    /// Remove a recorded condition
    ///
    /// Mirrors `set`: the backing instance is materialized even when there
    /// is nothing to remove, an accepted minor inefficiency.
    pub fn delete(&mut self, key: &Key) {
        self.materialize().remove(key);
    }

    /// Iterate recorded pairs in ascending key order starting at the first
    /// key `>= start` (`None` = from the beginning)
    ///
    /// Materializes the backing instance if absent.
    pub fn seek<'a>(&'a mut self, start: Option<&Key>) -> impl Iterator<Item = (Key, Value)> + 'a {
        MemDbBuffer::seek(self.materialize(), start)
    }

    /// Return the backing instance to the pool, if one is held
    ///
    /// Idempotent: releasing an empty buffer is a no-op.
    pub fn release(&mut self) {
        if let LazyState::Materialized(buf) = std::mem::replace(&mut self.state, LazyState::Empty) {
            trace!(entries = buf.len(), "releasing lazy condition buffer");
            self.pool.release(buf);
        }
    }

    /// Number of recorded conditions (zero when empty, without allocating)
    pub fn len(&self) -> usize {
        match &self.state {
            LazyState::Empty => 0,
            LazyState::Materialized(buf) => buf.len(),
        }
    }

    /// Check whether no conditions are recorded (never allocates)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemBuffer for LazyConditionBuffer {
    fn get(&mut self, key: &Key) -> Result<Value> {
        LazyConditionBuffer::get(self, key)
    }

    fn set(&mut self, key: Key, value: Value) -> Result<()> {
        LazyConditionBuffer::set(self, key, value);
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        LazyConditionBuffer::delete(self, key);
        Ok(())
    }

    fn seek(&mut self, start: Option<&Key>) -> Result<Box<dyn Iterator<Item = (Key, Value)> + '_>> {
        Ok(Box::new(LazyConditionBuffer::seek(self, start)))
    }
}

impl Drop for LazyConditionBuffer {
    fn drop(&mut self) {
        self.release();
    }
}
