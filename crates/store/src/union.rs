//! The union store: the transaction-facing overlay
//!
//! `UnionStore` composes the buffered read/write store, the snapshot
//! overlay, the lazy condition buffer, and the option map into the surface
//! a transaction works against: merged reads and writes, cache-warming
//! prefetches, cheap condition recording, and the single batched
//! validation pass that runs before commit.
//!
//! One instance belongs to one logical transaction. The composition is
//! explicit — every forwarded call is written out — and `release` consumes
//! the store, so nothing can be called on it afterwards.

use std::sync::Arc;

use tracing::debug;

use unionkv_buffer::{BufferPool, LazyConditionBuffer};
use unionkv_core::{
    Error, Key, MemBuffer, OptionValue, Result, SharedOptions, Snapshot, StoreOption, Value,
};

use crate::buffer_store::BufferStore;
use crate::cache_snapshot::CacheSnapshot;
use crate::union_iter::UnionIter;

/// Transaction-facing overlay over one point-in-time snapshot
///
/// Created once per logical transaction; accumulates reads, writes, and
/// condition pairs; validated with [`check_lazy_condition_pairs`] and torn
/// down with [`release`].
///
/// [`check_lazy_condition_pairs`]: UnionStore::check_lazy_condition_pairs
/// [`release`]: UnionStore::release
#[derive(Debug)]
pub struct UnionStore {
    buffers: BufferStore,
    // Same instance as the one inside `buffers`: reads and validation
    // must share one set of cached results.
    snapshot: Arc<CacheSnapshot>,
    lazy: LazyConditionBuffer,
    opts: SharedOptions,
}

impl UnionStore {
    /// Build a union store over `snapshot`, drawing buffers from the
    /// process-wide pool
    pub fn new(snapshot: Box<dyn Snapshot>) -> Self {
        Self::with_pool(snapshot, BufferPool::global())
    }

    /// Build a union store over `snapshot` with an injected buffer pool
    pub fn with_pool(snapshot: Box<dyn Snapshot>, pool: Arc<BufferPool>) -> Self {
        let opts = SharedOptions::new();
        let overlay = Arc::new(CacheSnapshot::new(snapshot, opts.clone()));
        Self {
            buffers: BufferStore::new(Arc::clone(&overlay)),
            snapshot: overlay,
            lazy: LazyConditionBuffer::new(pool),
            opts,
        }
    }

    /// Read a key through the merged view
    ///
    /// With `PresumeKeyNotExists` set, a key absent from the write buffer
    /// is reported absent without a remote read, and a must-not-exist
    /// condition is recorded for the batched pre-commit check.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` for absent (or presumed-absent) keys;
    /// remote failures propagate.
    pub fn get(&mut self, key: &Key) -> Result<Value> {
        match self.buffers.buffered(key) {
            Some(value) if value.is_empty() => Err(Error::NotExist(key.clone())),
            Some(value) => Ok(value),
            None => {
                if self.opts.is_set(StoreOption::PresumeKeyNotExists) {
                    self.lazy.set(key.clone(), Value::new());
                    return Err(Error::NotExist(key.clone()));
                }
                self.snapshot.get(key)
            }
        }
    }

    /// Buffer a write
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyValue` for a zero-length value.
    pub fn set(&mut self, key: Key, value: Value) -> Result<()> {
        self.buffers.set(key, value)
    }

    /// Buffer a deletion
    pub fn delete(&mut self, key: &Key) {
        self.buffers.delete(key)
    }

    /// Merged ascending iteration, starting at the first key `>= start`
    pub fn seek(&self, start: Option<&Key>) -> UnionIter<'_> {
        self.buffers.seek(start)
    }

    /// Apply `f` to every buffered mutation in key order
    ///
    /// # Errors
    ///
    /// The first error from `f` aborts the walk and is returned.
    pub fn walk_buffer<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(&Key, &Value) -> Result<()>,
    {
        self.buffers.walk_buffer(f)
    }

    /// Record a lazy condition pair for the pre-commit check
    ///
    /// An empty `expected` value records "key must not exist". Recording a
    /// key again overwrites its expectation. No storage access happens
    /// here — that is the whole point.
    pub fn record_condition(&mut self, key: Key, expected: Value) {
        self.lazy.set(key, expected);
    }

    /// Number of recorded condition pairs
    pub fn condition_count(&self) -> usize {
        self.lazy.len()
    }

    /// Warm the overlay cache with a single batched read
    ///
    /// Returned values are discarded; only the cache effect matters.
    /// An empty key list succeeds without any remote access.
    ///
    /// # Errors
    ///
    /// The first remote failure is returned, wrapped with call-site
    /// context.
    pub fn batch_prefetch(&self, keys: &[Key]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.snapshot
            .batch_get(keys)
            .map(drop)
            .map_err(|e| Error::upstream("batch_prefetch", e))
    }

    /// Warm the overlay cache with one ranged read over `[start, end)`
    ///
    /// An empty `end` key means "to the end of the keyspace"; `limit` of 0
    /// means no cap. Returned values are discarded.
    ///
    /// # Errors
    ///
    /// The remote failure is returned, wrapped with call-site context.
    pub fn range_prefetch(&self, start: &Key, end: &Key, limit: usize) -> Result<()> {
        self.snapshot
            .range_get(start, end, limit)
            .map(drop)
            .map_err(|e| Error::upstream("range_prefetch", e))
    }

    /// Validate every recorded condition pair in one batched read
    ///
    /// With no conditions recorded this returns immediately — no remote
    /// access, no allocation. Otherwise the recorded keys are fetched in a
    /// single batched read against the overlay and each pair is checked in
    /// ascending key order, failing fast on the first violation.
    ///
    /// A failure means the transaction cannot commit; the caller is
    /// expected to abort or retry from a fresh snapshot.
    ///
    /// # Errors
    ///
    /// - `Error::KeyExists`: a must-not-exist key is present in storage,
    ///   whatever its stored value.
    /// - `Error::ConditionMismatch`: a stored value differs byte-for-byte
    ///   from the expectation, or the key is absent.
    /// - `Error::Upstream`: the batched read itself failed.
    pub fn check_lazy_condition_pairs(&mut self) -> Result<()> {
        if self.lazy.is_empty() {
            return Ok(());
        }

        let keys: Vec<Key> = self.lazy.seek(None).map(|(key, _)| key).collect();
        debug!(pairs = keys.len(), "validating lazy condition pairs");

        let values = self
            .snapshot
            .batch_get(&keys)
            .map_err(|e| Error::upstream("check_lazy_condition_pairs", e))?;

        for (key, expected) in self.lazy.seek(None) {
            if expected.is_empty() {
                if values.contains_key(&key) {
                    debug!(%key, "must-not-exist condition violated");
                    return Err(Error::KeyExists(key));
                }
            } else {
                match values.get(&key) {
                    Some(actual) if *actual == expected => {}
                    actual => {
                        debug!(%key, "condition value mismatch");
                        return Err(Error::ConditionMismatch {
                            key,
                            expected,
                            actual: actual.cloned(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Set a per-transaction option (overwrites any previous value)
    pub fn set_option(&self, opt: StoreOption, value: OptionValue) {
        self.opts.set(opt, value);
    }

    /// Remove a per-transaction option
    pub fn del_option(&self, opt: StoreOption) {
        self.opts.del(opt);
    }

    /// Release the store and everything it owns
    ///
    /// Releases the snapshot overlay (and through it, the remote snapshot,
    /// exactly once), the buffered store, and the lazy condition buffer,
    /// returning any pooled backing instance. Consuming `self` makes
    /// use-after-release unrepresentable.
    pub fn release(mut self) {
        debug!(
            buffered = self.buffers.buffered_len(),
            conditions = self.lazy.len(),
            "releasing union store"
        );
        self.snapshot.release();
        self.buffers.release();
        self.lazy.release();
    }
}

impl MemBuffer for UnionStore {
    fn get(&mut self, key: &Key) -> Result<Value> {
        UnionStore::get(self, key)
    }

    fn set(&mut self, key: Key, value: Value) -> Result<()> {
        UnionStore::set(self, key, value)
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        UnionStore::delete(self, key);
        Ok(())
    }

    fn seek(&mut self, start: Option<&Key>) -> Result<Box<dyn Iterator<Item = (Key, Value)> + '_>> {
        Ok(Box::new(UnionStore::seek(self, start)))
    }
}
