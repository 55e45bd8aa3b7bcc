//! Caching overlay over the remote snapshot
//!
//! `CacheSnapshot` sits between the buffered store and the remote
//! [`Snapshot`], absorbing repeated reads into a local cache. Both present
//! values and confirmed absences are cached, so a missing key costs one
//! round-trip for the lifetime of the transaction, and a batched read only
//! goes remote for keys the cache has never seen.
//!
//! The overlay consults the shared option map on every point read:
//! `RangePrefetchOnCacheMiss` turns a single-key miss into a ranged read
//! that warms the keys a scan is about to touch, capped by `ScanBatchSize`.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use unionkv_core::{Error, Key, Result, SharedOptions, Snapshot, StoreOption, Value};

/// Entries per ranged read when `ScanBatchSize` is not set
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 256;

/// A cached read outcome
#[derive(Debug, Clone)]
enum CachedEntry {
    /// The snapshot holds this value for the key
    Present(Value),
    /// The snapshot confirmed the key is absent
    Absent,
}

/// Prefetching, caching wrapper around a remote [`Snapshot`]
///
/// The overlay is shared between the buffered store (reads) and the union
/// store (validation, prefetch) as one instance, so every consumer sees
/// one consistent set of cached results. Interior mutability keeps the
/// sharing ergonomic; the transaction is still single-owner by contract.
pub struct CacheSnapshot {
    snapshot: Box<dyn Snapshot>,
    cache: RwLock<BTreeMap<Key, CachedEntry>>,
    opts: SharedOptions,
    released: AtomicBool,
}

impl CacheSnapshot {
    /// Wrap a remote snapshot, consulting `opts` on point reads
    pub fn new(snapshot: Box<dyn Snapshot>, opts: SharedOptions) -> Self {
        Self {
            snapshot,
            cache: RwLock::new(BTreeMap::new()),
            opts,
            released: AtomicBool::new(false),
        }
    }

    fn scan_batch_size(&self) -> usize {
        match self.opts.get_int(StoreOption::ScanBatchSize) {
            Some(n) if n > 0 => n as usize,
            _ => DEFAULT_SCAN_BATCH_SIZE,
        }
    }

    fn lookup(&self, key: &Key) -> Option<Result<Value>> {
        match self.cache.read().get(key) {
            Some(CachedEntry::Present(v)) => Some(Ok(v.clone())),
            Some(CachedEntry::Absent) => Some(Err(Error::NotExist(key.clone()))),
            None => None,
        }
    }

    /// Read a single key through the cache
    ///
    /// On a miss, issues one remote read — ranged when
    /// `RangePrefetchOnCacheMiss` is set, single-key otherwise — and caches
    /// the outcome, absence included.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotExist` for an absent key, or the remote failure.
    pub fn get(&self, key: &Key) -> Result<Value> {
        if let Some(cached) = self.lookup(key) {
            trace!(%key, "cache hit");
            return cached;
        }

        if self.opts.is_set(StoreOption::RangePrefetchOnCacheMiss) {
            let limit = self.scan_batch_size();
            debug!(%key, limit, "cache miss, range prefetching");
            // Empty end key = to the end of the keyspace.
            self.range_get(key, &Key::default(), limit)?;
            if let Some(cached) = self.lookup(key) {
                return cached;
            }
            // The ranged read started at `key`, so an uncached key is absent.
            self.cache.write().insert(key.clone(), CachedEntry::Absent);
            return Err(Error::NotExist(key.clone()));
        }

        match self.snapshot.get(key) {
            Ok(value) => {
                self.cache
                    .write()
                    .insert(key.clone(), CachedEntry::Present(value.clone()));
                Ok(value)
            }
            Err(Error::NotExist(_)) => {
                self.cache.write().insert(key.clone(), CachedEntry::Absent);
                Err(Error::NotExist(key.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Read a set of keys, going remote at most once for the uncached ones
    ///
    /// Returns the present keys only; cached absences are neither
    /// re-fetched nor returned. With every key already cached, no remote
    /// call is made at all.
    ///
    /// # Errors
    ///
    /// Returns the remote failure if the batched read fails.
    pub fn batch_get(&self, keys: &[Key]) -> Result<HashMap<Key, Value>> {
        let mut values = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        {
            let cache = self.cache.read();
            for key in keys {
                match cache.get(key) {
                    Some(CachedEntry::Present(v)) => {
                        values.insert(key.clone(), v.clone());
                    }
                    Some(CachedEntry::Absent) => {}
                    None => missing.push(key.clone()),
                }
            }
        }

        if missing.is_empty() {
            trace!(keys = keys.len(), "batch served entirely from cache");
            return Ok(values);
        }

        debug!(keys = keys.len(), remote = missing.len(), "batched remote read");
        let fetched = self.snapshot.batch_get(&missing)?;
        let mut cache = self.cache.write();
        for key in missing {
            match fetched.get(&key) {
                Some(value) => {
                    cache.insert(key.clone(), CachedEntry::Present(value.clone()));
                    values.insert(key, value.clone());
                }
                None => {
                    cache.insert(key, CachedEntry::Absent);
                }
            }
        }
        Ok(values)
    }

    /// Read the range `[start, end)` remotely, caching every returned entry
    ///
    /// An empty `end` key means "to the end of the keyspace"; `limit` of 0
    /// means no cap. Absences cannot be inferred from a capped range, so
    /// only present entries are cached.
    ///
    /// # Errors
    ///
    /// Returns the remote failure if the ranged read fails.
    pub fn range_get(&self, start: &Key, end: &Key, limit: usize) -> Result<HashMap<Key, Value>> {
        debug!(%start, %end, limit, "ranged remote read");
        let fetched = self.snapshot.range_get(start, end, limit)?;
        let mut cache = self.cache.write();
        for (key, value) in &fetched {
            cache.insert(key.clone(), CachedEntry::Present(value.clone()));
        }
        Ok(fetched)
    }

    /// Present cached entries at or after `start`, in ascending key order
    ///
    /// This is the snapshot half of the merged iteration view: remote data
    /// enters it via the prefetch calls, never during iteration itself.
    pub fn cached_range(&self, start: Option<&Key>) -> Vec<(Key, Value)> {
        let lower = match start {
            Some(k) => Bound::Included(k.clone()),
            None => Bound::Unbounded,
        };
        self.cache
            .read()
            .range((lower, Bound::Unbounded))
            .filter_map(|(k, entry)| match entry {
                CachedEntry::Present(v) => Some((k.clone(), v.clone())),
                CachedEntry::Absent => None,
            })
            .collect()
    }

    /// Release the remote snapshot
    ///
    /// Idempotent: only the first call reaches the backend, so the overlay
    /// may be released through any of its handles without double-release.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            debug!("releasing snapshot overlay");
            self.snapshot.release();
        }
    }

    /// Number of cached outcomes (present and absent), for observability
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

// Box<dyn Snapshot> has no Debug; summarize the cache instead.
impl std::fmt::Debug for CacheSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSnapshot")
            .field("cached_len", &self.cached_len())
            .field("released", &self.released.load(Ordering::SeqCst))
            .finish()
    }
}

impl Snapshot for CacheSnapshot {
    fn get(&self, key: &Key) -> Result<Value> {
        CacheSnapshot::get(self, key)
    }

    fn batch_get(&self, keys: &[Key]) -> Result<HashMap<Key, Value>> {
        CacheSnapshot::batch_get(self, keys)
    }

    fn range_get(&self, start: &Key, end: &Key, limit: usize) -> Result<HashMap<Key, Value>> {
        CacheSnapshot::range_get(self, start, end, limit)
    }

    fn release(&self) {
        CacheSnapshot::release(self)
    }
}
