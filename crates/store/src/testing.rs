//! Test collaborators for the store layer
//!
//! `MockSnapshot` stands in for the remote backend in unit tests,
//! integration tests, and benches: a seedable in-memory map with per-method
//! call counters, so tests can assert not just on results but on how many
//! round-trips an operation cost.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use unionkv_core::{Error, Key, Result, Snapshot, Value};

#[derive(Debug, Default)]
struct MockInner {
    data: Mutex<BTreeMap<Key, Value>>,
    get_calls: AtomicUsize,
    batch_get_calls: AtomicUsize,
    range_get_calls: AtomicUsize,
    release_calls: AtomicUsize,
    last_batch: Mutex<Vec<Key>>,
    fail_next: Mutex<Option<String>>,
}

/// Counting in-memory [`Snapshot`] for tests and benches
///
/// Cloning yields another handle to the same state, so a test can keep a
/// handle for assertions after boxing one into the store under test.
#[derive(Debug, Clone, Default)]
pub struct MockSnapshot(Arc<MockInner>);

impl MockSnapshot {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock seeded with the given pairs
    pub fn with_pairs(pairs: &[(&str, &[u8])]) -> Self {
        let mock = Self::new();
        for (k, v) in pairs {
            mock.put(Key::from(*k), v.to_vec());
        }
        mock
    }

    /// Seed or overwrite a backend value
    pub fn put(&self, key: Key, value: Value) {
        self.0.data.lock().insert(key, value);
    }

    /// Remove a backend value
    pub fn remove(&self, key: &Key) {
        self.0.data.lock().remove(key);
    }

    /// Make the next remote call fail with an I/O error
    pub fn fail_next(&self, message: &str) {
        *self.0.fail_next.lock() = Some(message.to_string());
    }

    fn check_failure(&self) -> Result<()> {
        if let Some(message) = self.0.fail_next.lock().take() {
            return Err(Error::Io(io::Error::new(io::ErrorKind::Other, message)));
        }
        Ok(())
    }

    /// Number of single-key reads issued
    pub fn get_calls(&self) -> usize {
        self.0.get_calls.load(Ordering::SeqCst)
    }

    /// Number of batched reads issued
    pub fn batch_get_calls(&self) -> usize {
        self.0.batch_get_calls.load(Ordering::SeqCst)
    }

    /// Number of ranged reads issued
    pub fn range_get_calls(&self) -> usize {
        self.0.range_get_calls.load(Ordering::SeqCst)
    }

    /// Total remote reads of any kind
    pub fn remote_reads(&self) -> usize {
        self.get_calls() + self.batch_get_calls() + self.range_get_calls()
    }

    /// Number of release calls received
    pub fn release_calls(&self) -> usize {
        self.0.release_calls.load(Ordering::SeqCst)
    }

    /// The key set of the most recent batched read, sorted
    pub fn last_batch_keys(&self) -> Vec<Key> {
        let mut keys = self.0.last_batch.lock().clone();
        keys.sort();
        keys
    }
}

impl Snapshot for MockSnapshot {
    fn get(&self, key: &Key) -> Result<Value> {
        self.check_failure()?;
        self.0.get_calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .data
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotExist(key.clone()))
    }

    fn batch_get(&self, keys: &[Key]) -> Result<HashMap<Key, Value>> {
        self.check_failure()?;
        self.0.batch_get_calls.fetch_add(1, Ordering::SeqCst);
        *self.0.last_batch.lock() = keys.to_vec();
        let data = self.0.data.lock();
        Ok(keys
            .iter()
            .filter_map(|k| data.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    fn range_get(&self, start: &Key, end: &Key, limit: usize) -> Result<HashMap<Key, Value>> {
        self.check_failure()?;
        self.0.range_get_calls.fetch_add(1, Ordering::SeqCst);
        let data = self.0.data.lock();
        // Empty end key = to the end of the keyspace.
        let iter: Box<dyn Iterator<Item = (&Key, &Value)>> = if end.is_empty() {
            Box::new(data.range(start.clone()..))
        } else {
            Box::new(data.range(start.clone()..end.clone()))
        };
        let iter = iter.map(|(k, v)| (k.clone(), v.clone()));
        Ok(if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        })
    }

    fn release(&self) {
        self.0.release_calls.fetch_add(1, Ordering::SeqCst);
    }
}
