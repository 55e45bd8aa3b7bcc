//! Bounded pool of reusable buffer instances
//!
//! Amortizes allocation cost across transactions: a released buffer keeps
//! its tree nodes warm for the next transaction instead of being torn down
//! and rebuilt. Unlike the collection types the pool would recycle in a
//! flat-map design, `BTreeMap` has no `capacity` to preserve — the win here
//! is skipping allocator churn for short-lived transactions, which acquire
//! and release in quick succession.
//!
//! One pool is shared by all transactions in the process, so acquire and
//! release must be safe under concurrent calls. The idle list sits behind a
//! `parking_lot::Mutex`; the counters are atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::trace;

use crate::memdb::MemDbBuffer;

/// Default number of idle instances the process-wide pool retains
pub const DEFAULT_POOL_CAPACITY: usize = 100;

static GLOBAL_POOL: Lazy<Arc<BufferPool>> =
    Lazy::new(|| Arc::new(BufferPool::new(DEFAULT_POOL_CAPACITY)));

/// Snapshot of pool activity counters
///
/// `created + reused` equals the number of acquires;
/// `returned + discarded` equals the number of releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCounters {
    /// Instances constructed fresh because the idle list was empty
    pub created: u64,
    /// Instances handed out from the idle list
    pub reused: u64,
    /// Released instances re-admitted to the idle list
    pub returned: u64,
    /// Released instances dropped because the idle list was full
    pub discarded: u64,
}

/// Bounded cache of reusable [`MemDbBuffer`] instances
///
/// Construct one explicitly and share it via `Arc`, or use
/// [`BufferPool::global`] for the documented process-lifetime singleton.
/// Beyond `capacity` idle instances, released buffers are simply dropped.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<MemDbBuffer>>,
    capacity: usize,
    created: AtomicU64,
    reused: AtomicU64,
    returned: AtomicU64,
    discarded: AtomicU64,
}

impl BufferPool {
    /// Create a pool that retains up to `capacity` idle instances
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity.min(16))),
            capacity,
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// The process-lifetime shared pool
    ///
    /// Initialized on first use with [`DEFAULT_POOL_CAPACITY`]; lives until
    /// process exit. There is no teardown — idle buffers are plain memory.
    /// Tests should construct their own pools instead of relying on this
    /// one, to avoid cross-test coupling.
    pub fn global() -> Arc<BufferPool> {
        Arc::clone(&GLOBAL_POOL)
    }

    /// Acquire a buffer instance
    ///
    /// Returns a recycled instance if one is idle, otherwise constructs a
    /// fresh one. Either way the instance is empty: fresh instances start
    /// empty and recycled instances were cleared on release.
    pub fn acquire(&self) -> MemDbBuffer {
        let recycled = self.idle.lock().pop();
        match recycled {
            Some(buf) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                debug_assert!(buf.is_empty());
                buf
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                MemDbBuffer::new()
            }
        }
    }

    /// Return a buffer instance to the pool
    ///
    /// The instance is cleared and re-admitted if the idle list is under
    /// capacity; otherwise it is dropped.
    pub fn release(&self, mut buf: MemDbBuffer) {
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(buf);
            self.returned.fetch_add(1, Ordering::Relaxed);
        } else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            trace!(capacity = self.capacity, "pool full, discarding buffer");
        }
    }

    /// Number of idle instances currently retained
    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }

    /// Maximum number of idle instances retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot the activity counters
    pub fn counters(&self) -> PoolCounters {
        PoolCounters {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
