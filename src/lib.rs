//! UnionKV - client-side transactional overlay for key-value storage
//!
//! UnionKV merges an immutable point-in-time snapshot of a remote
//! key-value store with a transaction-local write buffer into one mutable
//! view, and validates recorded read-modify-write conditions in a single
//! batched round-trip just before commit.
//!
//! # Quick Start
//!
//! ```
//! use unionkv::testing::MockSnapshot;
//! use unionkv::{Key, UnionStore};
//!
//! let backend = MockSnapshot::with_pairs(&[("user:1", b"alice")]);
//! let mut txn = UnionStore::new(Box::new(backend));
//!
//! // Reads merge the snapshot with local writes.
//! txn.set(Key::from("user:2"), b"bob".to_vec())?;
//! assert_eq!(txn.get(&Key::from("user:1"))?, b"alice".to_vec());
//!
//! // Record a uniqueness condition and validate it before commit.
//! txn.record_condition(Key::from("user:2"), Vec::new());
//! txn.check_lazy_condition_pairs()?;
//!
//! txn.release();
//! # Ok::<(), unionkv::Error>(())
//! ```
//!
//! # Architecture
//!
//! The overlay composes four pieces: a caching snapshot wrapper
//! ([`CacheSnapshot`]), a read-your-own-writes store ([`BufferStore`]), a
//! pool-backed condition recorder ([`LazyConditionBuffer`]), and the
//! transaction-facing [`UnionStore`] that coordinates them.

pub use unionkv_buffer::{BufferPool, LazyConditionBuffer, MemDbBuffer, PoolCounters};
pub use unionkv_core::{
    Error, Key, MemBuffer, OptionValue, Options, Result, SharedOptions, Snapshot, StoreOption,
    Value,
};
pub use unionkv_store::{BufferStore, CacheSnapshot, UnionIter, UnionStore};

/// Test collaborators (counting mock snapshot)
pub mod testing {
    pub use unionkv_store::testing::MockSnapshot;
}
