//! Per-transaction store options
//!
//! Options carry behavioral flags from the transaction owner to the
//! snapshot and buffer layers. The union store owns the map and mutates it
//! through [`SharedOptions`]; the snapshot overlay holds a second handle to
//! the same map and consults it on every read. Interpretation of a value is
//! entirely the consumer's responsibility.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Behavioral switch names for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreOption {
    /// Skip the remote existence probe on reads of unbuffered keys.
    ///
    /// Instead of asking the snapshot whether the key exists, the union
    /// store records a must-not-exist lazy condition and reports the key as
    /// absent. The condition is verified in the batched check before
    /// commit.
    PresumeKeyNotExists,

    /// On a point-read cache miss, warm a whole range starting at the
    /// missed key instead of fetching a single value.
    RangePrefetchOnCacheMiss,

    /// Number of entries per ranged read issued by the snapshot overlay.
    ScanBatchSize,
}

/// Value associated with a [`StoreOption`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Presence-only marker; downstream consumers use their default
    /// behavior for any payload the option would otherwise carry.
    Flag,
    /// Integer payload (sizes, limits)
    Int(i64),
    /// Raw bytes payload
    Bytes(Vec<u8>),
}

/// A set of per-transaction options
///
/// Last write wins on the same option; entries are individually removable.
/// No ordering semantics. Not safe for concurrent mutation on its own —
/// wrap in [`SharedOptions`] to share between layers.
#[derive(Debug, Clone, Default)]
pub struct Options(HashMap<StoreOption, OptionValue>);

impl Options {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an option value, if present
    pub fn get(&self, opt: StoreOption) -> Option<&OptionValue> {
        self.0.get(&opt)
    }

    /// Set an option value (overwrites any previous value)
    pub fn set(&mut self, opt: StoreOption, value: OptionValue) {
        self.0.insert(opt, value);
    }

    /// Remove an option
    pub fn del(&mut self, opt: StoreOption) {
        self.0.remove(&opt);
    }

    /// Check whether an option is present, regardless of its value
    pub fn is_set(&self, opt: StoreOption) -> bool {
        self.0.contains_key(&opt)
    }

    /// Get an option's integer payload, if present and integer-typed
    pub fn get_int(&self, opt: StoreOption) -> Option<i64> {
        match self.0.get(&opt) {
            Some(OptionValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Shared handle to one option map
///
/// The union store and the snapshot overlay hold clones of the same handle,
/// so `set_option` calls are immediately visible to the overlay's read
/// path. The lock is not a concurrency feature: the store is single-owner
/// by contract, the lock only lets one owner hold two handles.
#[derive(Debug, Clone, Default)]
pub struct SharedOptions(Arc<RwLock<Options>>);

impl SharedOptions {
    /// Create a new, empty shared option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option value
    pub fn set(&self, opt: StoreOption, value: OptionValue) {
        self.0.write().set(opt, value);
    }

    /// Remove an option
    pub fn del(&self, opt: StoreOption) {
        self.0.write().del(opt);
    }

    /// Check whether an option is present
    pub fn is_set(&self, opt: StoreOption) -> bool {
        self.0.read().is_set(opt)
    }

    /// Get an option's integer payload
    pub fn get_int(&self, opt: StoreOption) -> Option<i64> {
        self.0.read().get_int(opt)
    }

    /// Get a clone of an option value, if present
    pub fn get(&self, opt: StoreOption) -> Option<OptionValue> {
        self.0.read().get(opt).cloned()
    }
}
