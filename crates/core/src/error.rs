//! Error types for UnionKV
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! The taxonomy mirrors the validation protocol: a read miss (`NotExist`)
//! is routine and many callers treat it as "no prior value"; `KeyExists`
//! and `ConditionMismatch` are lazy-check violations that mean "this
//! transaction cannot commit"; `Upstream` carries a failure from the
//! remote snapshot annotated with the operation that issued it.

use crate::types::{Key, Value};
use std::io;
use thiserror::Error;

/// Result type alias for UnionKV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the UnionKV overlay
#[derive(Debug, Error)]
pub enum Error {
    /// Key not found (read miss through a buffer or the snapshot)
    #[error("key not found: {0}")]
    NotExist(Key),

    /// A must-not-exist condition found the key present in storage
    #[error("key already exists: {0}")]
    KeyExists(Key),

    /// A recorded condition value no longer matches the stored value
    #[error("lazy condition mismatch for key {key}: expected {expected:?}, found {actual:?}")]
    ConditionMismatch {
        /// Key the condition was recorded for
        key: Key,
        /// Value the condition expected
        expected: Value,
        /// Value found in storage (None = key absent)
        actual: Option<Value>,
    },

    /// Attempted to set a zero-length value through the store surface
    ///
    /// Empty values are reserved as sentinels (tombstone / assert-absence),
    /// so they cannot be stored as real values.
    #[error("cannot set an empty value for key {0}")]
    EmptyValue(Key),

    /// I/O error from a snapshot backend
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure from the remote snapshot, annotated with call-site context
    #[error("{op} failed against the snapshot")]
    Upstream {
        /// The operation that issued the remote call
        op: &'static str,
        /// The underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl Error {
    /// Wrap an error with the name of the operation that produced it
    pub fn upstream(op: &'static str, source: Error) -> Self {
        Error::Upstream {
            op,
            source: Box::new(source),
        }
    }

    /// Check if this is a read miss
    pub fn is_not_exist(&self) -> bool {
        matches!(self, Error::NotExist(_))
    }

    /// Check if this is a lazy-check violation (either kind)
    ///
    /// A violation means the transaction is non-committable; the caller is
    /// expected to abort or retry from a fresh snapshot.
    pub fn is_condition_violation(&self) -> bool {
        matches!(self, Error::KeyExists(_) | Error::ConditionMismatch { .. })
    }
}
