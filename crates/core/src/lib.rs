//! Core types and traits for UnionKV
//!
//! This crate defines the foundational pieces used throughout the system:
//! - Key, Value: opaque byte-sequence types
//! - Error, Result: the error hierarchy
//! - Snapshot, MemBuffer: the trait seams
//! - StoreOption, Options, SharedOptions: per-transaction behavior flags

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod options;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use options::{OptionValue, Options, SharedOptions, StoreOption};
pub use traits::{MemBuffer, Snapshot};
pub use types::{Key, Value};
