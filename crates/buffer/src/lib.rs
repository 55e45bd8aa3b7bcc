//! Buffer layer for UnionKV
//!
//! This crate implements the in-memory buffering pieces of the overlay:
//! - MemDbBuffer: ordered in-memory key-value buffer
//! - BufferPool: bounded allocator of reusable buffer instances
//! - LazyConditionBuffer: pool-backed recorder of condition pairs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lazy;
pub mod memdb;
pub mod pool;

pub use lazy::LazyConditionBuffer;
pub use memdb::MemDbBuffer;
pub use pool::{BufferPool, PoolCounters, DEFAULT_POOL_CAPACITY};
