//! Deterministic hashing and small hash-map aliases shared by the whole
//! incremental-build core. Nothing in this crate may depend on pointer
//! identity, allocator layout, or thread-local state.

pub mod fx;
pub mod stable_hasher;

pub use stable_hasher::{StableHash, StableHasher};
