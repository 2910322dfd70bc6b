//! Fast, non-cryptographic hash map/set aliases for in-memory indices.
//!
//! These are never used for anything that crosses a process boundary (that
//! is what `stable_hasher` is for) — only for the driver's in-memory lookup
//! tables, where most call sites don't care about order, and the ones that
//! do (deterministic artifact encoding) use `FxIndexMap`/`FxIndexSet`
//! and sort or rely on insertion order explicitly.

pub type FxHashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub type FxHashSet<V> = std::collections::HashSet<V, rustc_hash::FxBuildHasher>;
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, rustc_hash::FxBuildHasher>;
pub type FxIndexSet<V> = indexmap::IndexSet<V, rustc_hash::FxBuildHasher>;
