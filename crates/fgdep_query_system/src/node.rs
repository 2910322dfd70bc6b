use fgdep_index::newtype_index;
use fgdep_paths::Identifier;

use crate::dep_key::DependencyKey;

newtype_index! {
    /// Index into a single `SourceFileDepGraph`'s node arena.
    pub struct NodeIndex {}
}

/// `provides = true` nodes are definitions emitted by the owning source
/// file; `provides = false` nodes are uses. `fingerprint` is present only
/// for definition nodes that carry a self-stable body hash (protocols,
/// nominal types, the file's own `SourceFileProvide` node).
#[derive(Clone, Debug)]
pub struct Node {
    pub key: DependencyKey,
    pub fingerprint: Option<u64>,
    pub provides: bool,
    pub artifact_path: Option<Identifier>,
}

impl Node {
    pub fn provided(key: DependencyKey, fingerprint: Option<u64>) -> Self {
        Node { key, fingerprint, provides: true, artifact_path: None }
    }
}

/// Directed edge `user → def`. `user` is always a `provides` node of the
/// owning `SourceFileDepGraph`; `def` names whatever is depended upon and
/// may resolve inside the same file or in a different one — that
/// resolution happens one layer up, in the module graph's key index.
#[derive(Clone, Debug)]
pub struct Arc {
    pub user: NodeIndex,
    pub def: DependencyKey,
    pub cascades: bool,
}
