//! The fine-grained dependency key space: `(node_kind, aspect, context,
//! name)`, mirroring `rustc_middle::dep_graph::DepNode`'s `(kind, fingerprint)`
//! pair but kept in un-hashed form so the module graph can index by key.

use fgdep_data_structures::{StableHash, StableHasher};
use fgdep_paths::Identifier;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[repr(u8)]
pub enum NodeKind {
    TopLevel,
    Nominal,
    PotentialMember,
    Member,
    DynamicLookup,
    ExternalDepend,
    SourceFileProvide,
}

impl StableHash for NodeKind {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        (*self as u8).stable_hash(hasher);
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[repr(u8)]
pub enum Aspect {
    Interface,
    Implementation,
}

impl StableHash for Aspect {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        (*self as u8).stable_hash(hasher);
    }
}

/// `Member(T, m)` means "member `m` of type `T`"; `PotentialMember(T, "")`
/// means "any member of `T` that a dependent may acquire"; `TopLevel("", n)`
/// means "top-level name `n`". `context`/`name` may each be empty.
///
/// `Ord` compares by the interned *strings*, not by `Identifier`'s intern
/// index, so that two processes that intern names in different orders still
/// agree on the same deterministic key order when writing an artifact.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct DependencyKey {
    pub kind: NodeKind,
    pub aspect: Aspect,
    pub context: Identifier,
    pub name: Identifier,
}

impl DependencyKey {
    pub fn new(kind: NodeKind, aspect: Aspect, context: Identifier, name: Identifier) -> Self {
        DependencyKey { kind, aspect, context, name }
    }

    pub fn top_level(name: Identifier, aspect: Aspect) -> Self {
        DependencyKey::new(NodeKind::TopLevel, aspect, Identifier::EMPTY, name)
    }

    /// A dependency on a nominal type or protocol's own existence and
    /// identity — a superclass clause or a protocol conformance clause both
    /// lower to this kind. The verifier tells them apart only for
    /// diagnostic wording, not for matching.
    pub fn nominal(name: Identifier, aspect: Aspect) -> Self {
        DependencyKey::new(NodeKind::Nominal, aspect, Identifier::EMPTY, name)
    }

    pub fn member(context: Identifier, name: Identifier, aspect: Aspect) -> Self {
        DependencyKey::new(NodeKind::Member, aspect, context, name)
    }

    pub fn potential_member(context: Identifier, aspect: Aspect) -> Self {
        DependencyKey::new(NodeKind::PotentialMember, aspect, context, Identifier::EMPTY)
    }

    pub fn dynamic_lookup(name: Identifier, aspect: Aspect) -> Self {
        DependencyKey::new(NodeKind::DynamicLookup, aspect, Identifier::EMPTY, name)
    }

    pub fn external_depend(path: Identifier) -> Self {
        DependencyKey::new(NodeKind::ExternalDepend, Aspect::Interface, Identifier::EMPTY, path)
    }

    pub fn source_file_provide(file: Identifier) -> Self {
        DependencyKey::new(NodeKind::SourceFileProvide, Aspect::Interface, Identifier::EMPTY, file)
    }
}

impl PartialOrd for DependencyKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.kind, self.aspect, self.context.as_str(), self.name.as_str()).cmp(&(
            other.kind,
            other.aspect,
            other.context.as_str(),
            other.name.as_str(),
        ))
    }
}

impl StableHash for DependencyKey {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        self.kind.stable_hash(hasher);
        self.aspect.stable_hash(hasher);
        self.context.stable_hash(hasher);
        self.name.stable_hash(hasher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_string_based_not_intern_index() {
        let zebra = Identifier::intern("zebra_dep_key_order_test");
        let apple = Identifier::intern("apple_dep_key_order_test");
        // zebra interned first, so its intern index is lower, but "apple" < "zebra"
        // lexicographically; Ord must follow the string, not the index.
        let a = DependencyKey::top_level(apple, Aspect::Interface);
        let z = DependencyKey::top_level(zebra, Aspect::Interface);
        assert!(a < z);
    }

    #[test]
    fn same_fields_same_fingerprint() {
        let n = Identifier::intern("Widget");
        let a = DependencyKey::top_level(n, Aspect::Interface);
        let b = DependencyKey::top_level(n, Aspect::Interface);
        let mut ha = StableHasher::new();
        a.stable_hash(&mut ha);
        let mut hb = StableHasher::new();
        b.stable_hash(&mut hb);
        assert_eq!(ha.finalize(), hb.finalize());
    }
}
