//! Hierarchical identity for declarations: module → container → name.
//! Construction is exclusively through the three smart constructors below;
//! there is no public way to build a `StablePath` with an arbitrary
//! `parent_id`, which is what keeps `fingerprint()` a pure function of
//! `(parent_id, kind, extra_hash)` rather than of memory addresses.

use fgdep_data_structures::{StableHash, StableHasher};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PathKind {
    Module,
    Container,
    Name,
    /// Sentinel used only by `StablePath::TOMBSTONE`. Never produced by the
    /// public constructors, never fingerprinted.
    Tombstone,
}

impl StableHash for PathKind {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        (*self as u8).stable_hash(hasher);
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct StablePath {
    parent_id: u64,
    kind: PathKind,
    extra_hash: u64,
}

/// The distinguished tombstone value for hash-table use (e.g. as an
/// `IndexMap` removed-slot marker). Fingerprinting it is a programmer
/// error, not a runtime condition to recover from.
pub const TOMBSTONE: StablePath = StablePath { parent_id: u64::MAX, kind: PathKind::Tombstone, extra_hash: u64::MAX };

fn combine_all(extras: &[&dyn StableHash]) -> u64 {
    let mut hasher = StableHasher::new();
    for extra in extras {
        extra.stable_hash(&mut hasher);
    }
    hasher.finalize()
}

impl StablePath {
    /// The root of a module: `parent_id = 0`, `kind = Module`.
    pub fn root(extras: &[&dyn StableHash]) -> StablePath {
        StablePath { parent_id: 0, kind: PathKind::Module, extra_hash: combine_all(extras) }
    }

    /// A container nested under `parent` (a type, an extension, a
    /// namespace — anything that can itself hold further declarations).
    pub fn container(parent: &StablePath, extras: &[&dyn StableHash]) -> StablePath {
        assert_ne!(parent.kind, PathKind::Tombstone, "cannot nest under the tombstone path");
        StablePath {
            parent_id: parent.fingerprint(),
            kind: PathKind::Container,
            extra_hash: combine_all(extras),
        }
    }

    /// A leaf declaration nested under `parent`. This is the `Name` kind;
    /// an earlier revision of the algorithm this was ported from built
    /// `name()` paths with `kind = Container` by mistake. That is treated
    /// as a bug and not reproduced here.
    pub fn name(parent: &StablePath, extras: &[&dyn StableHash]) -> StablePath {
        assert_ne!(parent.kind, PathKind::Tombstone, "cannot nest under the tombstone path");
        StablePath { parent_id: parent.fingerprint(), kind: PathKind::Name, extra_hash: combine_all(extras) }
    }

    pub fn is_tombstone(&self) -> bool {
        self.kind == PathKind::Tombstone
    }

    /// Rehashes `(parent_id, kind, extra_hash)` into the path's `ID`. Pure:
    /// no dependence on allocator addresses, declaration order elsewhere in
    /// the file, or anything else outside these three fields.
    pub fn fingerprint(&self) -> u64 {
        debug_assert!(!self.is_tombstone(), "the tombstone StablePath must not be fingerprinted");
        let mut hasher = StableHasher::new();
        self.parent_id.stable_hash(&mut hasher);
        self.kind.stable_hash(&mut hasher);
        self.extra_hash.stable_hash(&mut hasher);
        hasher.finalize()
    }
}
