//! An interned, immutable byte string. Two identifiers compare by identity
//! (a `u32` index), never by re-comparing their bytes, mirroring the
//! teacher's own `Symbol` interning in `rustc_span`.

use fgdep_data_structures::fx::FxHashMap;
use fgdep_data_structures::{StableHash, StableHasher};
use parking_lot::Mutex;
use std::sync::OnceLock;

/// An interned string. `Identifier::EMPTY` is the distinguished empty
/// string, always index 0.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(u32);

impl Identifier {
    pub const EMPTY: Identifier = Identifier(0);

    pub fn intern(text: &str) -> Identifier {
        global().lock().intern(text)
    }

    pub fn as_str(self) -> &'static str {
        global().lock().resolve(self)
    }

    pub fn is_empty(self) -> bool {
        self == Identifier::EMPTY
    }
}

impl std::fmt::Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StableHash for Identifier {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        self.as_str().stable_hash(hasher);
    }
}

struct Interner {
    strings: Vec<&'static str>,
    map: FxHashMap<&'static str, Identifier>,
}

impl Interner {
    fn new() -> Self {
        let mut map = FxHashMap::default();
        map.insert("", Identifier::EMPTY);
        Interner { strings: vec![""], map }
    }

    fn intern(&mut self, text: &str) -> Identifier {
        if let Some(&id) = self.map.get(text) {
            return id;
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let id = Identifier(self.strings.len() as u32);
        self.strings.push(leaked);
        self.map.insert(leaked, id);
        id
    }

    fn resolve(&self, id: Identifier) -> &'static str {
        self.strings[id.0 as usize]
    }
}

fn global() -> &'static Mutex<Interner> {
    static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();
    INTERNER.get_or_init(|| Mutex::new(Interner::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_identifier_zero() {
        assert_eq!(Identifier::intern(""), Identifier::EMPTY);
        assert_eq!(Identifier::EMPTY.as_str(), "");
    }

    #[test]
    fn interning_is_idempotent() {
        let a = Identifier::intern("widget");
        let b = Identifier::intern("widget");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "widget");
    }

    #[test]
    fn distinct_strings_get_distinct_identities() {
        let a = Identifier::intern("foo");
        let b = Identifier::intern("bar");
        assert_ne!(a, b);
    }
}
