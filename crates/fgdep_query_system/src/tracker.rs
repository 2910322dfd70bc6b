//! Per-file accumulator of outgoing edges, populated by the front end while
//! one source file is being compiled. Everything recorded here is consumed
//! exactly once, either by `SourceFileDepGraph::build` during a normal
//! build or by the verifier on a single-file diagnostic run.

use fgdep_data_structures::fx::FxHashMap;
use fgdep_paths::Identifier;

use crate::dep_key::{Aspect, DependencyKey, NodeKind};

/// The key a use is recorded under: everything about a `DependencyKey`
/// except the `Interface`/`Implementation` split, which every `add_*` call
/// picks explicitly (most dependencies are on a declaration's interface; a
/// handful of call sites care only that a body exists at all).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
struct UseKey {
    kind: NodeKind,
    aspect: Aspect,
    context: Identifier,
    name: Identifier,
}

/// Accumulated during compilation of one source file. Every `add_*` method
/// is idempotent on its key: recording the same dependency twice (e.g. two
/// references to the same member from two expressions) does not duplicate
/// the entry, and the cascade flag is the logical OR over all recordings —
/// cascading dominates, it is never downgraded back to non-cascading.
#[derive(Default)]
pub struct ReferencedNameTracker {
    uses: FxHashMap<UseKey, bool>,
    provides: Vec<Identifier>,
    externals: Vec<Identifier>,
    scope_stack: Vec<Identifier>,
}

impl ReferencedNameTracker {
    pub fn new() -> Self {
        ReferencedNameTracker::default()
    }

    fn record(&mut self, kind: NodeKind, aspect: Aspect, context: Identifier, name: Identifier, cascades: bool) {
        let key = UseKey { kind, aspect, context, name };
        self.uses
            .entry(key)
            .and_modify(|existing| *existing |= cascades)
            .or_insert(cascades);
    }

    pub fn add_top_level_name(&mut self, name: Identifier, cascades: bool) {
        self.record(NodeKind::TopLevel, Aspect::Interface, Identifier::EMPTY, name, cascades);
    }

    pub fn add_used_member(&mut self, context: Identifier, name: Identifier, cascades: bool) {
        self.record(NodeKind::Member, Aspect::Interface, context, name, cascades);
    }

    /// Records a dependency on a nominal type or protocol's own declaration
    /// — e.g. a superclass clause (`class Subclass: Base`) or a conformance
    /// clause (`extension Subclass: BaseProtocol`). Both lower to the same
    /// `NodeKind::Nominal` use; see `DependencyKey::nominal`.
    pub fn add_nominal_dependency(&mut self, name: Identifier, cascades: bool) {
        self.record(NodeKind::Nominal, Aspect::Interface, Identifier::EMPTY, name, cascades);
    }

    pub fn add_potential_member(&mut self, context: Identifier, cascades: bool) {
        self.record(NodeKind::PotentialMember, Aspect::Interface, context, Identifier::EMPTY, cascades);
    }

    pub fn add_dynamic_lookup_name(&mut self, name: Identifier, cascades: bool) {
        self.record(NodeKind::DynamicLookup, Aspect::Interface, Identifier::EMPTY, name, cascades);
    }

    /// Declared at file scope: a name this file itself defines.
    pub fn add_provides(&mut self, name: Identifier) {
        if !self.provides.contains(&name) {
            self.provides.push(name);
        }
    }

    /// Reference to a foreign artifact, tracked for external incremental
    /// dependencies; used only when cross-module incremental tracking is
    /// enabled (`-enable-experimental-cross-module-incremental-build`).
    pub fn add_external_depend(&mut self, path: Identifier) {
        if !self.externals.contains(&path) {
            self.externals.push(path);
        }
    }

    /// Pushes `context` as the current scope for the duration of `f`, so
    /// nested calls to `add_*` that pass `None` attribute to it instead of
    /// threading the enclosing declaration through every call site by hand.
    /// Does not change any `add_*` signature: it is a convenience overload
    /// layered on top of the explicit-context API above.
    pub fn in_scope<R>(&mut self, context: Identifier, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scope_stack.push(context);
        let result = f(self);
        self.scope_stack.pop();
        result
    }

    fn current_scope(&self) -> Identifier {
        self.scope_stack.last().copied().unwrap_or(Identifier::EMPTY)
    }

    /// Like `add_used_member`, but attributes to the innermost scope pushed
    /// by `in_scope` when `context` is `None`.
    pub fn add_used_member_scoped(&mut self, context: Option<Identifier>, name: Identifier, cascades: bool) {
        let context = context.unwrap_or_else(|| self.current_scope());
        self.add_used_member(context, name, cascades);
    }

    pub fn provides(&self) -> &[Identifier] {
        &self.provides
    }

    pub fn externals(&self) -> &[Identifier] {
        &self.externals
    }

    /// Emits `(node_kind, context, name, cascades)` for every recorded use.
    /// `include_intrafile` controls whether uses whose `name` is also in
    /// this file's own `provides` set are emitted: the source-file graph
    /// wants them (a file can depend on its own top-level declarations and
    /// that must still show up as an arc), while some diagnostics-only
    /// consumers filter them out.
    pub fn enumerate_uses(
        &self,
        include_intrafile: bool,
        external_deps: bool,
        mut visitor: impl FnMut(NodeKind, Identifier, Identifier, bool),
    ) {
        let mut entries: Vec<(&UseKey, &bool)> = self.uses.iter().collect();
        // Deterministic emission order regardless of hash-map iteration:
        // sort by the string forms, not by `Identifier`'s intern index.
        entries.sort_by_key(|(key, _)| (key.kind, key.aspect, key.context.as_str(), key.name.as_str()));

        for (key, &cascades) in entries {
            if !include_intrafile && self.provides.contains(&key.name) {
                continue;
            }
            visitor(key.kind, key.context, key.name, cascades);
        }

        if external_deps {
            for &path in &self.externals {
                visitor(NodeKind::ExternalDepend, Identifier::EMPTY, path, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_twice_is_idempotent() {
        let mut t = ReferencedNameTracker::new();
        let name = Identifier::intern("foo_tracker_idempotent_test");
        t.add_top_level_name(name, false);
        t.add_top_level_name(name, false);
        assert_eq!(t.uses.len(), 1);
    }

    #[test]
    fn cascade_flag_is_logical_or() {
        let mut t = ReferencedNameTracker::new();
        let name = Identifier::intern("bar_tracker_cascade_test");
        t.add_top_level_name(name, false);
        t.add_top_level_name(name, true);
        let mut seen = Vec::new();
        t.enumerate_uses(true, false, |kind, ctx, n, cascades| seen.push((kind, ctx, n, cascades)));
        assert_eq!(seen.len(), 1);
        assert!(seen[0].3, "cascading must dominate a later non-cascading recording");
    }

    #[test]
    fn cascade_does_not_downgrade() {
        let mut t = ReferencedNameTracker::new();
        let name = Identifier::intern("baz_tracker_cascade_order_test");
        t.add_top_level_name(name, true);
        t.add_top_level_name(name, false);
        let mut seen = Vec::new();
        t.enumerate_uses(true, false, |_, _, _, cascades| seen.push(cascades));
        assert_eq!(seen, vec![true]);
    }

    #[test]
    fn nominal_dependency_is_recorded_as_its_own_kind() {
        let mut t = ReferencedNameTracker::new();
        let base = Identifier::intern("Base_tracker_nominal_test");
        t.add_nominal_dependency(base, true);
        let mut seen = Vec::new();
        t.enumerate_uses(true, false, |kind, _, name, cascades| seen.push((kind, name, cascades)));
        assert_eq!(seen, vec![(NodeKind::Nominal, base, true)]);
    }

    #[test]
    fn scoped_member_uses_innermost_pushed_context() {
        let mut t = ReferencedNameTracker::new();
        let outer_ctx = Identifier::intern("Outer_tracker_scope_test");
        let member = Identifier::intern("m_tracker_scope_test");
        t.in_scope(outer_ctx, |t| {
            t.add_used_member_scoped(None, member, false);
        });
        let mut seen = Vec::new();
        t.enumerate_uses(true, false, |kind, ctx, name, _| seen.push((kind, ctx, name)));
        assert_eq!(seen, vec![(NodeKind::Member, outer_ctx, member)]);
    }

    #[test]
    fn enumeration_order_is_deterministic_across_insertion_order() {
        let a_name = Identifier::intern("aaa_tracker_order_test");
        let z_name = Identifier::intern("zzz_tracker_order_test");

        let mut forward = ReferencedNameTracker::new();
        forward.add_top_level_name(z_name, false);
        forward.add_top_level_name(a_name, false);

        let mut backward = ReferencedNameTracker::new();
        backward.add_top_level_name(a_name, false);
        backward.add_top_level_name(z_name, false);

        let collect = |t: &ReferencedNameTracker| {
            let mut names = Vec::new();
            t.enumerate_uses(true, false, |_, _, name, _| names.push(name.as_str().to_string()));
            names
        };
        assert_eq!(collect(&forward), collect(&backward));
    }

    #[test]
    fn intrafile_uses_can_be_excluded() {
        let mut t = ReferencedNameTracker::new();
        let own = Identifier::intern("own_tracker_intrafile_test");
        let foreign = Identifier::intern("foreign_tracker_intrafile_test");
        t.add_provides(own);
        t.add_top_level_name(own, false);
        t.add_top_level_name(foreign, false);

        let mut with_intrafile = Vec::new();
        t.enumerate_uses(true, false, |_, _, name, _| with_intrafile.push(name));
        assert_eq!(with_intrafile.len(), 2);

        let mut without_intrafile = Vec::new();
        t.enumerate_uses(false, false, |_, _, name, _| without_intrafile.push(name));
        assert_eq!(without_intrafile, vec![foreign]);
    }

    #[test]
    fn external_depends_are_emitted_only_when_requested() {
        let mut t = ReferencedNameTracker::new();
        t.add_external_depend(Identifier::intern("/path/to/Foreign.swiftmodule"));

        let mut without = 0;
        t.enumerate_uses(true, false, |_, _, _, _| without += 1);
        assert_eq!(without, 0);

        let mut with = 0;
        t.enumerate_uses(true, true, |kind, _, _, _| {
            with += 1;
            assert_eq!(kind, NodeKind::ExternalDepend);
        });
        assert_eq!(with, 1);
    }
}
