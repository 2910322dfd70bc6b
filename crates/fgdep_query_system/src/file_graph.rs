//! The source-file dependency graph: the artifact one successful compile of
//! a single file produces. Immutable once built; the only way to mutate a
//! file's contribution to the module graph is to build a fresh one and
//! `integrate` it.

use fgdep_data_structures::fx::FxHashMap;
use fgdep_index::IndexVec;
use fgdep_paths::Identifier;

use crate::dep_key::{Aspect, DependencyKey, NodeKind};
use crate::node::{Arc, Node, NodeIndex};
use crate::tracker::ReferencedNameTracker;

/// A foreign artifact this file referenced, plus the interface hash of that
/// artifact as observed when this file was compiled. `None` means the file
/// has never seen that external before — used by `invalidated_by_external`
/// to distinguish "changed since we last saw it" from "never seen."
#[derive(Clone, Debug)]
pub struct ExternalRecord {
    pub path: Identifier,
    pub observed_interface_hash: Option<u64>,
}

/// A set of nodes and arcs owned by one compile unit. By construction,
/// every arc's `user` is the `NodeIndex` of this same file's
/// `SourceFileProvide` node (the only provides node every arc is ever
/// attributed to) — propagation only needs file-level granularity, since
/// `find_dependents` adds the *owning file* of a use, not a specific
/// declaration within it.
#[derive(Clone, Debug)]
pub struct SourceFileDepGraph {
    file: Identifier,
    nodes: IndexVec<NodeIndex, Node>,
    arcs: Vec<Arc>,
    source_file_provide: NodeIndex,
    externals: Vec<ExternalRecord>,
}

impl SourceFileDepGraph {
    pub fn file(&self) -> Identifier {
        self.file
    }

    pub fn nodes(&self) -> &IndexVec<NodeIndex, Node> {
        &self.nodes
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn externals(&self) -> &[ExternalRecord] {
        &self.externals
    }

    pub fn source_file_provide_node(&self) -> NodeIndex {
        self.source_file_provide
    }

    /// The file's interface hash: the fingerprint carried by its
    /// distinguished `SourceFileProvide` node. This is the invalidation key
    /// downstream modules key off of.
    pub fn interface_hash(&self) -> u64 {
        self.nodes[self.source_file_provide]
            .fingerprint
            .expect("SourceFileDepGraph always fingerprints its own provide node")
    }

    /// Every key this file declares, including its own `SourceFileProvide`
    /// node. Used by `ModuleDepGraph::integrate` to diff this revision
    /// against the prior one.
    pub fn provides_keys(&self) -> impl Iterator<Item = DependencyKey> + '_ {
        self.nodes.iter().filter(|n| n.provides).map(|n| n.key)
    }

    /// Reconstructs a graph from its decoded parts. Used by the artifact
    /// codec when reading a graph back off disk; other callers should
    /// prefer `SourceFileDepGraphBuilder`.
    pub fn from_parts(
        file: Identifier,
        nodes: IndexVec<NodeIndex, Node>,
        arcs: Vec<Arc>,
        source_file_provide: NodeIndex,
        externals: Vec<ExternalRecord>,
    ) -> Self {
        SourceFileDepGraph { file, nodes, arcs, source_file_provide, externals }
    }
}

/// Builds one `SourceFileDepGraph`. The semantic analyzer registers each
/// definition it emits via `add_definition`; once compilation of the file is
/// complete, `build` folds in the tracker's recorded uses to produce the
/// arcs.
pub struct SourceFileDepGraphBuilder {
    file: Identifier,
    nodes: IndexVec<NodeIndex, Node>,
}

impl SourceFileDepGraphBuilder {
    pub fn new(file: Identifier) -> Self {
        SourceFileDepGraphBuilder { file, nodes: IndexVec::new() }
    }

    /// Registers a definition this file provides (a top-level declaration, a
    /// nominal type, a protocol, a member). `fingerprint` is `Some` only for
    /// definitions that carry a self-stable body hash.
    pub fn add_definition(&mut self, key: DependencyKey, fingerprint: Option<u64>) -> NodeIndex {
        self.nodes.push(Node::provided(key, fingerprint))
    }

    /// Finalizes the graph. `interface_hash` is the hash of this file's
    /// public API surface; `external_interface_hashes` supplies the
    /// interface hash this compile observed for each external artifact the
    /// tracker recorded a reference to, so the resulting `ExternalRecord`s
    /// can be compared against what the module graph already knows for the
    /// externally-invalidated classification.
    pub fn build(
        mut self,
        tracker: &ReferencedNameTracker,
        interface_hash: u64,
        external_interface_hashes: &FxHashMap<Identifier, u64>,
    ) -> SourceFileDepGraph {
        let source_file_provide =
            self.nodes.push(Node::provided(DependencyKey::source_file_provide(self.file), Some(interface_hash)));

        let mut arcs = Vec::new();
        tracker.enumerate_uses(true, false, |kind, context, name, cascades| {
            let def = match kind {
                NodeKind::TopLevel => DependencyKey::top_level(name, Aspect::Interface),
                NodeKind::Nominal => DependencyKey::nominal(name, Aspect::Interface),
                NodeKind::Member => DependencyKey::member(context, name, Aspect::Interface),
                NodeKind::PotentialMember => DependencyKey::potential_member(context, Aspect::Interface),
                NodeKind::DynamicLookup => DependencyKey::dynamic_lookup(name, Aspect::Interface),
                NodeKind::ExternalDepend | NodeKind::SourceFileProvide => {
                    unreachable!("enumerate_uses never emits {:?} without external_deps", kind)
                }
            };
            arcs.push(Arc { user: source_file_provide, def, cascades });
        });

        let externals = tracker
            .externals()
            .iter()
            .map(|&path| ExternalRecord {
                path,
                observed_interface_hash: external_interface_hashes.get(&path).copied(),
            })
            .collect();

        SourceFileDepGraph { file: self.file, nodes: self.nodes, arcs, source_file_provide, externals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_hash_round_trips_through_source_file_provide() {
        let file = Identifier::intern("file_graph_interface_hash_test.swift");
        let builder = SourceFileDepGraphBuilder::new(file);
        let tracker = ReferencedNameTracker::new();
        let graph = builder.build(&tracker, 0xdead_beef, &FxHashMap::default());
        assert_eq!(graph.interface_hash(), 0xdead_beef);
    }

    #[test]
    fn every_arc_is_attributed_to_the_source_file_provide_node() {
        let file = Identifier::intern("file_graph_arc_attribution_test.swift");
        let mut builder = SourceFileDepGraphBuilder::new(file);
        builder.add_definition(
            DependencyKey::top_level(Identifier::intern("foo_file_graph_test"), Aspect::Interface),
            Some(1),
        );
        let mut tracker = ReferencedNameTracker::new();
        tracker.add_top_level_name(Identifier::intern("bar_file_graph_test"), false);
        tracker.add_used_member(
            Identifier::intern("Widget_file_graph_test"),
            Identifier::intern("m_file_graph_test"),
            true,
        );
        let graph = builder.build(&tracker, 7, &FxHashMap::default());

        assert_eq!(graph.arcs().len(), 2);
        for arc in graph.arcs() {
            assert_eq!(arc.user, graph.source_file_provide_node());
        }
    }

    #[test]
    fn nominal_uses_become_nominal_arcs() {
        let file = Identifier::intern("file_graph_nominal_test.swift");
        let builder = SourceFileDepGraphBuilder::new(file);
        let mut tracker = ReferencedNameTracker::new();
        let base = Identifier::intern("Base_file_graph_nominal_test");
        tracker.add_nominal_dependency(base, true);
        let graph = builder.build(&tracker, 1, &FxHashMap::default());

        assert_eq!(graph.arcs().len(), 1);
        assert_eq!(graph.arcs()[0].def, DependencyKey::nominal(base, Aspect::Interface));
        assert!(graph.arcs()[0].cascades);
    }

    #[test]
    fn provides_keys_include_definitions_and_source_file_provide() {
        let file = Identifier::intern("file_graph_provides_test.swift");
        let mut builder = SourceFileDepGraphBuilder::new(file);
        let foo = DependencyKey::top_level(Identifier::intern("foo_file_graph_provides_test"), Aspect::Interface);
        builder.add_definition(foo, Some(1));
        let tracker = ReferencedNameTracker::new();
        let graph = builder.build(&tracker, 9, &FxHashMap::default());

        let keys: Vec<_> = graph.provides_keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&foo));
        assert!(keys.contains(&DependencyKey::source_file_provide(file)));
    }

    #[test]
    fn external_records_carry_observed_hash_when_known() {
        let file = Identifier::intern("file_graph_external_test.swift");
        let builder = SourceFileDepGraphBuilder::new(file);
        let mut tracker = ReferencedNameTracker::new();
        let other = Identifier::intern("/path/Other.swiftmodule");
        tracker.add_external_depend(other);

        let mut known = FxHashMap::default();
        known.insert(other, 42u64);
        let graph = builder.build(&tracker, 1, &known);

        assert_eq!(graph.externals().len(), 1);
        assert_eq!(graph.externals()[0].path, other);
        assert_eq!(graph.externals()[0].observed_interface_hash, Some(42));
    }
}
