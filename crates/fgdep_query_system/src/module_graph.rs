//! The module dependency graph: the disjoint union of every source file's
//! graph, plus the indices the propagation algorithm needs to answer "who
//! must rebuild?" without rescanning every file on each query.
//!
//! Owned exclusively by the driver thread: worker jobs only ever produce a
//! `SourceFileDepGraph` and hand it back over a channel, so `integrate`
//! never needs a lock.

use fgdep_data_structures::fx::{FxHashMap, FxHashSet};
use fgdep_paths::Identifier;

use crate::dep_key::DependencyKey;
use crate::file_graph::SourceFileDepGraph;

/// Per-file lifecycle: `UpToDate → Queued (initial) → Compiling →
/// {Success, Failure}`. On `Success`, `integrate` runs and
/// dependents may re-enter `Queued`; on `Failure`, the file stays dirty and
/// no integration occurs.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CompileStatus {
    UpToDate,
    Queued,
    Compiling,
    Success,
    Failure,
}

struct FileRecord {
    status: CompileStatus,
    artifact_path: Option<Identifier>,
    graph: Option<SourceFileDepGraph>,
}

impl FileRecord {
    fn new() -> Self {
        FileRecord { status: CompileStatus::UpToDate, artifact_path: None, graph: None }
    }
}

#[derive(Default)]
struct KeyEntry {
    /// The files whose own `provides_keys()` currently include this key —
    /// an index from dependency key to node-set.
    providers: FxHashSet<Identifier>,
    /// `(user_file, cascades)` for every arc anywhere in the graph whose
    /// `def` is this key.
    users: Vec<(Identifier, bool)>,
}

pub struct ModuleDepGraph {
    files: FxHashMap<Identifier, FileRecord>,
    index: FxHashMap<DependencyKey, KeyEntry>,
    /// Incremental external dependencies: which files reference which
    /// foreign artifact paths.
    external_users: FxHashMap<Identifier, FxHashSet<Identifier>>,
}

impl ModuleDepGraph {
    pub fn new() -> Self {
        ModuleDepGraph { files: FxHashMap::default(), index: FxHashMap::default(), external_users: FxHashMap::default() }
    }

    pub fn known_files(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.files.keys().copied()
    }

    pub fn status(&self, file: Identifier) -> CompileStatus {
        self.files.get(&file).map(|r| r.status).unwrap_or(CompileStatus::UpToDate)
    }

    pub fn interface_hash(&self, file: Identifier) -> Option<u64> {
        self.files.get(&file)?.graph.as_ref().map(|g| g.interface_hash())
    }

    pub fn artifact_path(&self, file: Identifier) -> Option<Identifier> {
        self.files.get(&file)?.artifact_path
    }

    pub fn set_artifact_path(&mut self, file: Identifier, path: Identifier) {
        self.files.entry(file).or_insert_with(FileRecord::new).artifact_path = Some(path);
    }

    pub fn mark_queued(&mut self, file: Identifier) {
        self.files.entry(file).or_insert_with(FileRecord::new).status = CompileStatus::Queued;
    }

    pub fn mark_compiling(&mut self, file: Identifier) {
        self.files.entry(file).or_insert_with(FileRecord::new).status = CompileStatus::Compiling;
    }

    /// A failed job keeps its file dirty; no integration occurs.
    pub fn mark_failure(&mut self, file: Identifier) {
        self.files.entry(file).or_insert_with(FileRecord::new).status = CompileStatus::Failure;
    }

    /// Merges a freshly-emitted source-file graph. Returns the set of
    /// changed definition keys: keys only in the prior revision (removed),
    /// keys only in the new revision (added), and keys present in both
    /// whose fingerprint differs — the last case is what gives a "no false
    /// negatives" guarantee for a definition whose *signature* changes
    /// without its name changing.
    ///
    /// Applying the same file-graph twice is idempotent: the second call
    /// observes no difference from the first and returns an empty set.
    pub fn integrate(&mut self, graph: SourceFileDepGraph) -> FxHashSet<DependencyKey> {
        let file = graph.file();
        let mut changed_keys = FxHashSet::default();

        let prior_nodes: FxHashMap<DependencyKey, Option<u64>> = self
            .files
            .get(&file)
            .and_then(|r| r.graph.as_ref())
            .map(|prior| prior.nodes().iter().filter(|n| n.provides).map(|n| (n.key, n.fingerprint)).collect())
            .unwrap_or_default();

        let new_nodes: FxHashMap<DependencyKey, Option<u64>> =
            graph.nodes().iter().filter(|n| n.provides).map(|n| (n.key, n.fingerprint)).collect();

        // Removed: present only in the prior revision.
        for (&key, _) in prior_nodes.iter().filter(|(k, _)| !new_nodes.contains_key(k)) {
            changed_keys.insert(key);
            self.remove_provider(key, file);
        }
        // Added or fingerprint-changed.
        for (&key, &new_fp) in &new_nodes {
            match prior_nodes.get(&key) {
                None => {
                    changed_keys.insert(key);
                    self.tie_break_new_member(key, &mut changed_keys);
                }
                Some(&prior_fp) if prior_fp != new_fp => {
                    changed_keys.insert(key);
                }
                Some(_) => {}
            }
            self.add_provider(key, file);
        }

        // Rebuild this file's contribution to the reverse (def → users) index:
        // drop whatever arcs the prior revision contributed, then re-insert
        // this revision's.
        self.remove_arcs_from(file);
        for arc in graph.arcs() {
            self.index.entry(arc.def).or_default().users.push((file, arc.cascades));
        }

        self.external_users.retain(|_, users| {
            users.remove(&file);
            !users.is_empty()
        });
        for external in graph.externals() {
            self.external_users.entry(external.path).or_default().insert(file);
        }

        let record = self.files.entry(file).or_insert_with(FileRecord::new);
        record.status = CompileStatus::Success;
        record.graph = Some(graph);

        changed_keys
    }

    fn add_provider(&mut self, key: DependencyKey, file: Identifier) {
        self.index.entry(key).or_default().providers.insert(file);
    }

    fn remove_provider(&mut self, key: DependencyKey, file: Identifier) {
        if let Some(entry) = self.index.get_mut(&key) {
            entry.providers.remove(&file);
        }
    }

    fn remove_arcs_from(&mut self, file: Identifier) {
        for entry in self.index.values_mut() {
            entry.users.retain(|(user, _)| *user != file);
        }
    }

    /// Adding a new `Member(T, m)` must also mark `PotentialMember(T,
    /// "")`'s dependents as changed, even
    /// though no concrete arc to `Member(T, m)` existed before — a
    /// dependent that only recorded "I depend on *some* member of T" must
    /// still be woken up.
    fn tie_break_new_member(&self, key: DependencyKey, changed_keys: &mut FxHashSet<DependencyKey>) {
        use crate::dep_key::NodeKind;
        if key.kind == NodeKind::Member {
            changed_keys.insert(DependencyKey::potential_member(key.context, key.aspect));
        }
    }

    /// Transitive closure over incoming arcs: a work-list BFS, each file
    /// visited at most once, insertion order preserved for deterministic
    /// reporting.
    pub fn find_dependents(&self, changed_keys: impl IntoIterator<Item = DependencyKey>) -> Vec<Identifier> {
        let mut queue: Vec<DependencyKey> = changed_keys.into_iter().collect();
        let mut queued_keys: FxHashSet<DependencyKey> = queue.iter().copied().collect();
        let mut expanded_files: FxHashSet<Identifier> = FxHashSet::default();
        let mut result = Vec::new();
        let mut seen_files: FxHashSet<Identifier> = FxHashSet::default();

        let mut i = 0;
        while i < queue.len() {
            let key = queue[i];
            i += 1;
            let entry = match self.index.get(&key) {
                Some(entry) => entry,
                None => continue,
            };

            for &(user_file, cascades) in &entry.users {
                if seen_files.insert(user_file) {
                    result.push(user_file);
                }
                if cascades && expanded_files.insert(user_file) {
                    if let Some(record) = self.files.get(&user_file) {
                        if let Some(graph) = &record.graph {
                            for provided in graph.provides_keys() {
                                if queued_keys.insert(provided) {
                                    queue.push(provided);
                                }
                            }
                        }
                    }
                }
            }
        }

        result
    }

    /// When a foreign artifact's interface hash has changed, every file
    /// that referenced it (and observed a
    /// different hash last time, or never observed one at all) is dirty.
    /// This invalidation is always cascading: propagate through
    /// `find_dependents` on each such file's `SourceFileProvide` key.
    pub fn invalidated_by_external(&self, path: Identifier, new_interface_hash: u64) -> FxHashSet<Identifier> {
        let mut dirty = FxHashSet::default();
        let users = match self.external_users.get(&path) {
            Some(users) => users,
            None => return dirty,
        };
        for &file in users {
            let observed = self.files.get(&file).and_then(|r| r.graph.as_ref()).and_then(|g| {
                g.externals().iter().find(|e| e.path == path).and_then(|e| e.observed_interface_hash)
            });
            if observed != Some(new_interface_hash) {
                dirty.insert(file);
            }
        }
        dirty
    }

    pub fn node_count(&self) -> usize {
        self.files.values().filter_map(|r| r.graph.as_ref()).map(|g| g.nodes().len()).sum()
    }

    pub fn arc_count(&self) -> usize {
        self.files.values().filter_map(|r| r.graph.as_ref()).map(|g| g.arcs().len()).sum()
    }

    pub fn dirty_file_count(&self) -> usize {
        self.files.values().filter(|r| r.status != CompileStatus::UpToDate).count()
    }
}

impl Default for ModuleDepGraph {
    fn default() -> Self {
        Self::new()
    }
}
