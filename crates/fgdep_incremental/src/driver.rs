//! The incremental driver loop: the only piece of this crate that
//! actually orchestrates compilation. It owns the module graph for the
//! duration of one build; worker jobs only ever produce a
//! `SourceFileDepGraph` and hand it back over a completion channel, so
//! `integrate` runs single-threaded with no locking.

use std::sync::atomic::{AtomicBool, Ordering};

use fgdep_data_structures::fx::{FxHashMap, FxHashSet};
use fgdep_paths::Identifier;
use fgdep_query_system::{CompileStatus, DependencyKey, ModuleDepGraph, SourceFileDepGraph};
use tracing::{debug, info, warn};

use crate::error::JobError;
use crate::output_file_map::OutputFileMap;
use crate::persist;

/// One source file as seen by the driver at the start of a build: its
/// canonical identity and the content hash the caller computed for it
/// (typically a hash of the file's bytes). The driver has no opinion on how
/// that hash is computed, only on what changes when it differs from the
/// prior build's.
#[derive(Clone, Copy, Debug)]
pub struct BuildInput {
    pub file: Identifier,
    pub content_hash: u64,
}

/// Toggles mirroring the driver's CLI surface; the binary crate translates
/// `getopts` flags into this struct.
#[derive(Clone, Copy, Debug, Default)]
pub struct DriverConfig {
    pub emit_dependencies: bool,
    pub show_incremental: bool,
    pub show_job_lifecycle: bool,
    pub cross_module_incremental: bool,
}

/// Why a file was queued, surfaced to logs when `-driver-show-incremental`
/// is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueReason {
    Initial,
    ExternallyInvalidated,
    LocallyInvalidated,
    IncrementalDependency,
}

impl QueueReason {
    fn describe(self) -> &'static str {
        match self {
            QueueReason::Initial => "queuing because it has no prior record",
            QueueReason::ExternallyInvalidated => "queuing because a foreign artifact's interface hash changed",
            QueueReason::LocallyInvalidated => "queuing because its content hash differs from the prior build",
            QueueReason::IncrementalDependency => "queuing because of incremental dependencies",
        }
    }
}

/// The outcome of one whole build: exit code is zero iff `failures` is
/// empty and the build wasn't cancelled.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub compiled: Vec<Identifier>,
    pub failures: Vec<JobError>,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }
}

/// Implemented by whatever invokes the actual compiler for one file (the
/// parser/semantic analyzer, which this crate does not implement). The
/// driver only needs a `(file) -> Result<graph, message>` contract, plus
/// the external interface hashes that file's compile observed, since
/// `integrate` needs both.
/// Blanket-implemented for any matching closure so callers rarely write an
/// explicit impl.
pub trait CompileJobRunner: Sync {
    fn compile(
        &self,
        file: Identifier,
        external_interface_hashes: &FxHashMap<Identifier, u64>,
    ) -> Result<SourceFileDepGraph, String>;
}

impl<F> CompileJobRunner for F
where
    F: Fn(Identifier, &FxHashMap<Identifier, u64>) -> Result<SourceFileDepGraph, String> + Sync,
{
    fn compile(
        &self,
        file: Identifier,
        external_interface_hashes: &FxHashMap<Identifier, u64>,
    ) -> Result<SourceFileDepGraph, String> {
        self(file, external_interface_hashes)
    }
}

enum JobOutcome {
    Success(SourceFileDepGraph),
    Failure(JobError),
}

/// Runs the build to completion: classify, compute dependents, dispatch,
/// integrate, repeat.
///
/// `prior_content_hashes` holds the content hash observed for each file in
/// the previous build (an empty map behaves as if every input were new).
/// `known_external_hashes` supplies, for every foreign artifact path some
/// file in this build references, the interface hash a sibling module build
/// most recently produced for it — only consulted when
/// `config.cross_module_incremental` is set (the "externally-invalidated"
/// classification, gated behind
/// `-enable-experimental-cross-module-incremental-build`).
/// `cancel` is the cooperative cancellation flag: workers finish
/// their current job, but a result observed after the flag is set is
/// discarded instead of integrated.
pub fn run_incremental_build<R: CompileJobRunner>(
    graph: &mut ModuleDepGraph,
    inputs: &[BuildInput],
    prior_content_hashes: &FxHashMap<Identifier, u64>,
    known_external_hashes: &FxHashMap<Identifier, u64>,
    output_file_map: &OutputFileMap,
    config: &DriverConfig,
    runner: &R,
    cancel: &AtomicBool,
) -> BuildReport {
    let mut report = BuildReport::default();
    let mut reasons: FxHashMap<Identifier, QueueReason> = FxHashMap::default();

    // Step 2: classify inputs and seed the queue.
    for input in inputs {
        let is_initial = graph.interface_hash(input.file).is_none();
        let locally_invalidated = prior_content_hashes.get(&input.file) != Some(&input.content_hash);

        if is_initial {
            enqueue(graph, &mut reasons, input.file, QueueReason::Initial);
        } else if locally_invalidated {
            enqueue(graph, &mut reasons, input.file, QueueReason::LocallyInvalidated);
        }
    }

    if config.cross_module_incremental {
        for (&path, &hash) in known_external_hashes {
            for file in graph.invalidated_by_external(path, hash) {
                enqueue(graph, &mut reasons, file, QueueReason::ExternallyInvalidated);
            }
        }
    }

    // Step 3 onward (computing and enqueuing transitive dependents) happens
    // inside the loop below, once each batch's `integrate` calls report
    // which keys actually changed.
    loop_build(graph, &mut reasons, output_file_map, config, runner, cancel, &mut report);

    report
}

fn enqueue(graph: &mut ModuleDepGraph, reasons: &mut FxHashMap<Identifier, QueueReason>, file: Identifier, reason: QueueReason) {
    if matches!(graph.status(file), CompileStatus::Queued | CompileStatus::Compiling) {
        return;
    }
    graph.mark_queued(file);
    reasons.entry(file).or_insert(reason);
}

fn loop_build<R: CompileJobRunner>(
    graph: &mut ModuleDepGraph,
    reasons: &mut FxHashMap<Identifier, QueueReason>,
    output_file_map: &OutputFileMap,
    config: &DriverConfig,
    runner: &R,
    cancel: &AtomicBool,
    report: &mut BuildReport,
) {
    loop {
        let batch: Vec<Identifier> =
            graph.known_files().filter(|&f| graph.status(f) == CompileStatus::Queued).collect();
        if batch.is_empty() {
            break;
        }
        if cancel.load(Ordering::SeqCst) {
            report.cancelled = true;
            break;
        }

        for &file in &batch {
            graph.mark_compiling(file);
            if config.show_job_lifecycle {
                info!(file = %file, "job starting");
            }
            if config.show_incremental {
                if let Some(reason) = reasons.get(&file) {
                    debug!(file = %file, reason = reason.describe(), "job queued");
                }
            }
        }

        let external_interface_hashes = snapshot_interface_hashes(graph);
        let outcomes = dispatch(&batch, runner, &external_interface_hashes);

        if cancel.load(Ordering::SeqCst) {
            report.cancelled = true;
            break;
        }

        let mut changed_keys: FxHashSet<DependencyKey> = FxHashSet::default();
        for (file, outcome) in outcomes {
            match outcome {
                JobOutcome::Success(fresh_graph) => {
                    if config.show_job_lifecycle {
                        info!(file = %file, "job finished: success");
                    }
                    if config.emit_dependencies {
                        if let Some(path) = output_file_map.dependency_artifact_path(file.as_str()) {
                            if let Err(e) = persist::write_artifact(path, &fresh_graph) {
                                warn!(file = %file, error = %e, "failed to write dependency artifact");
                            } else {
                                graph.set_artifact_path(file, Identifier::intern(&path.display().to_string()));
                            }
                        }
                    }
                    changed_keys.extend(graph.integrate(fresh_graph));
                    report.compiled.push(file);
                }
                JobOutcome::Failure(err) => {
                    if config.show_job_lifecycle {
                        info!(file = %file, "job finished: failure");
                    }
                    graph.mark_failure(file);
                    report.failures.push(err);
                }
            }
        }

        // Step 3/4: the freshly changed keys determine the next batch.
        if !changed_keys.is_empty() {
            for dependent in graph.find_dependents(changed_keys) {
                enqueue(graph, reasons, dependent, QueueReason::IncrementalDependency);
            }
        }
    }
}

/// Every known file's current interface hash, keyed by file — the table a
/// compile job consults to tell whether a reference it already knew about
/// still resolves to the same public API. The propagation loop itself feeds
/// on changed keys, not interface hashes directly, but a job implementation
/// typically wants this table to decide what to re-emit.
fn snapshot_interface_hashes(graph: &ModuleDepGraph) -> FxHashMap<Identifier, u64> {
    let mut out = FxHashMap::default();
    for file in graph.known_files() {
        if let Some(hash) = graph.interface_hash(file) {
            out.insert(file, hash);
        }
    }
    out
}

fn dispatch<R: CompileJobRunner>(
    batch: &[Identifier],
    runner: &R,
    external_interface_hashes: &FxHashMap<Identifier, u64>,
) -> Vec<(Identifier, JobOutcome)> {
    use rayon::prelude::*;

    batch
        .par_iter()
        .map(|&file| {
            let outcome = match runner.compile(file, external_interface_hashes) {
                Ok(g) => JobOutcome::Success(g),
                Err(message) => JobOutcome::Failure(JobError { file: file.as_str().to_string(), message }),
            };
            (file, outcome)
        })
        .collect()
}

/// A `crossbeam-channel`-based dispatch path kept alongside `dispatch`: it
/// lets a caller interleave completion handling with its own polling loop
/// (e.g. watching for an interrupt) instead of blocking on `par_iter`'s
/// implicit barrier until every job in the batch finishes.
pub fn dispatch_with_channel<R: CompileJobRunner>(
    batch: &[Identifier],
    runner: &R,
    external_interface_hashes: &FxHashMap<Identifier, u64>,
) -> crossbeam_channel::Receiver<(Identifier, Result<SourceFileDepGraph, JobError>)> {
    let (tx, rx) = crossbeam_channel::unbounded();
    rayon::scope(|scope| {
        for &file in batch {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = runner
                    .compile(file, external_interface_hashes)
                    .map_err(|message| JobError { file: file.as_str().to_string(), message });
                let _ = tx.send((file, result));
            });
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use fgdep_query_system::dep_key::Aspect;
    use fgdep_query_system::file_graph::SourceFileDepGraphBuilder;
    use fgdep_query_system::tracker::ReferencedNameTracker;
    use std::sync::Mutex;

    fn empty_graph_for(file: Identifier, interface_hash: u64) -> SourceFileDepGraph {
        SourceFileDepGraphBuilder::new(file).build(&ReferencedNameTracker::new(), interface_hash, &FxHashMap::default())
    }

    struct RecordingRunner {
        calls: Mutex<Vec<Identifier>>,
        scripted: FxHashMap<Identifier, Result<u64, String>>,
    }

    impl CompileJobRunner for RecordingRunner {
        fn compile(
            &self,
            file: Identifier,
            _external_interface_hashes: &FxHashMap<Identifier, u64>,
        ) -> Result<SourceFileDepGraph, String> {
            self.calls.lock().unwrap().push(file);
            match self.scripted.get(&file) {
                Some(Ok(hash)) => Ok(empty_graph_for(file, *hash)),
                Some(Err(message)) => Err(message.clone()),
                None => Ok(empty_graph_for(file, 0)),
            }
        }
    }

    #[test]
    fn a_brand_new_file_is_queued_and_compiled() {
        let mut graph = ModuleDepGraph::new();
        let file = Identifier::intern("driver_new_file_test.swift");
        let mut scripted = FxHashMap::default();
        scripted.insert(file, Ok(1));
        let runner = RecordingRunner { calls: Mutex::new(Vec::new()), scripted };

        let report = run_incremental_build(
            &mut graph,
            &[BuildInput { file, content_hash: 7 }],
            &FxHashMap::default(),
            &FxHashMap::default(),
            &OutputFileMap::new(),
            &DriverConfig::default(),
            &runner,
            &AtomicBool::new(false),
        );

        assert!(report.is_success());
        assert_eq!(report.compiled, vec![file]);
        assert_eq!(graph.status(file), CompileStatus::Success);
    }

    #[test]
    fn unchanged_content_hash_does_not_requeue_a_known_file() {
        let mut graph = ModuleDepGraph::new();
        let file = Identifier::intern("driver_unchanged_test.swift");
        graph.integrate(empty_graph_for(file, 1));

        let mut prior = FxHashMap::default();
        prior.insert(file, 7u64);
        let mut scripted = FxHashMap::default();
        scripted.insert(file, Ok(1));
        let runner = RecordingRunner { calls: Mutex::new(Vec::new()), scripted };

        let report = run_incremental_build(
            &mut graph,
            &[BuildInput { file, content_hash: 7 }],
            &prior,
            &FxHashMap::default(),
            &OutputFileMap::new(),
            &DriverConfig::default(),
            &runner,
            &AtomicBool::new(false),
        );

        assert!(report.compiled.is_empty());
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn a_failed_job_keeps_its_file_dirty_and_does_not_abort_siblings() {
        let mut graph = ModuleDepGraph::new();
        let good = Identifier::intern("driver_partial_failure_good.swift");
        let bad = Identifier::intern("driver_partial_failure_bad.swift");

        let mut scripted = FxHashMap::default();
        scripted.insert(good, Ok(1));
        scripted.insert(bad, Err("syntax error".to_string()));
        let runner = RecordingRunner { calls: Mutex::new(Vec::new()), scripted };

        let report = run_incremental_build(
            &mut graph,
            &[BuildInput { file: good, content_hash: 1 }, BuildInput { file: bad, content_hash: 1 }],
            &FxHashMap::default(),
            &FxHashMap::default(),
            &OutputFileMap::new(),
            &DriverConfig::default(),
            &runner,
            &AtomicBool::new(false),
        );

        assert!(!report.is_success());
        assert_eq!(report.compiled, vec![good]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(graph.status(good), CompileStatus::Success);
        assert_eq!(graph.status(bad), CompileStatus::Failure);
    }

    #[test]
    fn a_changed_top_level_name_requeues_and_recompiles_its_dependent() {
        let mut graph = ModuleDepGraph::new();
        let producer = Identifier::intern("driver_dependent_producer.swift");
        let consumer = Identifier::intern("driver_dependent_consumer.swift");
        let name = Identifier::intern("driver_dependent_name");

        let mut producer_builder = SourceFileDepGraphBuilder::new(producer);
        producer_builder.add_definition(DependencyKey::top_level(name, Aspect::Interface), Some(1));
        graph.integrate(producer_builder.build(&ReferencedNameTracker::new(), 1, &FxHashMap::default()));

        let mut consumer_tracker = ReferencedNameTracker::new();
        consumer_tracker.add_top_level_name(name, false);
        graph.integrate(SourceFileDepGraphBuilder::new(consumer).build(&consumer_tracker, 1, &FxHashMap::default()));

        let runner_producer_builder = move |file: Identifier, _ext: &FxHashMap<Identifier, u64>| {
            if file == producer {
                let mut b = SourceFileDepGraphBuilder::new(producer);
                b.add_definition(DependencyKey::top_level(name, Aspect::Interface), Some(2));
                Ok(b.build(&ReferencedNameTracker::new(), 2, &FxHashMap::default()))
            } else {
                Ok(empty_graph_for(file, 1))
            }
        };

        let mut prior = FxHashMap::default();
        prior.insert(producer, 1u64);
        let report = run_incremental_build(
            &mut graph,
            &[BuildInput { file: producer, content_hash: 2 }],
            &prior,
            &FxHashMap::default(),
            &OutputFileMap::new(),
            &DriverConfig::default(),
            &runner_producer_builder,
            &AtomicBool::new(false),
        );

        assert!(report.is_success());
        assert!(report.compiled.contains(&producer));
        assert!(report.compiled.contains(&consumer), "the consumer must be recompiled once the producer's signature changes");
    }

    #[test]
    fn a_set_cancellation_flag_stops_the_loop_without_running_any_jobs() {
        let mut graph = ModuleDepGraph::new();
        let file = Identifier::intern("driver_cancel_test.swift");
        let mut scripted = FxHashMap::default();
        scripted.insert(file, Ok(1));
        let runner = RecordingRunner { calls: Mutex::new(Vec::new()), scripted };
        let cancel = AtomicBool::new(true);

        let report = run_incremental_build(
            &mut graph,
            &[BuildInput { file, content_hash: 1 }],
            &FxHashMap::default(),
            &FxHashMap::default(),
            &OutputFileMap::new(),
            &DriverConfig::default(),
            &runner,
            &cancel,
        );

        assert!(report.cancelled);
        assert!(report.compiled.is_empty());
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
