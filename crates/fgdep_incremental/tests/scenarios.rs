//! Driver-loop scenarios, exercised end to end through the public
//! `run_incremental_build` entry point.

use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use fgdep_data_structures::fx::FxHashMap;
use fgdep_incremental::{run_incremental_build, BuildInput, CompileJobRunner, DriverConfig, OutputFileMap};
use fgdep_paths::Identifier;
use fgdep_query_system::{Aspect, DependencyKey, ModuleDepGraph, ReferencedNameTracker, SourceFileDepGraphBuilder, SourceFileDepGraph};

fn graph_providing(file: Identifier, name: Identifier, fingerprint: u64) -> SourceFileDepGraph {
    let mut builder = SourceFileDepGraphBuilder::new(file);
    builder.add_definition(DependencyKey::top_level(name, Aspect::Interface), Some(fingerprint));
    builder.build(&ReferencedNameTracker::new(), fingerprint, &FxHashMap::default())
}

fn graph_using(file: Identifier, used: Identifier) -> SourceFileDepGraph {
    let mut tracker = ReferencedNameTracker::new();
    tracker.add_top_level_name(used, false);
    SourceFileDepGraphBuilder::new(file).build(&tracker, 1, &FxHashMap::default())
}

/// Linear chain A -> B -> C. A body-only edit to C (its interface
/// fingerprint unchanged) must compile C but leave B untouched.
#[test]
fn linear_chain_body_only_edit_does_not_recompile_the_consumer() {
    let mut graph = ModuleDepGraph::new();
    let consumer = Identifier::intern("incremental_scenarios_chain_consumer.swift");
    let producer = Identifier::intern("incremental_scenarios_chain_producer.swift");
    let name = Identifier::intern("incremental_scenarios_chain_name");

    graph.integrate(graph_providing(producer, name, 1));
    graph.integrate(graph_using(consumer, name));

    let runner = move |file: Identifier, _: &FxHashMap<Identifier, u64>| {
        if file == producer {
            Ok(graph_providing(producer, name, 1))
        } else {
            Ok(graph_using(consumer, name))
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
        &runner,
        &AtomicBool::new(false),
    );

    assert!(report.is_success());
    assert_eq!(report.compiled, vec![producer], "only the locally-invalidated file recompiles");
}

/// Two files queued, one fails. The other's integration is kept; a second
/// build retries exactly the failed file.
#[test]
fn partial_failure_is_retried_on_the_next_build() {
    let mut graph = ModuleDepGraph::new();
    let good = Identifier::intern("incremental_scenarios_partial_good.swift");
    let bad = Identifier::intern("incremental_scenarios_partial_bad.swift");

    struct ScriptedRunner {
        calls: Mutex<Vec<Identifier>>,
        fail_bad: bool,
    }
    impl CompileJobRunner for ScriptedRunner {
        fn compile(&self, file: Identifier, _: &FxHashMap<Identifier, u64>) -> Result<SourceFileDepGraph, String> {
            self.calls.lock().unwrap().push(file);
            if file == bad && self.fail_bad {
                return Err("syntax error".to_string());
            }
            Ok(graph_providing(file, Identifier::intern("incremental_scenarios_partial_name"), 1))
        }
    }

    let first_runner = ScriptedRunner { calls: Mutex::new(Vec::new()), fail_bad: true };
    let report = run_incremental_build(
        &mut graph,
        &[BuildInput { file: good, content_hash: 1 }, BuildInput { file: bad, content_hash: 1 }],
        &FxHashMap::default(),
        &FxHashMap::default(),
        &OutputFileMap::new(),
        &DriverConfig::default(),
        &first_runner,
        &AtomicBool::new(false),
    );
    assert!(!report.is_success());
    assert_eq!(report.compiled, vec![good]);

    // Only the failed file is dirty; the next build retries exactly it.
    let second_runner = ScriptedRunner { calls: Mutex::new(Vec::new()), fail_bad: false };
    let mut prior = FxHashMap::default();
    prior.insert(good, 1u64);
    let retry = run_incremental_build(
        &mut graph,
        &[BuildInput { file: good, content_hash: 1 }, BuildInput { file: bad, content_hash: 1 }],
        &prior,
        &FxHashMap::default(),
        &OutputFileMap::new(),
        &DriverConfig::default(),
        &second_runner,
        &AtomicBool::new(false),
    );
    assert!(retry.is_success());
    assert_eq!(second_runner.calls.lock().unwrap().as_slice(), [bad]);
}
