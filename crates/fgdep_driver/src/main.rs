//! The driver binary: parses the CLI surface, then either runs the
//! incremental build loop or the single-file dependency verifier.
//! Mirrors `rustc`'s own split between a thin `main` and the crates that do
//! the actual work — this binary owns process exit codes and I/O, nothing
//! else.

mod cli;
mod content_hash_cache;
mod front_end;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use fgdep_data_structures::fx::FxHashMap;
use fgdep_data_structures::StableHasher;
use fgdep_incremental::{run_incremental_build, BuildInput, CompileJobRunner, DriverConfig, OutputFileMap};
use fgdep_paths::Identifier;
use fgdep_query_system::{ModuleDepGraph, SourceFileDepGraph};
use tracing::warn;

use cli::{CliError, Flags};
use content_hash_cache::ContentHashCache;

/// Adapts the stand-in front end to `CompileJobRunner`: every input
/// file's text is read up front, since the driver loop may hand any queued
/// file — including a dependent that wasn't on the command line's original
/// "changed" set — to a job in the same batch.
struct StubCompiler {
    sources: FxHashMap<Identifier, String>,
}

impl CompileJobRunner for StubCompiler {
    fn compile(
        &self,
        file: Identifier,
        external_interface_hashes: &FxHashMap<Identifier, u64>,
    ) -> Result<SourceFileDepGraph, String> {
        let source = self.sources.get(&file).ok_or_else(|| format!("no source text recorded for {file}"))?;
        Ok(front_end::compile(file, source, external_interface_hashes))
    }
}

fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = StableHasher::new();
    hasher.combine(bytes);
    hasher.finalize()
}

fn content_hash_cache_path(flags: &Flags) -> PathBuf {
    match &flags.output_file_map {
        Some(path) => path.with_file_name("content-hashes.json"),
        None => PathBuf::from("content-hashes.json"),
    }
}

fn init_logging(flags: &Flags) {
    let level = if flags.show_incremental || flags.show_job_lifecycle { "debug" } else { "warn" };
    // `try_init` rather than `init`: a caller embedding this binary's logic
    // in a test harness may already have installed a subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(level)).try_init();
}

fn run_build(flags: &Flags) -> bool {
    let output_file_map = match &flags.output_file_map {
        Some(path) => OutputFileMap::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "could not load output file map, starting empty");
            OutputFileMap::new()
        }),
        None => OutputFileMap::new(),
    };

    let mut graph = ModuleDepGraph::new();
    if flags.incremental {
        for input in &flags.inputs {
            if let Some(artifact_path) = output_file_map.dependency_artifact_path(input) {
                match fgdep_incremental::read_artifact(artifact_path) {
                    Ok(prior) => {
                        graph.integrate(prior);
                    }
                    Err(e) => {
                        warn!(file = %input, error = %e, "no usable prior artifact, treating file as new");
                    }
                }
            }
        }
    }

    let cache_path = content_hash_cache_path(flags);
    let mut cache = if flags.incremental { ContentHashCache::load(&cache_path) } else { ContentHashCache::default() };

    let mut sources = FxHashMap::default();
    let mut build_inputs = Vec::with_capacity(flags.inputs.len());
    for path in &flags.inputs {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("fgdep_driver: cannot read {path}: {e}");
                return false;
            }
        };
        let file = Identifier::intern(path);
        sources.insert(file, String::from_utf8_lossy(&bytes).into_owned());
        build_inputs.push(BuildInput { file, content_hash: content_hash(&bytes) });
    }

    let runner = StubCompiler { sources };
    let config = DriverConfig {
        emit_dependencies: flags.emit_dependencies,
        show_incremental: flags.show_incremental,
        show_job_lifecycle: flags.show_job_lifecycle,
        cross_module_incremental: flags.cross_module_incremental,
    };
    let cancel = AtomicBool::new(false);

    let report = run_incremental_build(
        &mut graph,
        &build_inputs,
        &cache.as_map(),
        &FxHashMap::default(),
        &output_file_map,
        &config,
        &runner,
        &cancel,
    );

    if flags.incremental {
        for input in &build_inputs {
            cache.record(input.file.as_str(), input.content_hash);
        }
        if let Err(e) = cache.save(&cache_path) {
            warn!(error = %e, "failed to persist content-hash cache");
        }
    }

    for failure in &report.failures {
        eprintln!("fgdep_driver: {failure}");
    }

    report.is_success()
}

fn run_verify(flags: &Flags) -> bool {
    let mut all_ok = true;

    for path in &flags.inputs {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("fgdep_driver: cannot read {path}: {e}");
                all_ok = false;
                continue;
            }
        };

        let (tracker, _) = front_end::populate_tracker(&source);
        let report = match fgdep_verify::verify(&source, &tracker) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{path}: {e}");
                all_ok = false;
                continue;
            }
        };

        if report.is_success() {
            continue;
        }
        all_ok = false;
        for diagnostic in &report.diagnostics {
            println!("{path}:{}: {}", diagnostic.line, diagnostic.message);
        }
        if flags.apply_fixits {
            let fixed = fgdep_verify::apply_fixits(&source, &report);
            if let Err(e) = fs::write(path, fixed) {
                eprintln!("fgdep_driver: failed to write fixits to {path}: {e}");
            }
        }
    }

    all_ok
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let flags = match cli::parse(&args) {
        Ok(flags) => flags,
        Err(CliError::Help(usage)) => {
            println!("{usage}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("fgdep_driver: {e}");
            return ExitCode::from(2);
        }
    };

    init_logging(&flags);

    let success = if flags.verify_incremental_dependencies { run_verify(&flags) } else { run_build(&flags) };

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
