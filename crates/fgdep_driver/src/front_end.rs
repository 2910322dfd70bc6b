//! A stand-in front end: the real parser and semantic analyzer are external
//! collaborators this crate does not implement. Production deployments wire
//! a real compiler's declaration-registration and name-lookup passes into
//! `CompileJobRunner` and `fgdep_verify::verify` instead of this module; it
//! exists so the binary has something concrete to run end to end and so
//! `--verify-incremental-dependencies` has a tracker to check expectations
//! against.
//!
//! Reads a line-oriented directive grammar: one directive per non-blank,
//! non-comment line, `<directive> <payload>`. Lines starting with `//`
//! (including `expected-*` annotations) are never interpreted here.

use fgdep_data_structures::fx::FxHashMap;
use fgdep_data_structures::{StableHash, StableHasher};
use fgdep_paths::Identifier;
use fgdep_query_system::dep_key::{Aspect, DependencyKey};
use fgdep_query_system::file_graph::SourceFileDepGraphBuilder;
use fgdep_query_system::tracker::ReferencedNameTracker;
use fgdep_query_system::SourceFileDepGraph;

fn line_fingerprint(line: &str) -> u64 {
    let mut hasher = StableHasher::new();
    line.stable_hash(&mut hasher);
    hasher.finalize()
}

/// Scans `source` and returns the tracker a real front end would have
/// populated, plus `(name, fingerprint)` for every `provides` directive. The
/// fingerprint is the hash of that directive's own line, so editing a
/// declaration's line changes its fingerprint while leaving every other
/// declaration's untouched — the property the interface-hash propagation
/// algorithm depends on.
pub fn populate_tracker(source: &str) -> (ReferencedNameTracker, Vec<(Identifier, u64)>) {
    let mut tracker = ReferencedNameTracker::new();
    let mut provides = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let directive = parts.next().unwrap_or("");
        let payload = parts.next().unwrap_or("").trim();

        match directive {
            "provides" => {
                let name = Identifier::intern(payload);
                tracker.add_provides(name);
                provides.push((name, line_fingerprint(trimmed)));
            }
            "uses" => tracker.add_top_level_name(Identifier::intern(payload), false),
            "cascading-uses" => tracker.add_top_level_name(Identifier::intern(payload), true),
            "superclass" => tracker.add_nominal_dependency(Identifier::intern(payload), false),
            "cascading-superclass" => tracker.add_nominal_dependency(Identifier::intern(payload), true),
            "conformance" => tracker.add_nominal_dependency(Identifier::intern(payload), false),
            "cascading-conformance" => tracker.add_nominal_dependency(Identifier::intern(payload), true),
            "member" | "cascading-member" => {
                if let Some((context, name)) = payload.split_once('.') {
                    tracker.add_used_member(
                        Identifier::intern(context),
                        Identifier::intern(name),
                        directive == "cascading-member",
                    );
                }
            }
            "potential-member" => tracker.add_potential_member(Identifier::intern(payload), false),
            "cascading-potential-member" => tracker.add_potential_member(Identifier::intern(payload), true),
            "dynamic" => tracker.add_dynamic_lookup_name(Identifier::intern(payload), false),
            "cascading-dynamic" => tracker.add_dynamic_lookup_name(Identifier::intern(payload), true),
            "external" => tracker.add_external_depend(Identifier::intern(payload)),
            _ => {}
        }
    }

    (tracker, provides)
}

/// Runs the stand-in front end over `source` and assembles the resulting
/// `SourceFileDepGraph`: one `TopLevel` definition per `provides`
/// directive, plus every arc the tracker recorded. The file's interface hash
/// is the combined fingerprint of its provided names — stable under
/// reordering since it is built from a deterministic `Vec`, but sensitive to
/// any one declaration's own line changing.
pub fn compile(
    file: Identifier,
    source: &str,
    external_interface_hashes: &FxHashMap<Identifier, u64>,
) -> SourceFileDepGraph {
    let (tracker, provides) = populate_tracker(source);

    let mut builder = SourceFileDepGraphBuilder::new(file);
    for &(name, fingerprint) in &provides {
        builder.add_definition(DependencyKey::top_level(name, Aspect::Interface), Some(fingerprint));
    }

    let mut interface_hasher = StableHasher::new();
    for &(name, fingerprint) in &provides {
        name.as_str().stable_hash(&mut interface_hasher);
        fingerprint.stable_hash(&mut interface_hasher);
    }
    let interface_hash = interface_hasher.finalize();

    builder.build(&tracker, interface_hash, external_interface_hashes)
}
