//! The dependency verifier: a single-file property-testing pass that reads
//! an annotated source, runs the front end to populate a
//! `ReferencedNameTracker`, and checks that every expectation comment and
//! every recorded dependency agree with each other.
//!
//! This crate does not run a front end itself — parser and semantic
//! analyzer are external collaborators — callers hand in the
//! already-populated tracker from a single-file compile.

use fgdep_paths::Identifier;
use fgdep_query_system::tracker::ReferencedNameTracker;
use tracing::debug;

use crate::diagnostic::{apply_fixits as apply_fixits_impl, sort_diagnostics, Diagnostic, FixIt};
use crate::error::VerifyError;
use crate::expectation::{parse_expectations, Expectation, ObligationKind, Selector};
use crate::obligation::{build_obligations, Obligation, ObligationState};

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerifyReport {
    /// Exit code is non-zero iff any diagnostic was produced.
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Canonical selector spelling used when synthesizing a fix-it for an
/// unexpected obligation. `Nominal` has two spellings in the source
/// grammar (`superclass`/`conformance`) that are indistinguishable once
/// lowered to a dependency edge; a fix-it must pick one, and "superclass"
/// is the more common source of this obligation in practice, so that's
/// what gets suggested.
fn selector_name(kind: ObligationKind, cascades: bool) -> &'static str {
    match (kind, cascades) {
        (ObligationKind::Nominal, true) => "cascading-superclass",
        (ObligationKind::Nominal, false) => "private-superclass",
        (ObligationKind::Member, true) => "cascading-member",
        (ObligationKind::Member, false) => "private-member",
        (ObligationKind::DynamicMember, true) => "cascading-dynamic-member",
        (ObligationKind::DynamicMember, false) => "private-dynamic-member",
    }
}

fn process_scoped(
    expectation: &Expectation,
    kind: ObligationKind,
    scope: crate::expectation::Scope,
    obligations: &mut [Obligation],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let key = match expectation.keys().into_iter().next() {
        Some(key) => key,
        None => {
            diagnostics.push(Diagnostic {
                line: expectation.line,
                message: "expectation is missing its key".to_string(),
                fix_it: None,
            });
            return;
        }
    };

    let matched = obligations
        .iter_mut()
        .find(|o| o.state == ObligationState::Owed && o.kind == kind && o.key == key);

    match matched {
        Some(obligation) if obligation.cascades == scope.cascades() => {
            obligation.state = ObligationState::Fulfilled;
        }
        Some(obligation) => {
            obligation.state = ObligationState::Failed;
            let found = if obligation.cascades { "cascading" } else { "private" };
            let wanted = if scope.cascades() { "cascading" } else { "private" };
            diagnostics.push(Diagnostic {
                line: expectation.line,
                message: format!("expected a {wanted} dependency on '{key}' but the recorded one is {found}"),
                fix_it: None,
            });
        }
        None => {
            diagnostics.push(Diagnostic {
                line: expectation.line,
                message: format!("expected a dependency on '{key}' but none was recorded"),
                fix_it: None,
            });
        }
    }
}

fn process_no_dependency(expectation: &Expectation, obligations: &mut [Obligation], diagnostics: &mut Vec<Diagnostic>) {
    let key = match expectation.keys().into_iter().next() {
        Some(key) => key,
        None => return,
    };
    if let Some(obligation) = obligations.iter_mut().find(|o| o.state == ObligationState::Owed && o.key == key) {
        obligation.state = ObligationState::Failed;
        diagnostics.push(Diagnostic {
            line: expectation.line,
            message: format!("unexpected dependency exists on '{key}'"),
            fix_it: None,
        });
    }
}

fn process_provides(expectation: &Expectation, tracker: &ReferencedNameTracker, diagnostics: &mut Vec<Diagnostic>) {
    for key in expectation.keys() {
        let ident = Identifier::intern(&key);
        if !tracker.provides().contains(&ident) {
            diagnostics.push(Diagnostic {
                line: expectation.line,
                message: format!("expected this file to provide '{key}' but it does not"),
                fix_it: None,
            });
        }
    }
}

/// Runs the verifier over `source` and the tracker a front-end run on that
/// same source produced. Returns a `VerifyError` only for malformed
/// expectation syntax in `source` itself; everything else is reported as a
/// `Diagnostic` inside the returned report — a dependency mismatch emits an
/// ordinary source diagnostic and leaves the exit code non-zero.
pub fn verify(source: &str, tracker: &ReferencedNameTracker) -> Result<VerifyReport, VerifyError> {
    let expectations = parse_expectations(source)?;
    let mut obligations = build_obligations(tracker);
    let mut diagnostics = Vec::new();

    for expectation in &expectations {
        match expectation.selector.clone() {
            Selector::Provides => process_provides(expectation, tracker, &mut diagnostics),
            Selector::NoDependency => process_no_dependency(expectation, &mut obligations, &mut diagnostics),
            Selector::Scoped(kind, scope) => process_scoped(expectation, kind, scope, &mut obligations, &mut diagnostics),
        }
    }

    let eof_line = source.lines().count() + 1;
    for obligation in obligations.iter().filter(|o| o.state == ObligationState::Owed) {
        debug!(key = %obligation.key, kind = ?obligation.kind, "unexpected dependency with no matching expectation");
        let selector = selector_name(obligation.kind, obligation.cascades);
        diagnostics.push(Diagnostic {
            line: eof_line,
            message: format!("unexpected dependency on '{}' ({selector}) with no expectation", obligation.key),
            fix_it: Some(FixIt {
                before_line: eof_line,
                text: format!("// expected-{selector} {{{{{}}}}}", obligation.key),
            }),
        });
    }

    sort_diagnostics(&mut diagnostics);
    Ok(VerifyReport { diagnostics })
}

/// Applies every fix-it in `report` to `source`.
pub fn apply_fixits(source: &str, report: &VerifyReport) -> String {
    apply_fixits_impl(source, &report.diagnostics)
}
