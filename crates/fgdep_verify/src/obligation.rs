//! Obligations: the verifier's per-dependency bookkeeping. Every
//! qualifying entry the referenced-name tracker emits starts `Owed`; each
//! expectation comment transitions exactly one obligation to `Fulfilled` or
//! `Failed`. Whatever is still `Owed` once every expectation has been
//! processed is the "unexpected dependency" report.

use fgdep_paths::Identifier;
use fgdep_query_system::dep_key::NodeKind;
use fgdep_query_system::tracker::ReferencedNameTracker;

use crate::expectation::ObligationKind;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ObligationState {
    Owed,
    Fulfilled,
    Failed,
}

/// One dependency the tracker recorded, matched by the composite key
/// `(name, kind)` — `name` here is the fully-qualified dotted key
/// (`context.name`, or just `name` when there is no context), since that
/// is what an `expected-*` comment's payload names.
#[derive(Clone, Debug)]
pub struct Obligation {
    pub kind: ObligationKind,
    pub key: String,
    pub cascades: bool,
    pub state: ObligationState,
}

fn qualified_key(context: Identifier, name: Identifier) -> String {
    if context.is_empty() {
        name.as_str().to_string()
    } else {
        format!("{}.{}", context.as_str(), name.as_str())
    }
}

fn obligation_kind_of(kind: NodeKind) -> Option<ObligationKind> {
    match kind {
        NodeKind::Nominal => Some(ObligationKind::Nominal),
        NodeKind::Member => Some(ObligationKind::Member),
        NodeKind::DynamicLookup => Some(ObligationKind::DynamicMember),
        // TopLevel, PotentialMember, ExternalDepend, and SourceFileProvide
        // sit outside the selector matrix: they are not obligations this
        // verifier tracks.
        NodeKind::TopLevel | NodeKind::PotentialMember | NodeKind::ExternalDepend | NodeKind::SourceFileProvide => None,
    }
}

/// Builds the initial `Owed` obligation set from everything the tracker
/// recorded during one file's compilation. The verifier expects a
/// referenced-name tracker populated by running the front end.
pub fn build_obligations(tracker: &ReferencedNameTracker) -> Vec<Obligation> {
    let mut obligations = Vec::new();
    tracker.enumerate_uses(true, false, |node_kind, context, name, cascades| {
        if let Some(kind) = obligation_kind_of(node_kind) {
            obligations.push(Obligation {
                kind,
                key: qualified_key(context, name),
                cascades,
                state: ObligationState::Owed,
            });
        }
    });
    obligations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_and_member_uses_become_obligations() {
        let mut t = ReferencedNameTracker::new();
        t.add_nominal_dependency(Identifier::intern("Base_obligation_test"), true);
        t.add_used_member(
            Identifier::intern("Base_obligation_test"),
            Identifier::intern("init_obligation_test"),
            true,
        );
        let obligations = build_obligations(&t);
        assert_eq!(obligations.len(), 2);
        assert!(obligations.iter().all(|o| o.state == ObligationState::Owed));
    }

    #[test]
    fn top_level_uses_are_not_obligations() {
        let mut t = ReferencedNameTracker::new();
        t.add_top_level_name(Identifier::intern("plain_obligation_test"), false);
        assert!(build_obligations(&t).is_empty());
    }

    #[test]
    fn qualified_key_omits_empty_context() {
        assert_eq!(qualified_key(Identifier::EMPTY, Identifier::intern("Base_key_test")), "Base_key_test");
        assert_eq!(
            qualified_key(Identifier::intern("Base_key_test"), Identifier::intern("init")),
            "Base_key_test.init"
        );
    }
}
