//! Parses `expected-<selector> {{<message>}}` comments out of an annotated
//! source file. The selector grammar decomposes into a `(scope, kind)` pair
//! wherever one applies; `no-dependency` and `provides` stand outside that
//! pair.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::VerifyError;

/// The three dependency shapes the matrix checks. `Nominal` covers both a
/// superclass clause and a protocol-conformance clause — in the emitted
/// dependency graph both lower to the same `NodeKind::Nominal`, and the
/// verifier tells them apart only by which selector spelling the developer
/// wrote, never by re-deriving it from the graph.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ObligationKind {
    Nominal,
    Member,
    DynamicMember,
}

/// Whether the expected edge is cascading (propagates to transitive
/// dependents) or private (stops at the immediate user).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Scope {
    Private,
    Cascading,
}

impl Scope {
    pub(crate) fn cascades(self) -> bool {
        matches!(self, Scope::Cascading)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Asserts that no recorded dependency exists on the given key,
    /// regardless of kind.
    NoDependency,
    /// Asserts that the file's `provides` set contains every comma-separated
    /// name in the payload.
    Provides,
    /// Asserts a dependency of the given `(kind, scope)` on the payload key.
    Scoped(ObligationKind, Scope),
}

fn selector_table() -> &'static [(&'static str, Selector)] {
    use ObligationKind::*;
    use Scope::*;
    static TABLE: OnceLock<Vec<(&'static str, Selector)>> = OnceLock::new();
    TABLE
        .get_or_init(|| {
            vec![
                ("no-dependency", Selector::NoDependency),
                ("provides", Selector::Provides),
                ("private-superclass", Selector::Scoped(Nominal, Private)),
                ("cascading-superclass", Selector::Scoped(Nominal, Cascading)),
                ("private-conformance", Selector::Scoped(Nominal, Private)),
                ("cascading-conformance", Selector::Scoped(Nominal, Cascading)),
                ("private-member", Selector::Scoped(Member, Private)),
                ("cascading-member", Selector::Scoped(Member, Cascading)),
                ("private-dynamic-member", Selector::Scoped(DynamicMember, Private)),
                ("cascading-dynamic-member", Selector::Scoped(DynamicMember, Cascading)),
            ]
        })
        .as_slice()
}

fn parse_selector(text: &str) -> Option<Selector> {
    selector_table().iter().find(|(name, _)| *name == text).map(|(_, selector)| selector.clone())
}

/// One `expected-<selector> {{<message>}}` comment, 1-indexed by the line it
/// was found on (matching typical diagnostic line-numbering conventions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expectation {
    pub line: usize,
    pub selector: Selector,
    pub payload: String,
}

impl Expectation {
    /// Scope expectations carry exactly one key; `provides` carries a
    /// comma-separated list; `no-dependency` carries one key. This splits
    /// the payload the way each selector needs it.
    pub fn keys(&self) -> Vec<String> {
        self.payload.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bexpected-([a-zA-Z0-9-]+)").unwrap())
}

/// Scans `source` line by line for `expected-<selector> {{<message>}}`
/// comments. A line may carry at most one expectation; unrecognized
/// selectors and malformed payloads are reported as `VerifyError`s rather
/// than silently skipped, since a typo here would otherwise make the
/// harness quietly stop checking something.
pub fn parse_expectations(source: &str) -> Result<Vec<Expectation>, VerifyError> {
    let mut expectations = Vec::new();
    for (zero_based_line, text) in source.lines().enumerate() {
        let line = zero_based_line + 1;
        let Some(m) = pattern().find(text) else { continue };
        let selector_name = &pattern().captures(text).unwrap()[1];
        let after_selector = &text[m.end()..];

        let open = after_selector
            .find("{{")
            .ok_or(VerifyError::MissingPayload { line })?;
        let close = after_selector[open..]
            .find("}}")
            .ok_or(VerifyError::UnterminatedPayload { line })?;
        let payload = after_selector[open + 2..open + close].trim().to_string();

        let selector = parse_selector(selector_name)
            .ok_or_else(|| VerifyError::UnknownSelector { line, selector: selector_name.to_string() })?;

        expectations.push(Expectation { line, selector, payload });
    }
    Ok(expectations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_a_scoped_expectation() {
        let source = "// expected-cascading-member {{main.Base.init}}\n";
        let parsed = parse_expectations(source).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].selector, Selector::Scoped(ObligationKind::Member, Scope::Cascading));
        assert_eq!(parsed[0].payload, "main.Base.init");
        assert_eq!(parsed[0].line, 1);
    }

    #[test]
    fn provides_payload_splits_on_commas() {
        let source = "// expected-provides {{Base, BaseProtocol, PublicProtocol, Subclass}}\n";
        let parsed = parse_expectations(source).unwrap();
        assert_eq!(parsed[0].keys(), vec!["Base", "BaseProtocol", "PublicProtocol", "Subclass"]);
    }

    #[test]
    fn unknown_selector_is_an_error() {
        let source = "// expected-nonsense {{x}}\n";
        assert_eq!(
            parse_expectations(source),
            Err(VerifyError::UnknownSelector { line: 1, selector: "nonsense".to_string() })
        );
    }

    #[test]
    fn missing_payload_is_an_error() {
        let source = "// expected-provides no braces here\n";
        assert_eq!(parse_expectations(source), Err(VerifyError::MissingPayload { line: 1 }));
    }

    #[test]
    fn unterminated_payload_is_an_error() {
        let source = "// expected-provides {{oops\n";
        assert_eq!(parse_expectations(source), Err(VerifyError::UnterminatedPayload { line: 1 }));
    }

    #[test]
    fn lines_without_expectations_are_ignored() {
        let source = "let x = 1\nfunc f() {}\n";
        assert_eq!(parse_expectations(source).unwrap(), vec![]);
    }

    #[test]
    fn scope_cascades_flag_matches_selector_name() {
        assert!(Scope::Cascading.cascades());
        assert!(!Scope::Private.cascades());
    }

    #[test]
    fn a_word_merely_containing_expected_is_not_mistaken_for_a_selector() {
        let source = "// this dependency was unexpected-ly removed\n";
        assert_eq!(parse_expectations(source).unwrap(), vec![]);
    }

    proptest! {
        #[test]
        fn parsing_arbitrary_text_never_panics(text in ".{0,200}") {
            let _ = parse_expectations(&text);
        }

        #[test]
        fn a_well_formed_comment_around_arbitrary_payload_always_parses(
            payload in "[a-zA-Z0-9_., ]{0,40}",
        ) {
            let source = format!("// expected-provides {{{{{payload}}}}}\n");
            let parsed = parse_expectations(&source).unwrap();
            prop_assert_eq!(parsed.len(), 1);
            prop_assert_eq!(parsed[0].payload.as_str(), payload.trim());
        }
    }
}
