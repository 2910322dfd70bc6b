//! Verifier diagnostics: plain structured records, not the compiler's own
//! diagnostic engine, since this crate has no parser/source-manager of its
//! own — only the line number the mismatch is attributed to and a message.

/// A fix-it hint: inserting `text` as its own line, immediately before
/// `before_line` (1-indexed; a value past the last source line appends at
/// end of file), would resolve the diagnostic it is attached to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixIt {
    pub before_line: usize,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
    pub fix_it: Option<FixIt>,
}

/// Sorts diagnostics by source location, breaking ties by message so two
/// runs over the same obligation set always print in the same order
/// regardless of hash-map iteration upstream.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| (a.line, &a.message).cmp(&(b.line, &b.message)));
}

/// Applies every fix-it in `diagnostics` to `source`, inserting each hint's
/// line immediately before its `before_line`. Insertions are applied from
/// the bottom of the file up so earlier line numbers stay valid as later
/// ones are inserted.
pub fn apply_fixits(source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut lines: Vec<String> = source.lines().map(str::to_string).collect();
    let mut fixits: Vec<&FixIt> = diagnostics.iter().filter_map(|d| d.fix_it.as_ref()).collect();
    fixits.sort_by_key(|f| std::cmp::Reverse(f.before_line));

    for fix_it in fixits {
        let at = fix_it.before_line.saturating_sub(1).min(lines.len());
        lines.insert(at, fix_it.text.clone());
    }

    let mut result = lines.join("\n");
    if source.ends_with('\n') {
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_line_then_message() {
        let mut diagnostics = vec![
            Diagnostic { line: 5, message: "b".to_string(), fix_it: None },
            Diagnostic { line: 2, message: "z".to_string(), fix_it: None },
            Diagnostic { line: 2, message: "a".to_string(), fix_it: None },
        ];
        sort_diagnostics(&mut diagnostics);
        assert_eq!(
            diagnostics.iter().map(|d| (d.line, d.message.as_str())).collect::<Vec<_>>(),
            vec![(2, "a"), (2, "z"), (5, "b")]
        );
    }

    #[test]
    fn apply_fixits_inserts_lines_without_shifting_earlier_insertions() {
        let source = "one\ntwo\nthree\n";
        let diagnostics = vec![
            Diagnostic { line: 0, message: "m1".to_string(), fix_it: Some(FixIt { before_line: 2, text: "// A".to_string() }) },
            Diagnostic { line: 0, message: "m2".to_string(), fix_it: Some(FixIt { before_line: 4, text: "// B".to_string() }) },
        ];
        let patched = apply_fixits(source, &diagnostics);
        assert_eq!(patched, "one\n// A\ntwo\nthree\n// B\n");
    }
}
