//! Error kinds for the verifier. A dependency-graph mismatch is reported as
//! an ordinary diagnostic; this type is reserved for malformed expectation
//! comment syntax, which is a bug in the test source itself rather than a
//! dependency-graph mismatch.

use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// `expected-<selector>` named something outside the exhaustive matrix
    /// of allowed combinations.
    UnknownSelector { line: usize, selector: String },
    /// An `expected-` comment was missing its `{{...}}` payload.
    MissingPayload { line: usize },
    /// A `{{...}}` payload was opened but never closed on the same line.
    UnterminatedPayload { line: usize },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::UnknownSelector { line, selector } => {
                write!(f, "{line}: unknown expectation selector 'expected-{selector}'")
            }
            VerifyError::MissingPayload { line } => {
                write!(f, "{line}: expectation comment is missing its {{{{...}}}} payload")
            }
            VerifyError::UnterminatedPayload { line } => {
                write!(f, "{line}: expectation comment's {{{{...}}}} payload is never closed")
            }
        }
    }
}

impl std::error::Error for VerifyError {}
