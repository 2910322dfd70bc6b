//! The dependency verifier: a property-testing harness that matches
//! compiler-emitted dependency edges (recorded in a
//! `ReferencedNameTracker`) against developer-declared expectations
//! embedded as comments in the same source file. Used to guarantee
//! fine-grained graph correctness across refactors; it observes a single
//! file's tracker and does not itself participate in incremental builds.

pub mod diagnostic;
pub mod error;
pub mod expectation;
pub mod obligation;
pub mod verifier;

pub use diagnostic::{Diagnostic, FixIt};
pub use error::VerifyError;
pub use expectation::{Expectation, ObligationKind, Scope, Selector};
pub use obligation::{Obligation, ObligationState};
pub use verifier::{apply_fixits, verify, VerifyReport};
