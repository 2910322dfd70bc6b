//! Error kinds for the incremental driver loop. All are reported rather
//! than silently swallowed; none of them panic except a genuine
//! hash-inconsistency bug.

use std::fmt;
use std::path::PathBuf;

pub use fgdep_serialize::opaque::OpaqueDecodeError as DecodeError;

/// Wraps a decode failure or an I/O failure encountered while reading or
/// writing an artifact. A decode error is fatal to the affected load
/// only: the caller treats that one file as missing and falls back to a
/// full rebuild of it.
#[derive(Debug)]
pub enum PersistError {
    Decode { path: PathBuf, source: DecodeError },
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Decode { path, source } => {
                write!(f, "malformed dependency artifact at {}: {}", path.display(), source)
            }
            PersistError::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Decode { source, .. } => Some(source),
            PersistError::Io { source, .. } => Some(source),
        }
    }
}

/// A compile job exited non-zero. The owning file stays dirty; sibling
/// jobs are unaffected.
#[derive(Debug)]
pub struct JobError {
    pub file: String,
    pub message: String,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation of {} failed: {}", self.file, self.message)
    }
}

impl std::error::Error for JobError {}
