//! The output file map: per source file, where its build outputs land.
//! Read from a JSON document given via `-output-file-map <path>`, the same
//! way `rustc`'s session config reads its own JSON-shaped inputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PersistError;

/// The three outputs the driver cares about for one source file. `object`
/// and `interface_module` are opaque to this crate — they are produced and
/// consumed by collaborators this crate does not implement — but the map
/// still carries them so a single JSON document describes a whole build.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileOutputs {
    pub object: PathBuf,
    #[serde(rename = "swift-module", alias = "interface-module")]
    pub interface_module: PathBuf,
    #[serde(rename = "swift-dependencies", alias = "dependency-artifact")]
    pub dependency_artifact: PathBuf,
}

/// Keyed by canonical source path. A `BTreeMap` keeps serialization
/// deterministic, which matters for build-log diffing even though this
/// format carries no fingerprints of its own.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct OutputFileMap {
    #[serde(flatten)]
    entries: BTreeMap<String, FileOutputs>,
}

impl OutputFileMap {
    pub fn new() -> Self {
        OutputFileMap { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, canonical_path: impl Into<String>, outputs: FileOutputs) {
        self.entries.insert(canonical_path.into(), outputs);
    }

    pub fn get(&self, canonical_path: &str) -> Option<&FileOutputs> {
        self.entries.get(canonical_path)
    }

    pub fn dependency_artifact_path(&self, canonical_path: &str) -> Option<&Path> {
        self.entries.get(canonical_path).map(|o| o.dependency_artifact.as_path())
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let text = fs::read_to_string(path).map_err(|source| PersistError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text).map_err(|e| PersistError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| PersistError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(path, text).map_err(|source| PersistError::Io { path: path.to_path_buf(), source })
    }
}
