//! A small JSON sidecar recording each input file's content hash as of the
//! last successful build. An input is classified as locally invalidated by
//! comparing its current content hash against the prior build's; the
//! per-file dependency artifact carries an interface hash, not a content
//! hash, so this is the bookkeeping the driver binary needs on top of it.
//! Same JSON-via-`serde_json` shape as `OutputFileMap`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use fgdep_data_structures::fx::FxHashMap;
use fgdep_incremental::PersistError;
use fgdep_paths::Identifier;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContentHashCache {
    by_file: BTreeMap<String, u64>,
}

impl ContentHashCache {
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| PersistError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(path, text).map_err(|source| PersistError::Io { path: path.to_path_buf(), source })
    }

    pub fn as_map(&self) -> FxHashMap<Identifier, u64> {
        self.by_file.iter().map(|(file, &hash)| (Identifier::intern(file), hash)).collect()
    }

    pub fn record(&mut self, file: &str, hash: u64) {
        self.by_file.insert(file.to_string(), hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content-hashes.json");

        let mut cache = ContentHashCache::default();
        cache.record("a.swift", 42);
        cache.save(&path).unwrap();

        let loaded = ContentHashCache::load(&path);
        assert_eq!(loaded.as_map().get(&Identifier::intern("a.swift")), Some(&42));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let cache = ContentHashCache::load(Path::new("/nonexistent/path/content-hashes.json"));
        assert!(cache.as_map().is_empty());
    }
}
