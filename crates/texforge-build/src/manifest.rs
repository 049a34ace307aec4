use crate::error::Result;
use crate::vfs::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use texforge_core::file::fingerprint;

/// SHA-256 fingerprint of every file in a source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    pub version: String,
    pub entries: BTreeMap<String, String>, // path -> sha256 hash
}

impl Default for SourceManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceManifest {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            entries: BTreeMap::new(),
        }
    }

    pub fn from_fs(fs: &dyn FileSystem) -> Result<Self> {
        let mut manifest = Self::new();
        for path in fs.files()? {
            let hash = fingerprint(&fs.read(&path)?);
            manifest.entries.insert(path, hash);
        }
        Ok(manifest)
    }

    /// Paths whose content differs from the manifest, or that exist on only one side.
    pub fn mismatches(&self, fs: &dyn FileSystem) -> Result<Vec<String>> {
        let other = Self::from_fs(fs)?;
        let mut paths: Vec<String> = self
            .entries
            .iter()
            .filter(|(path, hash)| other.entries.get(*path) != Some(*hash))
            .map(|(path, _)| path.clone())
            .collect();
        paths.extend(
            other
                .entries
                .keys()
                .filter(|path| !self.entries.contains_key(*path))
                .cloned(),
        );
        paths.sort();
        Ok(paths)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }
}
