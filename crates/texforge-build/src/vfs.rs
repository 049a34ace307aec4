//! Filesystems a project can be materialized into.
//!
//! Paths are relative and slash separated (`figures/plot.pdf`). A leading `/`
//! and `.` segments are accepted and dropped; `..` is rejected so nothing can
//! escape the root.

use crate::error::{BuildError, Result};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn normalize_path(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                return Err(BuildError::Usage(format!(
                    "path traversal with '..' is not allowed: {path}"
                )));
            }
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        return Err(BuildError::Usage(format!("not a file path: '{path}'")));
    }
    Ok(parts.join("/"))
}

/// Parent directory of a normalized path, `None` at the root.
fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir)
}

fn not_found(path: &str) -> BuildError {
    BuildError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file: {path}"),
    ))
}

pub trait FileSystem {
    fn create_dir_all(&mut self, path: &str) -> Result<()>;

    /// Writes a file, creating its parent directories.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;

    fn remove(&mut self, path: &str) -> Result<()>;

    /// Every file path, sorted.
    fn files(&self) -> Result<Vec<String>>;

    fn read_to_string(&self, path: &str) -> Result<String> {
        String::from_utf8(self.read(path)?).map_err(|e| {
            BuildError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
        })
    }
}

/// An in-memory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        normalize_path(path).map_or(false, |p| self.dirs.contains(&p))
    }
}

impl FileSystem for MemoryFs {
    fn create_dir_all(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path)?;
        let mut prefix = String::new();
        for part in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            if self.files.contains_key(&prefix) {
                return Err(BuildError::Usage(format!("{prefix} is a file")));
            }
            self.dirs.insert(prefix.clone());
        }
        Ok(())
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize_path(path)?;
        if self.dirs.contains(&path) {
            return Err(BuildError::Usage(format!("{path} is a directory")));
        }
        if let Some(dir) = parent(&path) {
            self.create_dir_all(dir)?;
        }
        self.files.insert(path, data.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_path(path)?;
        self.files.get(&path).cloned().ok_or_else(|| not_found(&path))
    }

    fn exists(&self, path: &str) -> bool {
        normalize_path(path).map_or(false, |p| {
            self.files.contains_key(&p) || self.dirs.contains(&p)
        })
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path)?;
        self.files.remove(&path).map(|_| ()).ok_or_else(|| not_found(&path))
    }

    fn files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}

/// A directory on the real filesystem.
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn full_path(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(normalize_path(path)?))
    }
}

impl FileSystem for OsFs {
    fn create_dir_all(&mut self, path: &str) -> Result<()> {
        std::fs::create_dir_all(self.full_path(path)?)?;
        Ok(())
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.full_path(path)?;
        if let Some(dir) = full.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&full, data)?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.full_path(path)?)?)
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).map_or(false, |p| p.exists())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        std::fs::remove_file(self.full_path(path)?)?;
        Ok(())
    }

    fn files(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(parts.join("/"));
        }
        files.sort();
        Ok(files)
    }
}

/// Copies one file between filesystems.
pub fn copy_file(
    src: &dyn FileSystem,
    src_path: &str,
    dst: &mut dyn FileSystem,
    dst_path: &str,
) -> Result<()> {
    let data = src.read(src_path)?;
    dst.write(dst_path, &data)
}

/// Copies every file of `src` into `dst`, keeping relative paths.
pub fn copy_dir(src: &dyn FileSystem, dst: &mut dyn FileSystem) -> Result<()> {
    let files = src.files()?;
    debug!("copying {} files", files.len());
    for path in files {
        copy_file(src, &path, dst, &path)?;
    }
    Ok(())
}
