//! A self-contained source tree and its compilation.
//!
//! Files are written into an in-memory [`MemoryFs`] as they are added. Only
//! compilation touches the real filesystem: the tree is copied into a fresh
//! temporary directory, the engine runs there, and the directory is removed
//! when the call returns, whether it succeeded or not.

use crate::compiler::Compiler;
use crate::error::{BuildError, Result};
use crate::pdf::Pdf;
use crate::vfs::{copy_dir, copy_file, normalize_path, FileSystem, MemoryFs, OsFs};
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use texforge_core::file::fingerprint;
use texforge_core::{FileContents, FileRef};

/// Raw content for [`Project::add_source`].
pub enum FileSource {
    Text(String),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read>),
    /// A file on disk, read at add time.
    Path(PathBuf),
}

impl FileSource {
    fn into_bytes(self) -> Result<Vec<u8>> {
        Ok(match self {
            FileSource::Text(text) => text.into_bytes(),
            FileSource::Bytes(data) => data,
            FileSource::Reader(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                data
            }
            FileSource::Path(path) => std::fs::read(path)?,
        })
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileSource::Text(text) => f.debug_tuple("Text").field(text).finish(),
            FileSource::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            FileSource::Reader(_) => f.write_str("Reader"),
            FileSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Where one compiled source's outputs ended up, relative to the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSource {
    pub source: String,
    pub pdf: Option<String>,
    pub log: Option<String>,
}

/// `main.tex` -> `main.pdf`, `notes` -> `notes.pdf`.
pub fn output_path(source: &str, extension: &str) -> String {
    let (dir, name) = match source.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, source),
    };
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    match dir {
        Some(dir) => format!("{dir}/{stem}.{extension}"),
        None => format!("{stem}.{extension}"),
    }
}

#[derive(Debug, Default)]
pub struct Project {
    fs: MemoryFs,
    /// Path -> fingerprint of what was written there.
    entries: BTreeMap<String, String>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file and, before it, every file it requires.
    ///
    /// Adding content identical to what is already at the path is a no-op.
    /// Different content at an occupied path fails with
    /// [`BuildError::PathConflict`]. The whole closure is checked before
    /// anything is written, so a failed add leaves the project unchanged.
    pub fn add_file(&mut self, file: FileRef) -> Result<()> {
        let mut staged = Vec::new();
        self.stage(file, &mut staged, &mut BTreeMap::new(), &mut HashSet::new())?;

        let mut written: Vec<String> = Vec::new();
        for (path, contents) in staged {
            if let Err(err) = self.fs.write(&path, contents.as_bytes()) {
                for path in written {
                    self.fs.remove(&path)?;
                    self.entries.remove(&path);
                }
                return Err(err);
            }
            self.entries.insert(path.clone(), contents.fingerprint());
            written.push(path);
        }
        Ok(())
    }

    /// Collects `file` and its requirements in write order, dependencies
    /// first, checking every path against the project and the other files.
    fn stage(
        &self,
        file: FileRef,
        staged: &mut Vec<(String, FileContents)>,
        claims: &mut BTreeMap<String, String>,
        visited: &mut HashSet<usize>,
    ) -> Result<()> {
        if !visited.insert(Arc::as_ptr(&file) as *const () as usize) {
            return Ok(());
        }
        let path = normalize_path(file.path())?;
        let contents = file.contents()?;
        let hash = contents.fingerprint();
        match self.entries.get(&path).or_else(|| claims.get(&path)) {
            Some(existing) if *existing == hash => {
                debug!("{path} already added");
                return Ok(());
            }
            Some(_) => return Err(BuildError::PathConflict { path }),
            None => {}
        }
        claims.insert(path.clone(), hash);
        for required in file.required_files() {
            self.stage(required, staged, claims, visited)?;
        }
        staged.push((path, contents));
        Ok(())
    }

    /// Adds raw content at `path`, with the same conflict rules as [`Project::add_file`].
    pub fn add_source(&mut self, path: &str, source: FileSource) -> Result<()> {
        let path = normalize_path(path)?;
        let data = source.into_bytes()?;
        let hash = fingerprint(&data);
        if self.claim(&path, &hash)? {
            return Ok(());
        }
        let result = self.fs.write(&path, &data);
        if result.is_err() {
            self.entries.remove(&path);
        }
        result
    }

    /// Reserves `path` for content with `hash`. Returns true if that exact
    /// content is already there.
    fn claim(&mut self, path: &str, hash: &str) -> Result<bool> {
        match self.entries.get(path) {
            Some(existing) if existing == hash => {
                debug!("{path} already added");
                Ok(true)
            }
            Some(_) => Err(BuildError::PathConflict {
                path: path.to_string(),
            }),
            None => {
                self.entries.insert(path.to_string(), hash.to_string());
                Ok(false)
            }
        }
    }

    /// Imports every file below `dir` on disk.
    pub fn add_dir(&mut self, dir: &Path) -> Result<()> {
        let disk = OsFs::new(dir);
        for path in disk.files()? {
            let data = disk.read(&path)?;
            self.add_source(&path, FileSource::Bytes(data))?;
        }
        Ok(())
    }

    pub fn fs(&self) -> &MemoryFs {
        &self.fs
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        normalize_path(path).map_or(false, |p| self.entries.contains_key(&p))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.read(path)
    }

    /// Copies the whole tree into `dst`.
    pub fn write_src(&self, dst: &mut dyn FileSystem) -> Result<()> {
        copy_dir(&self.fs, dst)
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        self.write_src(&mut OsFs::new(dir))
    }

    /// Writes the tree into `dir` and compiles each source there in turn.
    ///
    /// All sources share the directory, so auxiliary files from one run are
    /// visible to the next. Missing outputs are reported as `None`, not as
    /// errors; engine failures abort the batch.
    pub fn compile_in_dir(
        &self,
        dir: &Path,
        sources: &[&str],
        compiler: &Compiler,
    ) -> Result<Vec<CompiledSource>> {
        self.write_to_dir(dir)?;
        let built = OsFs::new(dir);
        let mut compiled = Vec::with_capacity(sources.len());
        for source in sources {
            let source = normalize_path(source)?;
            compiler.run(&source, dir)?;
            let pdf = output_path(&source, "pdf");
            let log = output_path(&source, "log");
            compiled.push(CompiledSource {
                pdf: built.exists(&pdf).then_some(pdf),
                log: built.exists(&log).then_some(log),
                source,
            });
        }
        Ok(compiled)
    }

    pub fn compile_pdf(&self, source: &str, compiler: &Compiler) -> Result<Pdf> {
        self.compile_pdf_batch(&[source], compiler)?
            .pop()
            .ok_or_else(|| BuildError::Usage("no source to compile".to_string()))
    }

    /// Compiles in a temporary directory and reads back each PDF and log.
    pub fn compile_pdf_batch(&self, sources: &[&str], compiler: &Compiler) -> Result<Vec<Pdf>> {
        let tmp = tempfile::tempdir()?;
        let built = OsFs::new(tmp.path());
        self.compile_in_dir(tmp.path(), sources, compiler)?
            .into_iter()
            .map(|out| {
                let data = out.pdf.as_deref().map(|p| built.read(p)).transpose()?;
                let log = out
                    .log
                    .as_deref()
                    .map(|p| built.read(p))
                    .transpose()?
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
                Ok(Pdf::new(data, log))
            })
            .collect()
    }

    pub fn save_pdf(&self, source: &str, compiler: &Compiler, dst: &mut dyn FileSystem) -> Result<()> {
        self.save_pdf_batch(&[source], compiler, dst)
    }

    /// Compiles and copies each PDF into `dst` under its build-relative path.
    ///
    /// Every produced PDF is copied before failing; the error then names all
    /// sources that produced nothing.
    pub fn save_pdf_batch(
        &self,
        sources: &[&str],
        compiler: &Compiler,
        dst: &mut dyn FileSystem,
    ) -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let built = OsFs::new(tmp.path());
        let mut missing = Vec::new();
        for out in self.compile_in_dir(tmp.path(), sources, compiler)? {
            match out.pdf {
                Some(pdf) => copy_file(&built, &pdf, dst, &pdf)?,
                None => {
                    warn!("no output generated from source file {}", out.source);
                    missing.push(out.source);
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BuildError::MissingArtifacts { sources: missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::testing::MockCommandExecutor;
    use std::sync::Arc;
    use texforge_core::{BinaryFile, PlainTextFile};

    fn mock_compiler(files: &[(&str, &[u8])]) -> (Compiler, Arc<MockCommandExecutor>) {
        let mock = Arc::new(MockCommandExecutor::producing(files));
        (Compiler::default().with_executor(mock.clone()), mock)
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("main.tex", "pdf"), "main.pdf");
        assert_eq!(output_path("notes", "pdf"), "notes.pdf");
        assert_eq!(output_path("ch/one.v2.tex", "log"), "ch/one.v2.log");
        assert_eq!(output_path("dir.d/file", "pdf"), "dir.d/file.pdf");
    }

    #[test]
    fn test_conflicting_add_keeps_first_content() {
        let mut project = Project::new();
        project
            .add_file(Arc::new(PlainTextFile::new("a.txt", "first")))
            .unwrap();
        let err = project
            .add_file(Arc::new(PlainTextFile::new("a.txt", "second")))
            .unwrap_err();
        assert!(matches!(err, BuildError::PathConflict { ref path } if path == "a.txt"));
        assert_eq!(project.read("a.txt").unwrap(), b"first");
    }

    #[test]
    fn test_identical_add_is_noop() {
        let mut project = Project::new();
        let file: FileRef = Arc::new(BinaryFile::new("img/logo.png", vec![1, 2, 3]));
        project.add_file(file.clone()).unwrap();
        let before = project.fs().clone();
        project.add_file(file).unwrap();
        project
            .add_source("/img/logo.png", FileSource::Bytes(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(project.fs(), &before);
        assert_eq!(project.paths().collect::<Vec<_>>(), ["img/logo.png"]);
    }

    #[test]
    fn test_failed_add_leaves_project_unchanged() {
        use texforge_core::{BasicContent, ContentExt, ContentRef, DocumentConfig, InputContent, MultiContent};

        let input = |path: &str, body: &str| -> ContentRef {
            Arc::new(InputContent::new(path, Arc::new(BasicContent::new(body)) as ContentRef))
        };
        let mut project = Project::new();
        project.add_source("b.tex", FileSource::Text("raw".into())).unwrap();
        let before = project.fs().clone();

        let content: ContentRef = Arc::new(MultiContent::new([input("a.tex", "a"), input("b.tex", "b")]));
        let err = project
            .add_file(Arc::new(content.as_document("main.tex", DocumentConfig::default())))
            .unwrap_err();
        assert!(matches!(err, BuildError::PathConflict { ref path } if path == "b.tex"));
        assert_eq!(project.fs(), &before);
        assert_eq!(project.paths().collect::<Vec<_>>(), ["b.tex"]);
    }

    #[test]
    fn test_sources() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("data.csv");
        std::fs::write(&on_disk, "x,y\n").unwrap();

        let mut project = Project::new();
        project.add_source("t.txt", FileSource::Text("t".into())).unwrap();
        project
            .add_source("r.txt", FileSource::Reader(Box::new(&b"reader"[..])))
            .unwrap();
        project.add_source("data/data.csv", FileSource::Path(on_disk)).unwrap();
        assert_eq!(project.read("r.txt").unwrap(), b"reader");
        assert_eq!(project.read("data/data.csv").unwrap(), b"x,y\n");
        assert!(matches!(
            project.add_source("../escape.txt", FileSource::Text(String::new())),
            Err(BuildError::Usage(_))
        ));
        assert!(matches!(
            project.add_source("missing.txt", FileSource::Path(dir.path().join("nope"))),
            Err(BuildError::Io(_))
        ));
        assert!(!project.contains("missing.txt"));
    }

    #[test]
    fn test_compile_reads_back_artifacts() {
        let (compiler, mock) = mock_compiler(&[("main.pdf", b"%PDF-1.5"), ("main.log", b"log text")]);
        let mut project = Project::new();
        project.add_source("main.tex", FileSource::Text("x".into())).unwrap();

        let pdf = project.compile_pdf("main.tex", &compiler).unwrap();
        assert_eq!(pdf.data(), Some(&b"%PDF-1.5"[..]));
        assert_eq!(pdf.log(), Some("log text"));
        assert_eq!(mock.calls()[0].1.last().map(String::as_str), Some("main.tex"));
    }

    #[test]
    fn test_compile_without_output_is_not_an_error() {
        let (compiler, _) = mock_compiler(&[]);
        let mut project = Project::new();
        project.add_source("main.tex", FileSource::Text("x".into())).unwrap();
        let pdf = project.compile_pdf("main.tex", &compiler).unwrap();
        assert!(!pdf.is_produced());
        assert!(pdf.log().is_none());
    }

    #[test]
    fn test_save_batch_collects_missing_sources() {
        // The mock only ever writes a.pdf.
        let (compiler, mock) = mock_compiler(&[("a.pdf", b"%PDF")]);
        let mut project = Project::new();
        project.add_source("a.tex", FileSource::Text("a".into())).unwrap();
        project.add_source("b.tex", FileSource::Text("b".into())).unwrap();
        project.add_source("c.tex", FileSource::Text("c".into())).unwrap();

        let mut out = MemoryFs::new();
        let err = project
            .save_pdf_batch(&["b.tex", "a.tex", "c.tex"], &compiler, &mut out)
            .unwrap_err();
        match err {
            BuildError::MissingArtifacts { sources } => assert_eq!(sources, ["b.tex", "c.tex"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(out.read("a.pdf").unwrap(), b"%PDF");
        assert_eq!(mock.calls().len(), 3);
    }

    #[test]
    fn test_engine_failure_aborts() {
        let mock = Arc::new(MockCommandExecutor {
            stderr: "fatal".to_string(),
            status_code: 1,
            ..MockCommandExecutor::default()
        });
        let compiler = Compiler::default().with_executor(mock);
        let mut project = Project::new();
        project.add_source("main.tex", FileSource::Text("x".into())).unwrap();
        let err = project.compile_pdf("main.tex", &compiler).unwrap_err();
        assert_eq!(err.to_string(), "fatal");
    }
}
