//! Files placed into a project.

use crate::content::{ContentExt, ContentRef, Indent};
use crate::error::Result;
use crate::text::prefix_lines;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Attribution block at the top of every generated LaTeX file.
pub const GENERATED_HEADER: &str = concat!(
    "% This file was automatically generated by texforge.\n",
    "% ",
    env!("CARGO_PKG_REPOSITORY"),
    "\n%\n"
);

pub fn generated(body: &str) -> String {
    format!("{GENERATED_HEADER}{body}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContents {
    pub fn is_text(&self) -> bool {
        matches!(self, FileContents::Text(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContents::Text(text) => text.as_bytes(),
            FileContents::Binary(data) => data,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileContents::Text(text) => text.into_bytes(),
            FileContents::Binary(data) => data,
        }
    }

    /// Hex-encoded SHA-256 of the bytes.
    pub fn fingerprint(&self) -> String {
        fingerprint(self.as_bytes())
    }
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A file with a fixed location inside a project.
pub trait ProjectFile: fmt::Debug + Send + Sync {
    /// Project-root-relative, slash separated.
    fn path(&self) -> &str;

    fn contents(&self) -> Result<FileContents>;

    /// Files that must be placed alongside this one.
    fn required_files(&self) -> Vec<FileRef> {
        Vec::new()
    }
}

pub type FileRef = Arc<dyn ProjectFile>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTextFile {
    path: String,
    text: String,
}

impl PlainTextFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Reads the text from a file on disk.
    pub fn from_disk(path: impl Into<String>, source: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(source)?;
        Ok(Self::new(path, text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl ProjectFile for PlainTextFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn contents(&self) -> Result<FileContents> {
        Ok(FileContents::Text(self.text.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    path: String,
    data: Vec<u8>,
}

impl BinaryFile {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    pub fn from_disk(path: impl Into<String>, source: &Path) -> Result<Self> {
        let data = std::fs::read(source)?;
        Ok(Self::new(path, data))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ProjectFile for BinaryFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn contents(&self) -> Result<FileContents> {
        Ok(FileContents::Binary(self.data.clone()))
    }
}

/// The generated body file behind an `\input` directive.
///
/// It holds only the body of its content. The preamble the content would
/// need is written above it as comments for whoever reads the file.
#[derive(Debug, Clone)]
pub struct InputFile {
    path: String,
    content: ContentRef,
}

impl InputFile {
    pub fn new(path: impl Into<String>, content: ContentRef) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }

    pub fn get_content(&self) -> Result<String> {
        let preamble = self.content.as_standalone(self.path.clone()).get_preamble()?;
        let mut out = prefix_lines("% ", &preamble);
        out.push_str("\n%\n");
        out.push_str(&self.content.latex_code_body(Indent::default()));
        out.push('\n');
        Ok(out)
    }
}

impl ProjectFile for InputFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn contents(&self) -> Result<FileContents> {
        Ok(FileContents::Text(generated(&self.get_content()?)))
    }

    fn required_files(&self) -> Vec<FileRef> {
        self.content.required_files()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BasicContent;
    use crate::unit::Package;

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = FileContents::Text("hello".to_string());
        let b = FileContents::Binary(b"hello".to_vec());
        let c = FileContents::Text("other".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert!(a.is_text());
        assert!(!b.is_text());
    }

    #[test]
    fn test_input_file_lists_preamble_as_comments() {
        let content: ContentRef = Arc::new(
            BasicContent::new(r"\textcolor{red}{x}").with_packages([Package::new("xcolor")]),
        );
        let file = InputFile::new("part.tex", content);
        assert_eq!(
            file.get_content().unwrap(),
            "% \\usepackage{xcolor}\n%\n\\textcolor{red}{x}\n"
        );

        let FileContents::Text(text) = file.contents().unwrap() else {
            panic!("input files are text");
        };
        assert!(text.starts_with(GENERATED_HEADER));
    }

    #[test]
    fn test_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("logo.bin");
        std::fs::write(&source, [0x89u8, 0x50, 0x4E, 0x47]).unwrap();

        let file = BinaryFile::from_disk("img/logo.png", &source).unwrap();
        assert_eq!(file.data(), &[0x89, 0x50, 0x4E, 0x47]);
        assert!(PlainTextFile::from_disk("x.txt", &dir.path().join("missing.txt")).is_err());
    }
}
