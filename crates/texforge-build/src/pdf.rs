use crate::diagnostics::{parse_log, LogDiagnostic, Severity};
use crate::error::{BuildError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};

/// The outcome of compiling one source file.
///
/// Either part may be missing: an engine can exit zero without writing a PDF,
/// and a launch failure leaves no log behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdf {
    data: Option<Vec<u8>>,
    log: Option<String>,
    path: Option<PathBuf>,
    width: String,
    height: String,
    border: bool,
}

impl Pdf {
    pub fn new(data: Option<Vec<u8>>, log: Option<String>) -> Self {
        Self {
            data,
            log,
            path: None,
            width: "100%".to_string(),
            height: "300px".to_string(),
            border: false,
        }
    }

    /// Loads an existing PDF from disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = std::fs::read(&path)?;
        let mut pdf = Self::new(Some(data), None);
        pdf.path = Some(path);
        Ok(pdf)
    }

    /// Preview frame size, as CSS lengths.
    pub fn with_size(mut self, width: impl Into<String>, height: impl Into<String>) -> Self {
        self.width = width.into();
        self.height = height.into();
        self
    }

    pub fn with_border(mut self, border: bool) -> Self {
        self.border = border;
        self
    }

    pub fn is_produced(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn log(&self) -> Option<&str> {
        self.log.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| BuildError::Usage("no PDF was produced".to_string()))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    /// An `<iframe>` showing the document, inlined as a base64 data URI.
    pub fn to_html(&self) -> String {
        let src = match (&self.data, &self.path) {
            (Some(data), _) => format!("data:application/pdf;base64,{}", STANDARD.encode(data)),
            (None, Some(path)) => path.display().to_string(),
            (None, None) => String::new(),
        };
        let frame_border = if self.border { "" } else { " frameBorder=\"0\"" };
        format!(
            "<iframe src=\"{src}\"{frame_border}\n        width=\"{}\" height=\"{}\">\n    No iframe support.\n</iframe>",
            self.width, self.height
        )
    }

    /// Errors and warnings found in the log.
    pub fn diagnostics(&self) -> Vec<LogDiagnostic> {
        self.log.as_deref().map(parse_log).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<LogDiagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }
}
