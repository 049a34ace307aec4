use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Batch mode, stop at the first error, `file:line:` error messages.
pub const DEFAULT_OPTIONS: [&str; 4] = [
    "-halt-on-error",
    "-file-line-error",
    "-interaction",
    "nonstopmode",
];

pub const SHELL_ESCAPE: &str = "-shell-escape";

/// Persisted compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub engine: String,
    pub options: Vec<String>,
    pub shell_escape: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            engine: "pdflatex".to_string(),
            options: DEFAULT_OPTIONS.iter().map(|s| s.to_string()).collect(),
            shell_escape: false,
        }
    }
}

impl CompilerConfig {
    /// The options passed before the source file.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.options.clone();
        if self.shell_escape && !args.iter().any(|a| a == SHELL_ESCAPE) {
            args.push(SHELL_ESCAPE.to_string());
        }
        args
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}
