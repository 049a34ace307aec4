use crate::config::CompilerConfig;
use crate::error::Result;
use crate::tool::{CommandExecutor, ExternalTool};
use std::path::Path;
use std::sync::Arc;

/// A TeX engine invoked as `<engine> [options...] <source>`.
#[derive(Debug, Clone)]
pub struct Compiler {
    tool: ExternalTool,
    options: Vec<String>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::from_config(&CompilerConfig::default())
    }
}

impl Compiler {
    /// `engine` with the default batch-mode options.
    pub fn new(engine: &str) -> Self {
        Self::from_config(&CompilerConfig {
            engine: engine.to_string(),
            ..CompilerConfig::default()
        })
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            tool: ExternalTool::new(config.engine.clone()),
            options: config.args(),
        }
    }

    /// Replaces the option list entirely.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.tool = self.tool.with_executor(executor);
        self
    }

    pub fn engine(&self) -> &str {
        self.tool.program()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_available(&self) -> bool {
        self.tool.is_available()
    }

    /// Compiles `source` (relative to `cwd`) and waits for the engine to exit.
    ///
    /// Success only means the engine exited zero; callers check for the
    /// output file themselves.
    pub fn run(&self, source: &str, cwd: &Path) -> Result<()> {
        let mut args = self.options.clone();
        args.push(source.to_string());
        self.tool.run(&args, cwd)?;
        Ok(())
    }
}
