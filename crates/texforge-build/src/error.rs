use texforge_core::CoreError;
use thiserror::Error;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An API precondition was violated by the caller.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("two different files with the same path: {path}")]
    PathConflict { path: String },

    #[error("{tool} not found")]
    ToolNotFound { tool: String },

    /// The tool exited nonzero. The message is its captured stdout and stderr.
    #[error("{output}")]
    ToolFailure { tool: String, output: String },

    #[error("output file not generated from source file(s): {}", sources.join(", "))]
    MissingArtifacts { sources: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid SVG: {0}")]
    InvalidSvg(String),
}
