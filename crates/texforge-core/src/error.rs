use crate::unit::UnitKind;
use thiserror::Error;

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A unit (indirectly) requires itself.
    #[error("cyclic dependency involving {kind} '{name}'")]
    CyclicDependency { kind: UnitKind, name: String },

    /// Two units with the same name cannot be emitted into one preamble.
    #[error("conflicting {kind} declarations named '{name}'")]
    NameConflict { kind: UnitKind, name: String },

    #[error("invalid usage: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
