//! # texforge Build
//!
//! Turns documents from `texforge-core` into files on disk and PDFs.
//!
//! A [`Project`] collects generated and raw files in memory, rejecting two
//! different files at the same path. Compilation copies the tree into a
//! temporary directory and runs the engine there through [`Compiler`]; every
//! external program is launched via the [`CommandExecutor`] seam.
//!
//! ```no_run
//! use std::sync::Arc;
//! use texforge_build::{Compiler, RenderExt};
//! use texforge_core::{BasicContent, ContentRef, DocumentConfig};
//!
//! let content: ContentRef = Arc::new(BasicContent::new(r"$e^{i\pi} = -1$"));
//! let pdf = content.render(DocumentConfig::standalone(), &Compiler::default())?;
//! pdf.save(std::path::Path::new("euler.pdf"))?;
//! # Ok::<(), texforge_build::BuildError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod manifest;
pub mod pdf;
pub mod project;
pub mod render;
pub mod shortcuts;
pub mod tool;
pub mod vfs;

pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use convert::{Converter, Svg, SvgOptions};
pub use diagnostics::{LogDiagnostic, Severity};
pub use error::{BuildError, Result};
pub use manifest::SourceManifest;
pub use pdf::Pdf;
pub use project::{CompiledSource, FileSource, Project};
pub use render::RenderExt;
pub use shortcuts::{render_qcircuit, render_snippet, Padding, QcircuitOptions};
pub use tool::{CommandExecutor, ExternalTool, RealCommandExecutor};
pub use vfs::{FileSystem, MemoryFs, OsFs};
