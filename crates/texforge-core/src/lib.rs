//! # texforge Core
//!
//! Content model and dependency resolution for generated LaTeX sources.
//!
//! ## Overview
//!
//! A document is assembled from a tree of [`Content`](content::Content) nodes. Every
//! node declares the [`Package`](unit::Package)s and [`Command`](unit::Command)s it
//! needs, and those units may in turn carry setup code that needs further units.
//! The [`resolve`] module walks the whole graph, deduplicates units by structural
//! identity, rejects cycles and orders everything deterministically so that the
//! generated preamble is byte-for-byte stable.
//!
//! ## Modules
//!
//! - [`unit`] - Package and command declarations (the dependency units)
//! - [`content`] - Content node trait and the basic node kinds
//! - [`resolve`] - Transitive closure, depth computation and ordering
//! - [`document`] - Preamble and full source rendering
//! - [`file`] - Files placed into a project (plain, binary, generated)
//! - [`catalog`] - Ready-made packages and commands
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use texforge_core::catalog::cmd;
//! use texforge_core::content::{BasicContent, ContentExt, ContentRef};
//!
//! let content: ContentRef = Arc::new(
//!     BasicContent::new(r"\TODO[check]").with_commands([cmd::TODO.clone()]),
//! );
//! let doc = content.as_standalone("main.tex");
//! let source = doc.get_content().unwrap();
//! assert!(source.contains(r"\usepackage{xcolor}"));
//! assert!(source.contains("% Command: TODO"));
//! ```

pub mod catalog;
pub mod content;
pub mod document;
pub mod error;
pub mod file;
pub mod resolve;
pub mod text;
pub mod unit;

pub use content::{
    BasicContent, Content, ContentExt, ContentRef, INDENT_STEP, Indent, InputContent,
    MultiContent, WrapContent,
};
pub use document::{Document, DocumentConfig};
pub use error::{CoreError, Result};
pub use file::{BinaryFile, FileContents, FileRef, InputFile, PlainTextFile, ProjectFile};
pub use resolve::{NameConflict, Resolution, Resolver};
pub use unit::{Command, DependencyUnit, Package, Setup, SortKey, UnitKey, UnitKind};
