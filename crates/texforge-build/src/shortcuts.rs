//! One-call rendering of small snippets.

use crate::compiler::Compiler;
use crate::error::Result;
use crate::pdf::Pdf;
use crate::project::Project;
use std::sync::Arc;
use texforge_core::catalog::pkg;
use texforge_core::{BasicContent, Command, ContentExt, ContentRef, Document, DocumentConfig, Package};

/// Space around a standalone page, as TeX lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Padding {
    pub left: String,
    pub bottom: String,
    pub right: String,
    pub top: String,
}

impl Padding {
    pub fn new(
        left: impl Into<String>,
        bottom: impl Into<String>,
        right: impl Into<String>,
        top: impl Into<String>,
    ) -> Self {
        Self {
            left: left.into(),
            bottom: bottom.into(),
            right: right.into(),
            top: top.into(),
        }
    }

    pub fn uniform(length: impl Into<String>) -> Self {
        let length = length.into();
        Self::new(length.clone(), length.clone(), length.clone(), length)
    }

    /// The same padding on every side, in points.
    pub fn points(pt: f64) -> Self {
        Self::uniform(format!("{pt}pt"))
    }

    /// The `standalone` class option, `border={l b r t}`.
    pub fn border_option(&self) -> String {
        format!(
            "border={{{} {} {} {}}}",
            self.left, self.bottom, self.right, self.top
        )
    }
}

/// The document [`render_snippet`] compiles.
///
/// Padding only applies to `standalone` documents that do not already set a
/// border.
pub fn snippet_document(
    code: &str,
    packages: Vec<Package>,
    commands: Vec<Command>,
    padding: Option<&Padding>,
    mut config: DocumentConfig,
) -> Document {
    if let Some(padding) = padding {
        let has_border = config.options.iter().any(|o| o.starts_with("border="));
        if config.doc_type == "standalone" && !has_border {
            config.options.push(padding.border_option());
        }
    }
    let content: ContentRef = Arc::new(
        BasicContent::new(code)
            .with_packages(packages)
            .with_commands(commands),
    );
    content.as_document("main.tex", config)
}

/// Compiles a snippet of LaTeX on its own page.
pub fn render_snippet(
    code: &str,
    packages: Vec<Package>,
    commands: Vec<Command>,
    padding: Option<&Padding>,
    config: DocumentConfig,
    compiler: &Compiler,
) -> Result<Pdf> {
    let document = snippet_document(code, packages, commands, padding, config);
    Project::from_document(document)?.compile_pdf("main.tex", compiler)
}

/// Layout of a `\Qcircuit` diagram.
#[derive(Debug, Clone)]
pub struct QcircuitOptions {
    /// Row spacing, `@R`.
    pub row_sep: String,
    /// Column spacing, `@C`.
    pub col_sep: String,
    pub const_size: bool,
    pub const_row: bool,
    pub const_col: bool,
    pub padding: Padding,
    pub packages: Vec<Package>,
    pub commands: Vec<Command>,
    pub config: DocumentConfig,
}

impl Default for QcircuitOptions {
    fn default() -> Self {
        Self {
            row_sep: "0.5em".to_string(),
            col_sep: "0.7em".to_string(),
            const_size: false,
            const_row: false,
            const_col: false,
            padding: Padding::points(1.0),
            packages: Vec::new(),
            commands: Vec::new(),
            config: DocumentConfig::standalone(),
        }
    }
}

/// Wraps circuit rows in a `\Qcircuit` environment.
pub fn qcircuit_code(code: &str, options: &QcircuitOptions) -> String {
    let mut layout = format!("@R={} @C={}", options.row_sep, options.col_sep);
    if options.const_row {
        layout.push_str(" @!R");
    }
    if options.const_col {
        layout.push_str(" @!C");
    }
    if options.const_size {
        layout.push_str(" @!");
    }
    format!("\\Qcircuit {layout} {{\n{}\n}}", code.trim())
}

pub fn qcircuit_document(code: &str, options: &QcircuitOptions) -> Document {
    let mut packages = vec![pkg::QCIRCUIT.clone()];
    packages.extend(options.packages.iter().cloned());
    snippet_document(
        &qcircuit_code(code, options),
        packages,
        options.commands.clone(),
        Some(&options.padding),
        options.config.clone(),
    )
}

/// Compiles a quantum circuit drawn with `qcircuit`.
pub fn render_qcircuit(code: &str, options: &QcircuitOptions, compiler: &Compiler) -> Result<Pdf> {
    Project::from_document(qcircuit_document(code, options))?.compile_pdf("main.tex", compiler)
}
