//! Full LaTeX source rendering.
//!
//! The preamble is emitted in three phases: package imports, then command
//! setup blocks, then package setup blocks. Setup code may use macros provided
//! by any imported package, and package setup (e.g. `\pgfplotsset`) may rely on
//! commands defined before it.

use crate::content::{ContentRef, Indent};
use crate::error::Result;
use crate::file::{FileContents, FileRef, ProjectFile, generated};
use crate::resolve::{Resolution, Resolver};
use crate::text::{bracket_options, trim_line_ends};
use crate::unit::{Command, DependencyUnit, Package};
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;

/// Document class and forced requirements.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub doc_type: String,
    pub options: Vec<String>,
    pub packages: Vec<Package>,
    pub commands: Vec<Command>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new("article")
    }
}

impl DocumentConfig {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            options: Vec::new(),
            packages: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn standalone() -> Self {
        Self::new("standalone")
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_packages(mut self, packages: impl IntoIterator<Item = Package>) -> Self {
        self.packages.extend(packages);
        self
    }

    pub fn with_commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Renders `\documentclass[options]{doc_type}`.
    pub fn document_class(&self) -> String {
        format!(
            "\\documentclass{}{{{}}}",
            bracket_options(&self.options),
            self.doc_type
        )
    }
}

/// A complete `.tex` file: class, preamble and body.
#[derive(Debug, Clone)]
pub struct Document {
    path: String,
    config: DocumentConfig,
    contents: Vec<ContentRef>,
}

impl Document {
    pub fn new(path: impl Into<String>, config: DocumentConfig, contents: Vec<ContentRef>) -> Self {
        Self {
            path: path.into(),
            config,
            contents,
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn content_nodes(&self) -> &[ContentRef] {
        &self.contents
    }

    pub fn push(&mut self, content: ContentRef) {
        self.contents.push(content);
    }

    /// Resolves configuration and content requirements together.
    pub fn resolve(&self) -> Result<Resolution> {
        let mut resolver = Resolver::new();
        for package in &self.config.packages {
            resolver.add_package(package);
        }
        for command in &self.config.commands {
            resolver.add_command(command);
        }
        for content in &self.contents {
            resolver.add_content(content.as_ref());
        }
        resolver.resolve()
    }

    pub fn sorted_packages(&self) -> Result<Vec<Package>> {
        Ok(self.resolve()?.packages().to_vec())
    }

    pub fn sorted_commands(&self) -> Result<Vec<Command>> {
        Ok(self.resolve()?.commands().to_vec())
    }

    /// Fails on the first unit name that is declared in incompatible ways.
    pub fn check_conflicts(&self) -> Result<()> {
        match self.resolve()?.conflicts().into_iter().next() {
            Some(conflict) => Err(conflict.into()),
            None => Ok(()),
        }
    }

    fn preamble_blocks(resolution: &Resolution) -> [String; 3] {
        let imports = resolution
            .packages()
            .iter()
            .map(Package::latex_code_import)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let command_setup = resolution
            .commands()
            .iter()
            .filter_map(Command::latex_code_setup)
            .collect::<Vec<_>>()
            .join("\n\n");
        let package_setup = resolution
            .packages()
            .iter()
            .filter_map(Package::latex_code_setup)
            .collect::<Vec<_>>()
            .join("\n\n");
        [imports, command_setup, package_setup]
    }

    /// Everything between the class line and `\begin{document}`.
    pub fn get_preamble(&self) -> Result<String> {
        let resolution = self.resolve()?;
        Ok(join_blocks(Self::preamble_blocks(&resolution)))
    }

    /// The full source, ending in a single newline.
    pub fn get_content(&self) -> Result<String> {
        let resolution = self.resolve()?;
        for conflict in resolution.conflicts() {
            warn!(
                "{}: {} declarations of {} '{}' will all be emitted",
                self.path, conflict.declarations, conflict.kind, conflict.name
            );
        }

        let mut blocks = vec![self.config.document_class()];
        blocks.extend(Self::preamble_blocks(&resolution));
        blocks.push(r"\begin{document}".to_string());
        blocks.extend(
            self.contents
                .iter()
                .map(|c| c.latex_code_body(Indent::default())),
        );
        blocks.push(r"\end{document}".to_string());

        let mut out = trim_line_ends(&join_blocks(blocks));
        out.push('\n');
        Ok(out)
    }

    /// Transitive closure of files needed by the content.
    ///
    /// Each file object appears once. Distinct files claiming the same path
    /// are all kept so the project can reject the conflict.
    pub fn required_files(&self) -> Vec<FileRef> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut stack: Vec<FileRef> = self
            .contents
            .iter()
            .flat_map(|c| c.required_files())
            .rev()
            .collect();
        while let Some(file) = stack.pop() {
            if !seen.insert(Arc::as_ptr(&file) as *const () as usize) {
                continue;
            }
            stack.extend(file.required_files().into_iter().rev());
            files.push(file);
        }
        files
    }
}

fn join_blocks(blocks: impl IntoIterator<Item = String>) -> String {
    blocks
        .into_iter()
        .map(|b| b.trim_end().to_string())
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl ProjectFile for Document {
    fn path(&self) -> &str {
        &self.path
    }

    fn contents(&self) -> Result<FileContents> {
        Ok(FileContents::Text(generated(&self.get_content()?)))
    }

    fn required_files(&self) -> Vec<FileRef> {
        Document::required_files(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BasicContent, ContentExt, InputContent};
    use std::sync::Arc;

    #[test]
    fn test_document_class_line() {
        let config = DocumentConfig::new("article").with_options(["11pt", "letterpaper"]);
        assert_eq!(config.document_class(), r"\documentclass[11pt,letterpaper]{article}");
        assert_eq!(
            DocumentConfig::standalone().document_class(),
            r"\documentclass{standalone}"
        );
    }

    #[test]
    fn test_preamble_phases() {
        let xcolor = Package::new("xcolor");
        let tikz = Package::new("tikz").with_setup_code(r"\usetikzlibrary{arrows}");
        let todo = Command::new("TODO", r"\newcommand{\TODO}{\textcolor{red}{TODO}}")
            .with_packages([xcolor]);
        let content: ContentRef = Arc::new(
            BasicContent::new(r"\TODO")
                .with_packages([tikz])
                .with_commands([todo]),
        );
        let doc = content.as_standalone("main.tex");

        assert_eq!(
            doc.get_preamble().unwrap(),
            "\\usepackage{tikz}\n\\usepackage{xcolor}\n\n\
             % Command: TODO\n\\newcommand{\\TODO}{\\textcolor{red}{TODO}}\n\n\
             % Setup package: tikz\n\\usetikzlibrary{arrows}"
        );
    }

    #[test]
    fn test_config_units_are_included() {
        let config = DocumentConfig::new("article")
            .with_packages([Package::new("inputenc").with_options(["utf8"])])
            .with_commands([Command::new("ceil", r"\DeclarePairedDelimiter{\ceil}{\lceil}{\rceil}")
                .with_packages([Package::new("mathtools")])]);
        let doc = Document::new("main.tex", config, Vec::new());

        let names: Vec<_> = doc
            .sorted_packages()
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, ["inputenc", "mathtools"]);
    }

    #[test]
    fn test_conflicting_options_are_detected() {
        let a: ContentRef = Arc::new(
            BasicContent::new("a").with_packages([Package::new("geometry").with_options(["margin=1in"])]),
        );
        let b: ContentRef = Arc::new(
            BasicContent::new("b").with_packages([Package::new("geometry").with_options(["margin=2in"])]),
        );
        let doc = Document::new("main.tex", DocumentConfig::default(), vec![a, b]);

        let source = doc.get_content().unwrap();
        assert!(source.contains(r"\usepackage[margin=1in]{geometry}"));
        assert!(source.contains(r"\usepackage[margin=2in]{geometry}"));
        assert!(doc.check_conflicts().is_err());
    }

    #[test]
    fn test_generated_file_has_header() {
        let content: ContentRef = Arc::new(BasicContent::new("Hello"));
        let doc = content.as_standalone("main.tex");
        let FileContents::Text(text) = ProjectFile::contents(&doc).unwrap() else {
            panic!("documents are text files");
        };
        assert!(text.starts_with("% This file was automatically generated by texforge."));
        assert!(text.ends_with("\\end{document}\n"));
    }

    #[test]
    fn test_required_files_are_transitive() {
        let leaf: ContentRef = Arc::new(BasicContent::new("leaf"));
        let inner: ContentRef = Arc::new(InputContent::new("leaf.tex", leaf));
        let outer: ContentRef = Arc::new(InputContent::new("inner.tex", inner));
        let doc = outer.as_standalone("main.tex");

        let paths: Vec<_> = doc
            .required_files()
            .iter()
            .map(|f| f.path().to_string())
            .collect();
        assert_eq!(paths, ["inner.tex", "leaf.tex"]);
    }
}
