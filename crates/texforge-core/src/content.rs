//! Content nodes: the composable pieces of a document body.
//!
//! Every node renders a chunk of LaTeX at a given [`Indent`] and declares the
//! packages and commands it needs directly. Composite nodes expose their
//! children through [`Content::sub_content`] so requirements and files
//! propagate up to the document.

use crate::document::{Document, DocumentConfig};
use crate::error::Result;
use crate::file::{FileRef, InputFile};
use crate::resolve::Resolver;
use crate::text::prefix_lines;
use crate::unit::{Command, Package};
use std::fmt;
use std::sync::Arc;

/// One level of indentation.
pub const INDENT_STEP: &str = "    ";

/// Nesting depth, rendered as [`INDENT_STEP`] repeated `depth` times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Indent(usize);

impl Indent {
    pub fn new(depth: usize) -> Self {
        Self(depth)
    }

    pub fn depth(self) -> usize {
        self.0
    }

    pub fn deeper(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.0 {
            f.write_str(INDENT_STEP)?;
        }
        Ok(())
    }
}

pub type ContentRef = Arc<dyn Content>;

/// A node of the document body.
pub trait Content: fmt::Debug + Send + Sync {
    /// Packages this node needs directly.
    fn packages(&self) -> &[Package] {
        &[]
    }

    /// Commands this node needs directly.
    fn commands(&self) -> &[Command] {
        &[]
    }

    /// Annotation emitted as a LaTeX comment above the body.
    fn comment(&self) -> Option<&str> {
        None
    }

    fn sub_content(&self) -> &[ContentRef] {
        &[]
    }

    /// Files that must exist next to the document for this node to compile.
    fn required_files(&self) -> Vec<FileRef> {
        self.sub_content()
            .iter()
            .flat_map(|c| c.required_files())
            .collect()
    }

    /// Renders the node itself, without its comment.
    fn render_body(&self, indent: Indent) -> String;

    fn latex_code_body(&self, indent: Indent) -> String {
        let mut out = String::new();
        if let Some(comment) = self.comment().filter(|c| !c.is_empty()) {
            for line in comment.split('\n') {
                out.push_str(&format!("{indent}% {line}\n"));
            }
        }
        out.push_str(&self.render_body(indent));
        out
    }

    /// The transitive package closure of this node, deduplicated and sorted.
    fn required_packages(&self) -> Result<Vec<Package>> {
        let mut resolver = Resolver::new();
        resolver.add_content(self);
        Ok(resolver.resolve()?.packages().to_vec())
    }

    /// The transitive command closure of this node, deduplicated and sorted.
    fn required_commands(&self) -> Result<Vec<Command>> {
        let mut resolver = Resolver::new();
        resolver.add_content(self);
        Ok(resolver.resolve()?.commands().to_vec())
    }
}

/// Document-building conveniences available on every shared node.
pub trait ContentExt {
    fn as_document(&self, path: impl Into<String>, config: DocumentConfig) -> Document;

    /// Wraps the node alone in a `standalone` class document.
    fn as_standalone(&self, path: impl Into<String>) -> Document {
        self.as_document(path, DocumentConfig::standalone())
    }
}

impl ContentExt for ContentRef {
    fn as_document(&self, path: impl Into<String>, config: DocumentConfig) -> Document {
        Document::new(path, config, vec![self.clone()])
    }
}

/// Raw LaTeX text.
#[derive(Debug, Clone, Default)]
pub struct BasicContent {
    code: String,
    packages: Vec<Package>,
    commands: Vec<Command>,
    comment: Option<String>,
}

impl BasicContent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_packages(mut self, packages: impl IntoIterator<Item = Package>) -> Self {
        self.packages.extend(packages);
        self
    }

    pub fn with_commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Content for BasicContent {
    fn packages(&self) -> &[Package] {
        &self.packages
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn render_body(&self, indent: Indent) -> String {
        prefix_lines(&indent.to_string(), self.code.trim())
    }
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone)]
pub struct MultiContent {
    contents: Vec<ContentRef>,
    separator: String,
    pre: Option<String>,
    post: Option<String>,
    comment: Option<String>,
}

impl MultiContent {
    pub fn new(contents: impl IntoIterator<Item = ContentRef>) -> Self {
        Self {
            contents: contents.into_iter().collect(),
            separator: "\n\n".to_string(),
            pre: None,
            post: None,
            comment: None,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Literal text placed before and after the joined children.
    pub fn with_surround(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre = Some(pre.into());
        self.post = Some(post.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn push(&mut self, content: ContentRef) {
        self.contents.push(content);
    }
}

impl Content for MultiContent {
    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn sub_content(&self) -> &[ContentRef] {
        &self.contents
    }

    fn render_body(&self, indent: Indent) -> String {
        let body = self
            .contents
            .iter()
            .map(|c| c.latex_code_body(indent))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(&self.separator);
        if self.pre.is_none() && self.post.is_none() {
            return body;
        }
        let prefix = indent.to_string();
        [
            self.pre.as_deref().map(|p| prefix_lines(&prefix, p)),
            Some(body),
            self.post.as_deref().map(|p| prefix_lines(&prefix, p)),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Decorates a single node with code before and after it.
#[derive(Debug, Clone)]
pub struct WrapContent {
    pre_code: String,
    post_code: String,
    content: ContentRef,
    packages: Vec<Package>,
    commands: Vec<Command>,
}

impl WrapContent {
    pub fn new(
        pre_code: impl Into<String>,
        post_code: impl Into<String>,
        content: ContentRef,
    ) -> Self {
        Self {
            pre_code: pre_code.into(),
            post_code: post_code.into(),
            content,
            packages: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_packages(mut self, packages: impl IntoIterator<Item = Package>) -> Self {
        self.packages.extend(packages);
        self
    }

    pub fn with_commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }
}

impl Content for WrapContent {
    fn packages(&self) -> &[Package] {
        &self.packages
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn sub_content(&self) -> &[ContentRef] {
        std::slice::from_ref(&self.content)
    }

    fn render_body(&self, indent: Indent) -> String {
        let prefix = indent.to_string();
        [
            prefix_lines(&prefix, &self.pre_code),
            self.content.latex_code_body(indent.deeper()),
            prefix_lines(&prefix, &self.post_code),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Wraps content in `\centering`.
pub fn centering(content: ContentRef) -> WrapContent {
    WrapContent::new(r"\centering", "", content)
}

/// Content that lives in its own generated file and is pulled in with `\input`.
#[derive(Debug, Clone)]
pub struct InputContent {
    path: String,
    content: ContentRef,
    file: Arc<InputFile>,
    comment: Option<String>,
}

impl InputContent {
    pub fn new(path: impl Into<String>, content: ContentRef) -> Self {
        let path = path.into();
        let file = Arc::new(InputFile::new(path.clone(), content.clone()));
        Self {
            path,
            content,
            file,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file(&self) -> &Arc<InputFile> {
        &self.file
    }
}

impl Content for InputContent {
    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn sub_content(&self) -> &[ContentRef] {
        std::slice::from_ref(&self.content)
    }

    fn required_files(&self) -> Vec<FileRef> {
        vec![self.file.clone() as FileRef]
    }

    fn render_body(&self, indent: Indent) -> String {
        format!("{indent}\\input{{{}}}", self.path)
    }
}
