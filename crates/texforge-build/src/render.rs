use crate::compiler::Compiler;
use crate::error::Result;
use crate::pdf::Pdf;
use crate::project::Project;
use crate::vfs::OsFs;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use texforge_core::{ContentExt, ContentRef, Document, DocumentConfig};

impl Project {
    /// A project holding `document` and everything it requires.
    pub fn from_document(document: Document) -> Result<Self> {
        let mut project = Self::new();
        project.add_file(Arc::new(document))?;
        Ok(project)
    }
}

/// Building and compiling documents straight from content.
pub trait RenderExt {
    fn as_project(&self, path: &str, config: DocumentConfig) -> Result<Project>;

    /// Compiles the content as `main.tex` in a throwaway project.
    fn render(&self, config: DocumentConfig, compiler: &Compiler) -> Result<Pdf> {
        self.as_project("main.tex", config)?
            .compile_pdf("main.tex", compiler)
    }

    /// Writes the source and its required files below `dir`.
    fn save_tex(&self, dir: &Path, path: &str, config: DocumentConfig) -> Result<()> {
        let project = self.as_project(path, config)?;
        debug!("writing {} files to {}", project.paths().count(), dir.display());
        project.write_src(&mut OsFs::new(dir))
    }
}

impl RenderExt for ContentRef {
    fn as_project(&self, path: &str, config: DocumentConfig) -> Result<Project> {
        Project::from_document(self.as_document(path, config))
    }
}

impl RenderExt for Document {
    /// Ignores `config`; the document already has one.
    fn as_project(&self, path: &str, _config: DocumentConfig) -> Result<Project> {
        let document = Document::new(path, self.config().clone(), self.content_nodes().to_vec());
        Project::from_document(document)
    }
}
