//! SVG and PDF conversion through `inkscape` and `pdf2svg`.

use crate::compiler::Compiler;
use crate::config::SHELL_ESCAPE;
use crate::error::{BuildError, Result};
use crate::pdf::Pdf;
use crate::project::{FileSource, Project};
use crate::render::RenderExt;
use crate::tool::{CommandExecutor, ExternalTool};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use texforge_core::catalog::{pkg, Color};
use texforge_core::{BasicContent, ContentExt, ContentRef, DocumentConfig, Package};

const SVG_NAME: &str = "image.svg";
const SVG_LATEX_PDF: &str = "image_svg-tex.pdf";
const SVG_LATEX_INPUT: &str = "image_svg-tex.pdf_tex";

/// Packages available to text embedded in converted drawings.
pub fn svg_packages() -> Vec<Package> {
    vec![
        pkg::XCOLOR.clone(),
        pkg::AMSMATH.clone(),
        pkg::AMSSYMB.clone(),
        pkg::AMSFONTS.clone(),
        pkg::SVG.clone(),
        Package::new("qcircuit").with_options(["braket", "qm"]),
    ]
}

/// Options for typesetting the text layer of an SVG drawing.
#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Let inkscape crop the page to the drawing.
    pub fit_drawing: bool,
    /// Value for `\svgwidth`, e.g. `0.8\linewidth`.
    pub latex_width: Option<String>,
    pub config: DocumentConfig,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            fit_drawing: false,
            latex_width: None,
            config: DocumentConfig::standalone(),
        }
    }
}

/// An SVG document with its size in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Svg {
    content: String,
    width: f64,
    height: f64,
}

static WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r#"width="([0-9]+(?:\.[0-9]+)?)"#).unwrap());
static HEIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"height="([0-9]+(?:\.[0-9]+)?)"#).unwrap());

/// Control characters that stop an SVG from rendering even when escaped.
fn is_stripped(c: char) -> bool {
    c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r' | '\x7f')
}

impl Svg {
    /// Parses the `width`/`height` attributes, given in points.
    pub fn parse(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let dimension = |re: &Regex, name: &str| -> Result<f64> {
            re.captures(&content)
                .and_then(|c| c[1].parse::<f64>().ok())
                .ok_or_else(|| BuildError::InvalidSvg(format!("no numeric {name} attribute")))
        };
        let width = dimension(&WIDTH, "width")? * 4.0 / 3.0;
        let height = dimension(&HEIGHT, "height")? * 4.0 / 3.0;
        Ok(Self {
            content,
            width,
            height,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.content)?;
        Ok(())
    }

    /// `data:image/svg+xml;base64,...`
    pub fn to_data_uri(&self) -> String {
        let safe: String = self.content.chars().filter(|c| !is_stripped(*c)).collect();
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(safe))
    }

    /// `data:image/svg+xml;utf8,...` with `"`, `#`, `&` and `%` percent-encoded.
    pub fn to_utf8_data_uri(&self) -> String {
        let mut out = String::from("data:image/svg+xml;utf8,");
        for c in self.content.chars().filter(|c| !is_stripped(*c)) {
            match c {
                '"' | '#' | '&' | '%' => out.push_str(&format!("%{:02X}", c as u32)),
                c => out.push(c),
            }
        }
        out
    }
}

/// The external tools behind the conversions.
#[derive(Debug, Clone)]
pub struct Converter {
    inkscape: ExternalTool,
    pdf2svg: ExternalTool,
    compiler: Compiler,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(Compiler::default())
    }
}

impl Converter {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            inkscape: ExternalTool::new("inkscape"),
            pdf2svg: ExternalTool::new("pdf2svg"),
            compiler,
        }
    }

    /// Routes every tool, the compiler included, through `executor`.
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.inkscape = self.inkscape.with_executor(executor.clone());
        self.pdf2svg = self.pdf2svg.with_executor(executor.clone());
        self.compiler = self.compiler.with_executor(executor);
        self
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Typesets an SVG drawing whose text is LaTeX.
    ///
    /// inkscape splits the drawing into a graphics-only PDF and a LaTeX
    /// overlay, which is then compiled with shell escape enabled.
    pub fn svg_to_pdf(&self, svg: FileSource, options: &SvgOptions) -> Result<Pdf> {
        let mut project = Project::new();
        project.add_source(SVG_NAME, svg)?;

        let width = options
            .latex_width
            .as_deref()
            .map(|w| format!("\\def\\svgwidth{{{w}}}\n"))
            .unwrap_or_default();
        let content: ContentRef = Arc::new(
            BasicContent::new(format!("{width}\\input{{{SVG_LATEX_INPUT}}}"))
                .with_packages(svg_packages()),
        );
        project.add_file(Arc::new(content.as_document("main.tex", options.config.clone())))?;

        let tmp = tempfile::tempdir()?;
        project.write_to_dir(tmp.path())?;

        let mut args = vec!["-z".to_string()];
        if options.fit_drawing {
            args.push("-D".to_string());
        }
        args.extend(
            ["--export-latex", "--export-type=pdf", SVG_NAME, "-o", SVG_LATEX_PDF]
                .map(String::from),
        );
        self.inkscape.run(&args, tmp.path())?;

        let mut compile_options = self.compiler.options().to_vec();
        if !compile_options.iter().any(|o| o == SHELL_ESCAPE) {
            compile_options.insert(0, SHELL_ESCAPE.to_string());
        }
        let compiler = self.compiler.clone().with_options(compile_options);
        let compiled = project.compile_in_dir(tmp.path(), &["main.tex"], &compiler)?;

        let mut data = None;
        let mut log = None;
        if let Some(out) = compiled.into_iter().next() {
            if let Some(pdf) = out.pdf {
                data = Some(std::fs::read(tmp.path().join(pdf))?);
            }
            if let Some(path) = out.log {
                log = Some(String::from_utf8_lossy(&std::fs::read(tmp.path().join(path))?).into_owned());
            }
        }
        Ok(Pdf::new(data, log))
    }

    /// Converts the first page of a PDF to SVG.
    pub fn pdf_to_svg(&self, pdf: &[u8]) -> Result<Svg> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(tmp.path().join("image.pdf"), pdf)?;
        let args = ["image.pdf", "image.svg"].map(String::from);
        self.pdf2svg.run(&args, tmp.path())?;
        let text = std::fs::read_to_string(tmp.path().join("image.svg"))?;
        debug!("pdf2svg produced {} bytes", text.len());
        Svg::parse(text)
    }

    /// [`Converter::svg_to_pdf`] followed by [`Converter::pdf_to_svg`].
    pub fn render_latex_in_svg(&self, svg: FileSource, options: &SvgOptions) -> Result<Svg> {
        let pdf = self.svg_to_pdf(svg, options)?;
        self.pdf_from(&pdf, "main.tex")
    }

    /// Renders a LaTeX snippet to SVG, optionally colored.
    ///
    /// `fill` is a color name or `#rgb`/`#rrggbb`.
    pub fn text_to_svg(&self, text: &str, fill: Option<&str>, config: DocumentConfig) -> Result<Svg> {
        let mut code = text.to_string();
        let mut commands = Vec::new();
        if let Some(fill) = fill {
            let name = if fill.starts_with('#') && matches!(fill.len(), 4 | 7) {
                let color = Color::from_hex("customcolor", fill)?;
                commands.push(color.command().clone());
                "customcolor"
            } else {
                fill
            };
            code = format!("\\color{{{name}}}{text}");
        }
        let content: ContentRef = Arc::new(
            BasicContent::new(code)
                .with_packages(svg_packages())
                .with_commands(commands),
        );
        let pdf = content.render(config, &self.compiler)?;
        self.pdf_from(&pdf, "main.tex")
    }

    fn pdf_from(&self, pdf: &Pdf, source: &str) -> Result<Svg> {
        let data = pdf.data().ok_or_else(|| BuildError::MissingArtifacts {
            sources: vec![source.to_string()],
        })?;
        self.pdf_to_svg(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::testing::MockCommandExecutor;

    const SAMPLE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="30pt" height="15.5pt"><text fill="#f00">a&b 50%</text></svg>"##;

    #[test]
    fn test_svg_dimensions() {
        let svg = Svg::parse(SAMPLE).unwrap();
        assert_eq!(svg.width(), 40.0);
        assert!((svg.height() - 15.5 * 4.0 / 3.0).abs() < 1e-9);
        assert!(matches!(Svg::parse("<svg/>"), Err(BuildError::InvalidSvg(_))));
    }

    #[test]
    fn test_data_uris() {
        let svg = Svg::parse(format!("{SAMPLE}\x01")).unwrap();
        let uri = svg.to_data_uri();
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
        let decoded = STANDARD
            .decode(uri.trim_start_matches("data:image/svg+xml;base64,"))
            .unwrap();
        assert_eq!(decoded, SAMPLE.as_bytes());

        let utf8 = svg.to_utf8_data_uri();
        assert!(utf8.contains("fill=%22%23f00%22"));
        assert!(utf8.contains("a%26b 50%25"));
        assert!(!utf8.contains('\x01'));
    }

    #[test]
    fn test_svg_to_pdf_invocations() {
        let mock = Arc::new(MockCommandExecutor::producing(&[("main.pdf", b"%PDF")]));
        let converter = Converter::default().with_executor(mock.clone());
        let options = SvgOptions {
            fit_drawing: true,
            latex_width: Some(r"5cm".to_string()),
            ..SvgOptions::default()
        };
        let pdf = converter
            .svg_to_pdf(FileSource::Text(SAMPLE.to_string()), &options)
            .unwrap();
        assert_eq!(pdf.data(), Some(&b"%PDF"[..]));

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "inkscape");
        assert_eq!(
            calls[0].1,
            ["-z", "-D", "--export-latex", "--export-type=pdf", "image.svg", "-o", "image_svg-tex.pdf"]
        );
        assert_eq!(calls[1].0, "pdflatex");
        assert_eq!(calls[1].1[0], SHELL_ESCAPE);
    }

    #[test]
    fn test_text_to_svg_requires_pdf() {
        // The mock never writes main.pdf, so there is nothing to convert.
        let mock = Arc::new(MockCommandExecutor::default());
        let converter = Converter::default().with_executor(mock);
        let err = converter
            .text_to_svg("$x$", Some("#08f"), DocumentConfig::standalone())
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingArtifacts { .. }));
    }

    #[test]
    fn test_pdf_to_svg_missing_tool() {
        let converter = Converter {
            pdf2svg: ExternalTool::new("texforge-no-pdf2svg"),
            ..Converter::default()
        };
        assert!(matches!(
            converter.pdf_to_svg(b"%PDF"),
            Err(BuildError::ToolNotFound { tool }) if tool == "texforge-no-pdf2svg"
        ));
    }
}
