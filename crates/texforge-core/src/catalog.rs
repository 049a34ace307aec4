//! Ready-made packages, commands and content.
//!
//! The statics are built on first use and never mutated; clone them into
//! content declarations. Configurable variants are plain functions.
//!
//! ```
//! use texforge_core::catalog::{cmd, pkg};
//! use texforge_core::BasicContent;
//!
//! let content = BasicContent::new(r"$\ceil{x}$")
//!     .with_packages([pkg::AMSMATH.clone(), pkg::geometry("2cm")])
//!     .with_commands([cmd::CEIL.clone()]);
//! ```

use crate::content::{Content, Indent};
use crate::document::DocumentConfig;
use crate::error::{CoreError, Result};
use crate::unit::Command;
use std::fmt;

pub mod pkg {
    use crate::unit::Package;
    use once_cell::sync::Lazy;

    /// An option-less package with the given name.
    pub fn named(name: &str) -> Package {
        Package::new(name)
    }

    pub fn geometry(margin: &str) -> Package {
        Package::new("geometry").with_options([format!("margin={margin}")])
    }

    /// `tikz` with `\usetikzlibrary` lines for each library.
    pub fn tikz(libraries: &[&str]) -> Package {
        let code = libraries
            .iter()
            .map(|lib| format!("\\usetikzlibrary{{{lib}}}"))
            .collect::<Vec<_>>()
            .join("\n");
        let package = Package::new("tikz");
        if code.is_empty() {
            package
        } else {
            package.with_setup_code(code)
        }
    }

    pub fn pgfplots(compat: &str) -> Package {
        Package::new("pgfplots")
            .with_packages([TIKZ.clone()])
            .with_setup_code(format!("\\pgfplotsset{{compat={compat}}}"))
    }

    pub static GEOMETRY: Lazy<Package> = Lazy::new(|| geometry("1.0in"));
    pub static INPUTENC: Lazy<Package> = Lazy::new(|| Package::new("inputenc").with_options(["utf8"]));

    pub static XCOLOR: Lazy<Package> = Lazy::new(|| Package::new("xcolor"));
    pub static PAGECOLOR: Lazy<Package> = Lazy::new(|| Package::new("pagecolor"));
    pub static MULTICOL: Lazy<Package> = Lazy::new(|| Package::new("multicol"));
    pub static FANCYHDR: Lazy<Package> = Lazy::new(|| Package::new("fancyhdr"));

    pub static AMSMATH: Lazy<Package> = Lazy::new(|| Package::new("amsmath"));
    pub static COMMATH: Lazy<Package> = Lazy::new(|| Package::new("commath"));
    pub static AMSFONTS: Lazy<Package> = Lazy::new(|| Package::new("amsfonts"));
    pub static AMSSYMB: Lazy<Package> = Lazy::new(|| Package::new("amssymb"));
    pub static MATHTOOLS: Lazy<Package> = Lazy::new(|| Package::new("mathtools"));

    pub static TIKZ: Lazy<Package> = Lazy::new(|| tikz(&["patterns", "arrows", "external"]));
    pub static PGFPLOTS: Lazy<Package> = Lazy::new(|| pgfplots("1.14"));

    pub static SIUNITX: Lazy<Package> =
        Lazy::new(|| Package::new("siunitx").with_options(["detect-family"]));
    pub static SANSMATH: Lazy<Package> =
        Lazy::new(|| Package::new("sansmath").with_options(["eulergreek"]));
    pub static RELSIZE: Lazy<Package> = Lazy::new(|| Package::new("relsize"));

    pub static CITE: Lazy<Package> = Lazy::new(|| Package::new("cite"));

    pub static QCIRCUIT: Lazy<Package> =
        Lazy::new(|| Package::new("qcircuit").with_options(["braket"]));
    pub static SVG: Lazy<Package> = Lazy::new(|| Package::new("svg"));

    /// The catalog declaration for `name`, if there is one.
    pub fn lookup(name: &str) -> Option<Package> {
        let package: &Lazy<Package> = match name {
            "geometry" => &GEOMETRY,
            "inputenc" => &INPUTENC,
            "xcolor" => &XCOLOR,
            "pagecolor" => &PAGECOLOR,
            "multicol" => &MULTICOL,
            "fancyhdr" => &FANCYHDR,
            "amsmath" => &AMSMATH,
            "commath" => &COMMATH,
            "amsfonts" => &AMSFONTS,
            "amssymb" => &AMSSYMB,
            "mathtools" => &MATHTOOLS,
            "tikz" => &TIKZ,
            "pgfplots" => &PGFPLOTS,
            "siunitx" => &SIUNITX,
            "sansmath" => &SANSMATH,
            "relsize" => &RELSIZE,
            "cite" => &CITE,
            "qcircuit" => &QCIRCUIT,
            "svg" => &SVG,
            _ => return None,
        };
        Some(Package::clone(package))
    }
}

pub mod cmd {
    use super::pkg;
    use crate::unit::Command;
    use once_cell::sync::Lazy;

    pub static ALL_MATH: Lazy<Command> = Lazy::new(|| {
        Command::bundle().with_packages([
            pkg::AMSMATH.clone(),
            pkg::COMMATH.clone(),
            pkg::AMSFONTS.clone(),
            pkg::AMSSYMB.clone(),
            pkg::MATHTOOLS.clone(),
        ])
    });

    pub static SISETUP: Lazy<Command> = Lazy::new(|| {
        Command::new("sisetup", r"\sisetup{text-sf=\sansmath}")
            .with_packages([pkg::SIUNITX.clone(), pkg::SANSMATH.clone()])
    });

    /// Everything an externally rendered pgfplots figure expects.
    pub static ARTIST_DEPS: Lazy<Command> = Lazy::new(|| {
        Command::bundle()
            .with_commands([SISETUP.clone()])
            .with_packages([
                pkg::TIKZ.clone(),
                pkg::PGFPLOTS.clone(),
                pkg::SIUNITX.clone(),
                pkg::SANSMATH.clone(),
                pkg::RELSIZE.clone(),
            ])
    });

    pub static TODO: Lazy<Command> = Lazy::new(|| {
        Command::new(
            "TODO",
            r"\newcommand{\TODO}[1][TODO]{{\colorbox{red}{\textbf{\textcolor{white}{#1}}}}}",
        )
        .with_packages([pkg::XCOLOR.clone()])
    });

    pub static CEIL: Lazy<Command> = Lazy::new(|| {
        Command::new("ceil", r"\DeclarePairedDelimiter{\ceil}{\lceil}{\rceil}")
            .with_packages([pkg::MATHTOOLS.clone()])
    });

    pub fn lookup(name: &str) -> Option<Command> {
        let command: &Lazy<Command> = match name {
            "all_math" => &ALL_MATH,
            "sisetup" => &SISETUP,
            "artist_deps" => &ARTIST_DEPS,
            "todo" | "TODO" => &TODO,
            "ceil" => &CEIL,
            _ => return None,
        };
        Some(Command::clone(command))
    }
}

/// `article`, 11pt letter paper with one inch margins and UTF-8 input.
pub fn basic_config() -> DocumentConfig {
    DocumentConfig::new("article")
        .with_options(["11pt", "letterpaper"])
        .with_packages([pkg::GEOMETRY.clone(), pkg::INPUTENC.clone()])
}

/// `\title`, `\author`, `\date` and `\maketitle`.
#[derive(Debug, Clone, Default)]
pub struct Title {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl Title {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

impl Content for Title {
    fn comment(&self) -> Option<&str> {
        Some("Make title")
    }

    fn render_body(&self, indent: Indent) -> String {
        let mut lines = Vec::new();
        for (macro_name, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("date", &self.date),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                lines.push(format!("{indent}\\{macro_name}{{{value}}}"));
            }
        }
        lines.push(format!("{indent}\\maketitle"));
        lines.join("\n")
    }
}

/// A named color defined with `\definecolor`.
#[derive(Debug, Clone)]
pub struct Color {
    name: String,
    command: Command,
}

impl Color {
    pub fn new(name: impl Into<String>, model: &str, spec: &str) -> Self {
        let name = name.into();
        let command = Command::new(
            format!("color_{name}"),
            format!("\\definecolor{{{name}}}{{{model}}}{{{spec}}}"),
        )
        .with_packages([pkg::XCOLOR.clone()]);
        Self { name, command }
    }

    /// Components in `0.0..=1.0`.
    pub fn rgb(name: impl Into<String>, r: f64, g: f64, b: f64) -> Self {
        Self::new(name, "rgb", &format!("{r},{g},{b}"))
    }

    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(name: impl Into<String>, hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let width = match digits.len() {
            3 if digits.is_ascii() => 1,
            6 if digits.is_ascii() => 2,
            _ => {
                return Err(CoreError::Usage(format!("not a hex color: {hex}")));
            }
        };
        let mut channels = [0u8; 3];
        for (i, channel) in channels.iter_mut().enumerate() {
            let part = &digits[i * width..(i + 1) * width];
            let part = if width == 1 { part.repeat(2) } else { part.to_string() };
            *channel = u8::from_str_radix(&part, 16)
                .map_err(|_| CoreError::Usage(format!("not a hex color: {hex}")))?;
        }
        let [r, g, b] = channels;
        Ok(Self::new(name, "RGB", &format!("{r},{g},{b}")))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A page color given either by name or as a defined [`Color`].
#[derive(Debug, Clone, Copy)]
pub enum PageColor<'a> {
    Named(&'a str),
    Custom(&'a Color),
}

impl PageColor<'_> {
    fn name(&self) -> &str {
        match self {
            PageColor::Named(name) => name,
            PageColor::Custom(color) => color.name(),
        }
    }
}

/// Command setting the page background and/or text color.
pub fn set_page_color(
    background: Option<PageColor<'_>>,
    foreground: Option<PageColor<'_>>,
) -> Result<Command> {
    if background.is_none() && foreground.is_none() {
        return Err(CoreError::Usage(
            "set_page_color needs a background or a foreground".to_string(),
        ));
    }
    let mut lines = Vec::new();
    let mut colors = Vec::new();
    if let Some(bg) = background {
        lines.push(format!("\\pagecolor{{{}}}", bg.name()));
        if let PageColor::Custom(color) = bg {
            colors.push(color.command().clone());
        }
    }
    if let Some(fg) = foreground {
        lines.push(format!("\\color{{{}}}", fg.name()));
        if let PageColor::Custom(color) = fg {
            colors.push(color.command().clone());
        }
    }
    Ok(Command::new("pagecolor", lines.join("\n"))
        .with_packages([pkg::PAGECOLOR.clone()])
        .with_commands(colors))
}
