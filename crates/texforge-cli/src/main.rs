use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use texforge_build::shortcuts::{qcircuit_document, snippet_document};
use texforge_build::{
    Compiler, CompilerConfig, OsFs, Padding, Pdf, Project, QcircuitOptions, SourceManifest,
};
use texforge_core::catalog::{cmd, pkg};
use texforge_core::{Command, Document, DocumentConfig, Package};

#[derive(Parser)]
#[command(name = "texforge")]
#[command(about = "Assemble and compile LaTeX documents", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Compiler settings saved as JSON
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a snippet of LaTeX on its own page
    Snippet {
        code: String,
        /// Package to load, `name` or `name[opt,...]`
        #[arg(short, long = "package")]
        packages: Vec<String>,
        /// Catalog command to define, e.g. `ceil`
        #[arg(short, long = "command")]
        commands: Vec<String>,
        /// Space around the page, in points
        #[arg(long, default_value_t = 1.0)]
        pad: f64,
        /// Document class
        #[arg(long, default_value = "standalone")]
        class: String,
        #[arg(short, long, default_value = "snippet.pdf")]
        output: PathBuf,
        /// Print the generated source instead of compiling it
        #[arg(long)]
        tex: bool,
    },
    /// Compile a qcircuit diagram
    Qcircuit {
        code: String,
        #[arg(long, default_value = "0.5em")]
        row_sep: String,
        #[arg(long, default_value = "0.7em")]
        col_sep: String,
        #[arg(long)]
        const_row: bool,
        #[arg(long)]
        const_col: bool,
        #[arg(long)]
        const_size: bool,
        #[arg(short, long, default_value = "circuit.pdf")]
        output: PathBuf,
        #[arg(long)]
        tex: bool,
    },
    /// Print the preamble for a set of packages and commands
    Preamble {
        #[arg(short, long = "package")]
        packages: Vec<String>,
        #[arg(short, long = "command")]
        commands: Vec<String>,
        #[arg(long, default_value = "article")]
        class: String,
    },
    /// Compile sources from a directory and collect the PDFs
    Compile {
        dir: PathBuf,
        /// Sources relative to DIR
        #[arg(default_value = "main.tex")]
        sources: Vec<String>,
        /// Where the PDFs go
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Also write a JSON manifest of the compiled tree
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let compiler = match &cli.config {
        Some(path) => Compiler::from_config(
            &CompilerConfig::load(path)
                .with_context(|| format!("reading compiler config {}", path.display()))?,
        ),
        None => Compiler::default(),
    };

    match cli.command {
        Commands::Snippet {
            code,
            packages,
            commands,
            pad,
            class,
            output,
            tex,
        } => {
            let document = snippet_document(
                &code,
                parse_packages(&packages)?,
                parse_commands(&commands)?,
                Some(&Padding::points(pad)),
                DocumentConfig::new(class),
            );
            build(document, &compiler, &output, tex)?;
        }
        Commands::Qcircuit {
            code,
            row_sep,
            col_sep,
            const_row,
            const_col,
            const_size,
            output,
            tex,
        } => {
            let options = QcircuitOptions {
                row_sep,
                col_sep,
                const_row,
                const_col,
                const_size,
                ..QcircuitOptions::default()
            };
            build(qcircuit_document(&code, &options), &compiler, &output, tex)?;
        }
        Commands::Preamble {
            packages,
            commands,
            class,
        } => {
            let config = DocumentConfig::new(class)
                .with_packages(parse_packages(&packages)?)
                .with_commands(parse_commands(&commands)?);
            let document = Document::new("main.tex", config, Vec::new());
            println!("{}", document.config().document_class());
            println!("{}", document.get_preamble()?);
        }
        Commands::Compile {
            dir,
            sources,
            out,
            manifest,
        } => {
            let mut project = Project::new();
            project
                .add_dir(&dir)
                .with_context(|| format!("reading {}", dir.display()))?;
            if let Some(path) = manifest {
                SourceManifest::from_fs(project.fs())?.save(&path)?;
            }
            let sources: Vec<&str> = sources.iter().map(String::as_str).collect();
            std::fs::create_dir_all(&out)?;
            project.save_pdf_batch(&sources, &compiler, &mut OsFs::new(&out))?;
            info!("wrote {} PDF(s) to {}", sources.len(), out.display());
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build(document: Document, compiler: &Compiler, output: &Path, tex: bool) -> anyhow::Result<()> {
    if tex {
        print!("{}", document.get_content()?);
        return Ok(());
    }
    let pdf = Project::from_document(document)?.compile_pdf("main.tex", compiler)?;
    save(&pdf, output)
}

fn save(pdf: &Pdf, output: &Path) -> anyhow::Result<()> {
    if !pdf.is_produced() {
        for diagnostic in pdf.errors() {
            eprintln!("{diagnostic}");
        }
        bail!("no PDF was produced");
    }
    pdf.save(output)?;
    info!("wrote {}", output.display());
    Ok(())
}

/// `name` or `name[opt,...]`. A bare name uses the catalog declaration when
/// there is one.
fn parse_package(spec: &str) -> anyhow::Result<Package> {
    let spec = spec.trim();
    let (name, options) = match spec.split_once('[') {
        Some((name, rest)) => {
            let Some(options) = rest.strip_suffix(']') else {
                bail!("unclosed option list in package `{spec}`");
            };
            let options: Vec<&str> = options
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .collect();
            (name.trim(), Some(options))
        }
        None => (spec, None),
    };
    if name.is_empty() {
        bail!("missing package name in `{spec}`");
    }
    Ok(match options {
        Some(options) => Package::new(name).with_options(options),
        None => pkg::lookup(name).unwrap_or_else(|| pkg::named(name)),
    })
}

fn parse_packages(specs: &[String]) -> anyhow::Result<Vec<Package>> {
    specs.iter().map(|spec| parse_package(spec)).collect()
}

fn parse_commands(names: &[String]) -> anyhow::Result<Vec<Command>> {
    names
        .iter()
        .map(|name| {
            cmd::lookup(name).with_context(|| format!("unknown command `{name}`"))
        })
        .collect()
}
