use std::sync::Arc;
use texforge_core::catalog::{self, cmd, pkg};
use texforge_core::{
    BasicContent, Command, ContentExt, ContentRef, CoreError, DependencyUnit, Document,
    DocumentConfig, InputContent, MultiContent, Package, ProjectFile, WrapContent,
};

fn node(content: BasicContent) -> ContentRef {
    Arc::new(content)
}

#[test]
fn test_hello_standalone() {
    let doc = node(BasicContent::new("Hello")).as_standalone("main.tex");
    assert_eq!(
        doc.get_content().unwrap(),
        "\\documentclass{standalone}\n\n\\begin{document}\n\nHello\n\n\\end{document}\n"
    );
    assert_eq!(doc.get_preamble().unwrap(), "");
}

#[test]
fn test_shared_package_is_imported_once() {
    let a = node(BasicContent::new("a").with_packages([Package::new("xcolor")]));
    let b = node(BasicContent::new("b").with_packages([Package::new("xcolor")]));
    let multi: ContentRef = Arc::new(MultiContent::new([a, b]));
    let source = multi.as_standalone("main.tex").get_content().unwrap();

    assert_eq!(source.matches(r"\usepackage{xcolor}").count(), 1);
}

#[test]
fn test_command_setup_follows_its_package() {
    let todo = Command::new("TODO", r"\newcommand{\TODO}{\textcolor{red}{TODO}}")
        .with_packages([Package::new("xcolor")]);
    let doc = node(BasicContent::new(r"\TODO").with_commands([todo])).as_standalone("main.tex");
    let source = doc.get_content().unwrap();

    let import = source.find(r"\usepackage{xcolor}").unwrap();
    let annotation = source.find("% Command: TODO\n").unwrap();
    let definition = source.find(r"\newcommand{\TODO}").unwrap();
    assert!(import < annotation);
    assert!(annotation < definition);
}

#[test]
fn test_geometry_dedup_and_conflict() {
    let same = |code: &str| {
        node(BasicContent::new(code).with_packages([Package::new("geometry").with_options(["margin=1.0in"])]))
    };
    let doc = Document::new(
        "main.tex",
        DocumentConfig::default(),
        vec![same("a"), same("b")],
    );
    let source = doc.get_content().unwrap();
    assert_eq!(source.matches(r"\usepackage[margin=1.0in]{geometry}").count(), 1);
    assert!(doc.check_conflicts().is_ok());

    let other = node(
        BasicContent::new("c").with_packages([Package::new("geometry").with_options(["margin=2.0in"])]),
    );
    let doc = Document::new(
        "main.tex",
        DocumentConfig::default(),
        vec![same("a"), other],
    );
    let conflicts = doc.resolve().unwrap().conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].name, "geometry");
    assert!(matches!(
        doc.check_conflicts(),
        Err(CoreError::NameConflict { .. })
    ));
}

fn report() -> Document {
    let body: ContentRef = Arc::new(MultiContent::new([
        Arc::new(catalog::Title::new("Quarterly").with_author("Ops")) as ContentRef,
        node(
            BasicContent::new(r"$\ceil{x} \in \mathbb{Z}$")
                .with_commands([cmd::CEIL.clone(), cmd::ALL_MATH.clone()]),
        ),
        Arc::new(WrapContent::new(
            r"\begin{tikzpicture}",
            r"\end{tikzpicture}",
            node(BasicContent::new(r"\draw (0,0) -- (1,1);").with_packages([pkg::PGFPLOTS.clone()])),
        )) as ContentRef,
        node(BasicContent::new(r"\TODO[later]").with_commands([cmd::TODO.clone()])),
    ]));
    body.as_document("report.tex", catalog::basic_config())
}

#[test]
fn test_render_is_deterministic() {
    let first = report().get_content().unwrap();
    let second = report().get_content().unwrap();
    assert_eq!(first, second);
    assert!(first.ends_with("\\end{document}\n"));
    assert!(!first.ends_with("\n\n"));
    assert!(first.lines().all(|line| line == line.trim_end()));
}

#[test]
fn test_closure_has_no_duplicates() {
    let doc = report();
    let packages = doc.sorted_packages().unwrap();
    let mut names: Vec<_> = packages.iter().map(|p| p.key()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), packages.len());

    for expected in ["geometry", "inputenc", "mathtools", "amsmath", "xcolor", "tikz", "pgfplots"] {
        assert!(
            packages.iter().any(|p| p.name() == expected),
            "missing {expected}"
        );
    }

    let commands = doc.sorted_commands().unwrap();
    let named: Vec<_> = commands
        .iter()
        .filter(|c| !c.is_anonymous())
        .map(|c| c.name())
        .collect();
    assert_eq!(named, ["TODO", "ceil"]);
}

#[test]
fn test_requirements_precede_dependents() {
    let doc = report();
    let packages = doc.sorted_packages().unwrap();
    for (position, package) in packages.iter().enumerate() {
        for required in package.required_packages().unwrap() {
            let required_at = packages
                .iter()
                .position(|p| *p == required)
                .expect("closure includes requirement");
            assert!(
                required_at < position,
                "{} must precede {}",
                required.name(),
                package.name()
            );
        }
    }
}

#[test]
fn test_input_file_is_required() {
    let chapter = node(BasicContent::new("Chapter text").with_packages([pkg::XCOLOR.clone()]));
    let input: ContentRef = Arc::new(InputContent::new("chapters/one.tex", chapter));
    let doc = input.as_document("book.tex", DocumentConfig::new("book"));

    let source = doc.get_content().unwrap();
    assert!(source.contains(r"\input{chapters/one.tex}"));
    assert!(source.contains(r"\usepackage{xcolor}"));

    let files = ProjectFile::required_files(&doc);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path(), "chapters/one.tex");
}
