//! Requirement resolution.
//!
//! The resolver builds a directed graph whose nodes are distinct units (by
//! [`UnitKey`]) and whose edges point from a dependent to each unit it
//! requires, either directly or through its setup content. Traversal is an
//! explicit worklist; every unit value is expanded once, so the same
//! declaration reached through many content nodes costs a single visit.
//!
//! Structurally equal declarations share one node, so a unit that requires
//! an equal copy of itself adds no edge.
//!
//! Once the graph is complete it is topologically sorted. A cycle aborts with
//! [`CoreError::CyclicDependency`]. Otherwise requirement depths are computed
//! bottom-up and both unit lists are ordered by [`SortKey`].

use crate::content::Content;
use crate::error::{CoreError, Result};
use crate::unit::{Command, DependencyUnit, Package, SortKey, UnitKey, UnitKind};
use log::debug;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A borrowed unit of either kind.
#[derive(Debug, Clone, Copy)]
pub enum UnitRef<'a> {
    Package(&'a Package),
    Command(&'a Command),
}

impl<'a> UnitRef<'a> {
    fn unit(self) -> &'a dyn DependencyUnit {
        match self {
            UnitRef::Package(p) => p,
            UnitRef::Command(c) => c,
        }
    }

    fn address(self) -> usize {
        match self {
            UnitRef::Package(p) => p as *const Package as usize,
            UnitRef::Command(c) => c as *const Command as usize,
        }
    }

    fn to_node(self) -> Node {
        match self {
            UnitRef::Package(p) => Node::Package(p.clone()),
            UnitRef::Command(c) => Node::Command(c.clone()),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Package(Package),
    Command(Command),
}

impl Node {
    fn unit(&self) -> &dyn DependencyUnit {
        match self {
            Node::Package(p) => p,
            Node::Command(c) => c,
        }
    }
}

/// Collects units from content trees and explicit declarations.
#[derive(Debug, Default)]
pub struct Resolver<'a> {
    graph: DiGraph<Node, ()>,
    index: HashMap<UnitKey, NodeIndex>,
    expanded: HashSet<usize>,
    pending: Vec<UnitRef<'a>>,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every unit declared anywhere in a content tree.
    pub fn add_content<C: Content + ?Sized>(&mut self, content: &'a C) {
        for unit in direct_units(content) {
            self.add_unit(unit);
        }
    }

    pub fn add_package(&mut self, package: &'a Package) {
        self.add_unit(UnitRef::Package(package));
    }

    pub fn add_command(&mut self, command: &'a Command) {
        self.add_unit(UnitRef::Command(command));
    }

    pub fn add_unit(&mut self, unit: UnitRef<'a>) {
        self.intern(unit);
        self.pending.push(unit);
    }

    fn intern(&mut self, unit: UnitRef<'a>) -> NodeIndex {
        let key = unit.unit().key();
        *self
            .index
            .entry(key)
            .or_insert_with(|| self.graph.add_node(unit.to_node()))
    }

    fn expand(&mut self, unit: UnitRef<'a>) {
        if !self.expanded.insert(unit.address()) {
            return;
        }
        let from = self.intern(unit);
        let inner = unit.unit();

        let mut deps: Vec<UnitRef<'a>> = Vec::new();
        deps.extend(inner.packages().iter().map(UnitRef::Package));
        deps.extend(inner.commands().iter().map(UnitRef::Command));
        if let Some(setup) = inner.setup() {
            deps.extend(direct_units(setup.content().as_ref()));
        }

        for dep in deps {
            let to = self.intern(dep);
            // A unit requiring an equal declaration is satisfied by itself.
            if to != from {
                self.graph.update_edge(from, to, ());
            }
            self.pending.push(dep);
        }
    }

    /// Expands the whole graph, checks it for cycles and orders the result.
    pub fn resolve(mut self) -> Result<Resolution> {
        while let Some(unit) = self.pending.pop() {
            self.expand(unit);
        }

        let order = toposort(&self.graph, None).map_err(|cycle| {
            let unit = self.graph[cycle.node_id()].unit();
            CoreError::CyclicDependency {
                kind: unit.kind(),
                name: unit.name().to_string(),
            }
        })?;

        // Deepest same-kind requirement reachable below each node.
        let count = self.graph.node_count();
        let mut depth = vec![0usize; count];
        let mut below_packages: Vec<Option<usize>> = vec![None; count];
        let mut below_commands: Vec<Option<usize>> = vec![None; count];

        for &idx in order.iter().rev() {
            let mut packages = None;
            let mut commands = None;
            for succ in self.graph.neighbors(idx) {
                let s = succ.index();
                packages = packages.max(below_packages[s]);
                commands = commands.max(below_commands[s]);
                match self.graph[succ] {
                    Node::Package(_) => packages = packages.max(Some(depth[s])),
                    Node::Command(_) => commands = commands.max(Some(depth[s])),
                }
            }
            let i = idx.index();
            depth[i] = match self.graph[idx] {
                Node::Package(_) => packages.map_or(0, |d| d + 1),
                Node::Command(_) => commands.map_or(0, |d| d + 1),
            };
            below_packages[i] = packages;
            below_commands[i] = commands;
        }

        let mut depths = HashMap::with_capacity(count);
        let mut packages = Vec::new();
        let mut commands = Vec::new();
        for (key, idx) in self.index {
            let sort_key = SortKey {
                priority: Reverse(self.graph[idx].unit().sort_priority()),
                depth: depth[idx.index()],
                key: key.clone(),
            };
            depths.insert(key, depth[idx.index()]);
            match &self.graph[idx] {
                Node::Package(p) => packages.push((sort_key, p.clone())),
                Node::Command(c) => commands.push((sort_key, c.clone())),
            }
        }
        packages.sort_by(|a, b| a.0.cmp(&b.0));
        commands.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(
            "resolved {} packages and {} commands",
            packages.len(),
            commands.len()
        );

        Ok(Resolution {
            packages: packages.into_iter().map(|(_, p)| p).collect(),
            commands: commands.into_iter().map(|(_, c)| c).collect(),
            depths,
        })
    }
}

/// Units declared on a content tree, not descending into the units themselves.
fn direct_units<'a, C: Content + ?Sized>(root: &'a C) -> Vec<UnitRef<'a>> {
    let mut units: Vec<UnitRef<'a>> = Vec::new();
    units.extend(root.packages().iter().map(UnitRef::Package));
    units.extend(root.commands().iter().map(UnitRef::Command));

    let mut seen = HashSet::new();
    let mut stack: Vec<&'a dyn Content> = root.sub_content().iter().map(|c| c.as_ref()).collect();
    while let Some(content) = stack.pop() {
        let address = content as *const dyn Content as *const () as usize;
        if !seen.insert(address) {
            continue;
        }
        units.extend(content.packages().iter().map(UnitRef::Package));
        units.extend(content.commands().iter().map(UnitRef::Command));
        stack.extend(content.sub_content().iter().map(|c| c.as_ref()));
    }
    units
}

/// Two or more declarations sharing a name that cannot coexist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    pub kind: UnitKind,
    pub name: String,
    pub declarations: usize,
}

impl From<NameConflict> for CoreError {
    fn from(conflict: NameConflict) -> Self {
        CoreError::NameConflict {
            kind: conflict.kind,
            name: conflict.name,
        }
    }
}

/// The deduplicated, ordered closure of a set of requirements.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    packages: Vec<Package>,
    commands: Vec<Command>,
    depths: HashMap<UnitKey, usize>,
}

impl Resolution {
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn depth_of(&self, key: &UnitKey) -> Option<usize> {
        self.depths.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.commands.is_empty()
    }

    /// Name clashes left in the resolved sets, e.g. one package loaded with
    /// two option lists.
    pub fn conflicts(&self) -> Vec<NameConflict> {
        let mut conflicts = Vec::new();

        let mut packages: BTreeMap<&str, Vec<&Package>> = BTreeMap::new();
        for p in &self.packages {
            packages.entry(p.name()).or_default().push(p);
        }
        for (name, group) in packages {
            let clash = group
                .iter()
                .enumerate()
                .any(|(i, a)| group[i + 1..].iter().any(|b| !a.can_coexist(b)));
            if clash {
                conflicts.push(NameConflict {
                    kind: UnitKind::Package,
                    name: name.to_string(),
                    declarations: group.len(),
                });
            }
        }

        let mut commands: BTreeMap<&str, Vec<&Command>> = BTreeMap::new();
        for c in &self.commands {
            commands.entry(c.name()).or_default().push(c);
        }
        for (name, group) in commands {
            let clash = group
                .iter()
                .enumerate()
                .any(|(i, a)| group[i + 1..].iter().any(|b| !a.can_coexist(b)));
            if clash {
                conflicts.push(NameConflict {
                    kind: UnitKind::Command,
                    name: name.to_string(),
                    declarations: group.len(),
                });
            }
        }

        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BasicContent, ContentRef, MultiContent};
    use crate::document::{Document, DocumentConfig};
    use std::sync::{Arc, OnceLock};

    fn names(packages: &[Package]) -> Vec<&str> {
        packages.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_dependencies_sort_before_dependents() {
        let tikz = Package::new("tikz");
        let pgfplots = Package::new("pgfplots").with_packages([tikz]);
        let content = BasicContent::new("plot").with_packages([pgfplots, Package::new("amsmath")]);

        let mut resolver = Resolver::new();
        resolver.add_content(&content);
        let resolution = resolver.resolve().unwrap();
        assert_eq!(names(resolution.packages()), ["amsmath", "tikz", "pgfplots"]);
    }

    #[test]
    fn test_command_requirements_reach_packages() {
        let siunitx = Package::new("siunitx");
        let sisetup = Command::new("sisetup", r"\sisetup{}").with_packages([siunitx]);
        let bundle = Command::bundle()
            .with_commands([sisetup])
            .with_packages([Package::new("relsize")]);
        let content = BasicContent::new("x").with_commands([bundle]);

        let mut resolver = Resolver::new();
        resolver.add_content(&content);
        let resolution = resolver.resolve().unwrap();
        assert_eq!(names(resolution.packages()), ["relsize", "siunitx"]);

        let commands: Vec<_> = resolution.commands().iter().map(|c| c.name()).collect();
        // The bundle depends on sisetup, so it sorts after it.
        assert_eq!(commands, ["sisetup", ""]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let a: ContentRef = Arc::new(BasicContent::new("a").with_packages([Package::new("xcolor")]));
        let b: ContentRef = Arc::new(BasicContent::new("b").with_packages([Package::new("xcolor")]));
        let multi = MultiContent::new([a, b]);

        let mut resolver = Resolver::new();
        resolver.add_content(&multi);
        let resolution = resolver.resolve().unwrap();
        assert_eq!(resolution.packages().len(), 1);
        assert!(resolution.conflicts().is_empty());
    }

    #[test]
    fn test_option_clash_is_reported() {
        let a = Package::new("geometry").with_options(["margin=1in"]);
        let b = Package::new("geometry").with_options(["margin=2in"]);
        let mut resolver = Resolver::new();
        resolver.add_package(&a);
        resolver.add_package(&b);
        let resolution = resolver.resolve().unwrap();

        assert_eq!(resolution.packages().len(), 2);
        assert_eq!(
            resolution.conflicts(),
            vec![NameConflict {
                kind: UnitKind::Package,
                name: "geometry".to_string(),
                declarations: 2,
            }]
        );
    }

    #[test]
    fn test_shared_setup_content_links_every_owner() {
        let shared: ContentRef =
            Arc::new(BasicContent::new(r"\relax").with_packages([Package::new("base")]));
        let first = Package::new("first").with_setup(shared.clone());
        let second = Package::new("second").with_setup(shared);

        let mut resolver = Resolver::new();
        resolver.add_package(&first);
        resolver.add_package(&second);
        let resolution = resolver.resolve().unwrap();

        assert_eq!(resolution.depth_of(&first.key()), Some(1));
        assert_eq!(resolution.depth_of(&second.key()), Some(1));
    }

    #[test]
    fn test_package_requirements_reach_commands() {
        let highlight = Command::new("hl", r"\newcommand{\hl}[1]{\colorbox{yellow}{#1}}");
        let setup: ContentRef = Arc::new(
            BasicContent::new(r"\pk{}").with_commands([Command::new("pk", r"\newcommand{\pk}{}")]),
        );
        let soul = Package::new("soul")
            .with_commands([highlight])
            .with_setup(setup);
        let content: ContentRef = Arc::new(BasicContent::new("x").with_packages([soul]));
        let doc = Document::new("main.tex", DocumentConfig::default(), vec![content]);

        let commands: Vec<_> = doc
            .sorted_commands()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(commands, ["hl", "pk"]);

        let preamble = doc.get_preamble().unwrap();
        assert!(preamble.contains("% Command: hl\n\\newcommand{\\hl}"));
        assert!(preamble.contains("% Command: pk\n\\newcommand{\\pk}{}"));
        let import = preamble.find(r"\usepackage{soul}").unwrap();
        assert!(import < preamble.find(r"\newcommand{\hl}").unwrap());
    }

    #[test]
    fn test_equal_copy_is_not_a_cycle() {
        let tikz = Package::new("tikz").with_packages([Package::new("tikz")]);
        assert_eq!(tikz.require_depth().unwrap(), 0);

        let mut resolver = Resolver::new();
        resolver.add_package(&tikz);
        assert_eq!(names(resolver.resolve().unwrap().packages()), ["tikz"]);
    }

    /// Setup content whose packages are filled in after construction.
    #[derive(Debug, Default)]
    struct LateBound {
        packages: OnceLock<Vec<Package>>,
    }

    impl Content for LateBound {
        fn packages(&self) -> &[Package] {
            self.packages.get().map(Vec::as_slice).unwrap_or_default()
        }

        fn render_body(&self, _indent: crate::content::Indent) -> String {
            r"\relax".to_string()
        }
    }

    #[test]
    fn test_cycle_is_rejected() {
        let setup = Arc::new(LateBound::default());
        let first = Package::new("first").with_setup(setup.clone());
        let second = Package::new("second").with_setup(
            Arc::new(BasicContent::new(r"\relax").with_packages([first.clone()])) as ContentRef,
        );
        setup.packages.set(vec![second]).unwrap();

        let mut resolver = Resolver::new();
        resolver.add_package(&first);
        match resolver.resolve() {
            Err(CoreError::CyclicDependency { kind, name }) => {
                assert_eq!(kind, UnitKind::Package);
                assert!(name == "first" || name == "second", "unexpected unit {name}");
            }
            other => panic!("expected a cycle error, got {other:?}"),
        }
        assert!(first.require_depth().is_err());
    }
}
