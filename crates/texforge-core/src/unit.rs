//! Package and command declarations.
//!
//! Both kinds are *dependency units*: a name, optional setup code emitted once
//! in the preamble, and further units they depend on. Units compare and hash
//! structurally through their [`UnitKey`], so the same declaration constructed
//! in two places deduplicates to a single preamble entry.
//!
//! Ordering needs the position of a unit in the requirement graph, which is
//! only known after resolution. It is therefore exposed as an explicit
//! [`SortKey`] rather than an `Ord` impl.

use crate::content::{BasicContent, ContentRef, Indent};
use crate::error::{CoreError, Result};
use crate::resolve::{Resolver, UnitRef};
use std::cmp::Reverse;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitKind {
    Package,
    Command,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Package => f.write_str("package"),
            UnitKind::Command => f.write_str("command"),
        }
    }
}

/// Canonical identity of a unit.
///
/// Anonymous command bundles carry the keys of their members, so two bundles
/// only collapse into one when they group the same units.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    pub name: String,
    pub options: Vec<String>,
    pub code: String,
    pub members: Vec<UnitKey>,
    pub kind: UnitKind,
}

/// Total order used for preamble emission:
/// higher priority first, then shallower requirement depth, then identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub priority: Reverse<i32>,
    pub depth: usize,
    pub key: UnitKey,
}

/// Setup content of a unit together with its rendered code.
#[derive(Debug, Clone)]
pub struct Setup {
    content: ContentRef,
    code: String,
}

impl Setup {
    pub fn new(content: ContentRef) -> Self {
        let code = content.latex_code_body(Indent::default());
        Self { content, code }
    }

    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Behaviour shared by packages and commands.
pub trait DependencyUnit {
    fn kind(&self) -> UnitKind;

    /// Display name; empty for anonymous bundles.
    fn name(&self) -> &str;

    fn key(&self) -> UnitKey;

    fn sort_priority(&self) -> i32;

    fn setup(&self) -> Option<&Setup>;

    /// Packages declared directly on this unit.
    fn packages(&self) -> &[Package];

    /// Commands declared directly on this unit.
    fn commands(&self) -> &[Command];

    /// The one-time setup block, headed by a comment naming the unit.
    fn latex_code_setup(&self) -> Option<String>;

    fn as_unit_ref(&self) -> UnitRef<'_>;

    /// Every package reachable from this unit, deduplicated and sorted.
    fn required_packages(&self) -> Result<Vec<Package>> {
        let own = self.key();
        let mut resolver = Resolver::new();
        resolver.add_unit(self.as_unit_ref());
        let resolution = resolver.resolve()?;
        Ok(resolution
            .packages()
            .iter()
            .filter(|p| p.key() != own)
            .cloned()
            .collect())
    }

    /// Every command reachable from this unit, deduplicated and sorted.
    fn required_commands(&self) -> Result<Vec<Command>> {
        let own = self.key();
        let mut resolver = Resolver::new();
        resolver.add_unit(self.as_unit_ref());
        let resolution = resolver.resolve()?;
        Ok(resolution
            .commands()
            .iter()
            .filter(|c| c.key() != own)
            .cloned()
            .collect())
    }

    /// Length of the longest chain of same-kind requirements below this unit.
    ///
    /// Fails with [`CoreError::CyclicDependency`] when the unit requires itself
    /// through another unit.
    fn require_depth(&self) -> Result<usize> {
        let own = self.key();
        let mut resolver = Resolver::new();
        resolver.add_unit(self.as_unit_ref());
        let resolution = resolver.resolve()?;
        Ok(resolution.depth_of(&own).unwrap_or(0))
    }

    fn sort_key(&self) -> Result<SortKey> {
        Ok(SortKey {
            priority: Reverse(self.sort_priority()),
            depth: self.require_depth()?,
            key: self.key(),
        })
    }
}

/// A `\usepackage` declaration.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    options: Vec<String>,
    setup: Option<Setup>,
    sort_priority: i32,
    packages: Vec<Package>,
    commands: Vec<Command>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            setup: None,
            sort_priority: 0,
            packages: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_setup(mut self, content: ContentRef) -> Self {
        self.setup = Some(Setup::new(content));
        self
    }

    pub fn with_setup_code(self, code: impl Into<String>) -> Self {
        self.with_setup(Arc::new(BasicContent::new(code)))
    }

    pub fn with_priority(mut self, sort_priority: i32) -> Self {
        self.sort_priority = sort_priority;
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

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn setup_content(&self) -> Option<&ContentRef> {
        self.setup.as_ref().map(Setup::content)
    }

    /// Renders `\usepackage[options]{name}`.
    pub fn latex_code_import(&self) -> String {
        format!(
            "\\usepackage{}{{{}}}",
            crate::text::bracket_options(&self.options),
            self.name
        )
    }

    /// Two packages conflict when they share a name but are not the same
    /// declaration (e.g. `geometry` loaded with two different option sets).
    pub fn can_coexist(&self, other: &Package) -> bool {
        self.name != other.name || self == other
    }

    pub fn can_merge(&self, _other: &Package) -> bool {
        false
    }

    pub fn merge(&self, other: &Package) -> Result<Package> {
        if !self.can_merge(other) {
            return Err(CoreError::NameConflict {
                kind: UnitKind::Package,
                name: format!("{}, {}", self.name, other.name),
            });
        }
        Ok(self.clone())
    }
}

impl DependencyUnit for Package {
    fn kind(&self) -> UnitKind {
        UnitKind::Package
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> UnitKey {
        UnitKey {
            name: self.name.clone(),
            options: self.options.clone(),
            code: self.setup.as_ref().map(|s| s.code.clone()).unwrap_or_default(),
            members: Vec::new(),
            kind: UnitKind::Package,
        }
    }

    fn sort_priority(&self) -> i32 {
        self.sort_priority
    }

    fn setup(&self) -> Option<&Setup> {
        self.setup.as_ref()
    }

    fn packages(&self) -> &[Package] {
        &self.packages
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn latex_code_setup(&self) -> Option<String> {
        let setup = self.setup.as_ref()?;
        Some(format!("% Setup package: {}\n{}", self.name, setup.code))
    }

    fn as_unit_ref(&self) -> UnitRef<'_> {
        UnitRef::Package(self)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// A custom command definition, or an anonymous bundle of requirements.
#[derive(Debug, Clone)]
pub struct Command {
    name: Option<String>,
    setup: Option<Setup>,
    sort_priority: i32,
    packages: Vec<Package>,
    commands: Vec<Command>,
}

impl Command {
    pub fn new(name: impl Into<String>, setup_code: impl Into<String>) -> Self {
        Self::with_content(name, Arc::new(BasicContent::new(setup_code)))
    }

    pub fn with_content(name: impl Into<String>, setup: ContentRef) -> Self {
        Self {
            name: Some(name.into()),
            setup: Some(Setup::new(setup)),
            sort_priority: 0,
            packages: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// An unnamed command without setup code that only groups requirements.
    pub fn bundle() -> Self {
        Self {
            name: None,
            setup: None,
            sort_priority: 0,
            packages: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_priority(mut self, sort_priority: i32) -> Self {
        self.sort_priority = sort_priority;
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

    pub fn is_anonymous(&self) -> bool {
        self.name.as_deref().map_or(true, str::is_empty)
    }

    pub fn setup_content(&self) -> Option<&ContentRef> {
        self.setup.as_ref().map(Setup::content)
    }

    pub fn can_coexist(&self, other: &Command) -> bool {
        self.name() != other.name() || self.is_anonymous() || self == other
    }

    pub fn can_merge(&self, _other: &Command) -> bool {
        false
    }

    pub fn merge(&self, other: &Command) -> Result<Command> {
        if !self.can_merge(other) {
            return Err(CoreError::NameConflict {
                kind: UnitKind::Command,
                name: format!("{}, {}", self.name(), other.name()),
            });
        }
        Ok(self.clone())
    }
}

impl DependencyUnit for Command {
    fn kind(&self) -> UnitKind {
        UnitKind::Command
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    fn key(&self) -> UnitKey {
        let mut members = Vec::new();
        if self.is_anonymous() {
            members.extend(self.packages.iter().map(Package::key));
            members.extend(self.commands.iter().map(Command::key));
            members.sort();
        }
        UnitKey {
            name: self.name().to_string(),
            options: Vec::new(),
            code: self.setup.as_ref().map(|s| s.code.clone()).unwrap_or_default(),
            members,
            kind: UnitKind::Command,
        }
    }

    fn sort_priority(&self) -> i32 {
        self.sort_priority
    }

    fn setup(&self) -> Option<&Setup> {
        self.setup.as_ref()
    }

    fn packages(&self) -> &[Package] {
        &self.packages
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn latex_code_setup(&self) -> Option<String> {
        let setup = self.setup.as_ref()?;
        Some(format!("% Command: {}\n{}", self.name(), setup.code))
    }

    fn as_unit_ref(&self) -> UnitRef<'_> {
        UnitRef::Command(self)
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
