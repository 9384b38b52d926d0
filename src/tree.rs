use std::path::Path;

use regex::Regex;

use crate::common::RelPath;
use crate::scanner::{ScanEntry, ScanError, ScanOptions, Scanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    File,
    Directory,
}

/// A directory level as scanned, before any names are assigned.
#[derive(Debug, Clone)]
pub struct RawGroup {
    pub path: RelPath,
    pub filter: Regex,
    /// Scan order, subgroups and fixtures interleaved.
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone)]
pub enum RawEntry {
    Group(RawGroup),
    Fixture { path: RelPath, kind: FixtureKind },
}

impl RawGroup {
    fn new(path: RelPath, filter: Regex) -> Self {
        Self {
            path,
            filter,
            entries: Vec::new(),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &RawGroup> {
        self.entries.iter().filter_map(|entry| match entry {
            RawEntry::Group(group) => Some(group),
            RawEntry::Fixture { .. } => None,
        })
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &RelPath> {
        self.entries.iter().filter_map(|entry| match entry {
            RawEntry::Fixture { path, .. } => Some(path),
            RawEntry::Group(_) => None,
        })
    }
}

/// Mirrors the directory hierarchy below `root` into a tree of groups.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn build_tree(root: &Path, options: &ScanOptions) -> Result<RawGroup, ScanError> {
    let scanner = Scanner::new(root, options)?;
    let mut stack = vec![RawGroup::new(RelPath::root(), scanner.root_filter())];

    for entry in scanner {
        let entry = entry?;
        // Entries arrive depth first, so everything deeper than the entry's parent is complete.
        close_groups(&mut stack, entry.path().depth());
        let fixture = match entry {
            ScanEntry::Directory { path, filter } => {
                stack.push(RawGroup::new(path, filter));
                continue;
            }
            ScanEntry::File(path) => RawEntry::Fixture {
                path,
                kind: FixtureKind::File,
            },
            ScanEntry::DirectoryFixture(path) => RawEntry::Fixture {
                path,
                kind: FixtureKind::Directory,
            },
        };

        let Some(current) = stack.last_mut() else {
            unreachable!("the root group is never closed while scanning")
        };
        current.entries.push(fixture);
    }

    close_groups(&mut stack, 1);
    let Some(root) = stack.pop() else {
        unreachable!("the root group is never closed while scanning")
    };

    Ok(root)
}

fn close_groups(stack: &mut Vec<RawGroup>, depth: usize) {
    while stack.len() > depth.max(1) {
        let Some(group) = stack.pop() else { break };
        if let Some(parent) = stack.last_mut() {
            parent.entries.push(RawEntry::Group(group));
        }
    }
}

/// One fixture of a named group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureNode {
    path: RelPath,
    ident: String,
    label: String,
    kind: FixtureKind,
}

impl FixtureNode {
    pub(crate) fn new(path: RelPath, ident: String, label: String, kind: FixtureKind) -> Self {
        Self {
            path,
            ident,
            label,
            kind,
        }
    }

    /// Relative to the suite root.
    pub fn path(&self) -> &RelPath {
        &self.path
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> FixtureKind {
        self.kind
    }

    /// The path as it appears in listings; directory fixtures end with `/`.
    pub fn display_path(&self) -> String {
        match self.kind {
            FixtureKind::File => self.path.to_string(),
            FixtureKind::Directory => format!("{}/", self.path),
        }
    }
}

/// One directory level with its derived names.
#[derive(Debug, Clone)]
pub struct GroupNode {
    pub(crate) path: RelPath,
    pub(crate) ident: String,
    pub(crate) label: String,
    pub(crate) check_ident: String,
    pub(crate) filter: Regex,
    pub(crate) recursive: bool,
    pub(crate) groups: Vec<GroupNode>,
    pub(crate) fixtures: Vec<FixtureNode>,
}

impl GroupNode {
    /// Relative to the suite root.
    pub fn path(&self) -> &RelPath {
        &self.path
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn check_ident(&self) -> &str {
        &self.check_ident
    }

    pub fn filter(&self) -> &Regex {
        &self.filter
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn groups(&self) -> &[GroupNode] {
        &self.groups
    }

    pub fn fixtures(&self) -> &[FixtureNode] {
        &self.fixtures
    }

    /// Every fixture of this group and its subgroups, in emission order.
    pub fn all_fixtures(&self) -> Vec<&FixtureNode> {
        let mut out = Vec::new();
        self.collect_fixtures(&mut out);
        out
    }

    fn collect_fixtures<'a>(&'a self, out: &mut Vec<&'a FixtureNode>) {
        out.extend(self.fixtures.iter());
        for group in &self.groups {
            group.collect_fixtures(out);
        }
    }

    /// This group followed by all of its descendants, depth first.
    pub fn all_groups(&self) -> Vec<&GroupNode> {
        let mut out = vec![self];
        for group in &self.groups {
            out.extend(group.all_groups());
        }
        out
    }
}

/// The named tree of one suite together with what renderers need to know about the suite itself.
#[derive(Debug, Clone)]
pub struct SuiteTree {
    pub name: String,
    /// Suite root relative to the project root, `/`-separated.
    pub root: String,
    pub options: ScanOptions,
    pub group: GroupNode,
}

impl SuiteTree {
    /// `path` (relative to the suite root) as seen from the project root.
    pub fn project_path(&self, path: &str) -> String {
        crate::common::join_display(&self.root, path)
    }
}
