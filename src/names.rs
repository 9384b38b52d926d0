use fnv::{FnvHashMap, FnvHashSet};
use regex::Regex;

use crate::tree::{FixtureKind, FixtureNode, GroupNode, RawEntry, RawGroup};

/// How many numbered suffixes are tried before giving up on a name.
pub const MAX_SUFFIX_ATTEMPTS: usize = 1000;

pub const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield",
];

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum NameError {
    #[error(
        "cannot derive a unique name for `{ident}` in group `{group}` from: {}",
        .paths.join(", ")
    )]
    #[diagnostic(
        code(suitegen::names::collision),
        help("rename some of the fixtures so they no longer map to the same identifier")
    )]
    CollisionUnresolvable {
        group: String,
        ident: String,
        paths: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    #[default]
    Preserve,
    UpperFirst,
    LowerFirst,
    Snake,
}

impl Casing {
    pub fn apply(self, name: &str) -> String {
        match self {
            Casing::Preserve => name.to_owned(),
            Casing::UpperFirst => map_first(name, char::to_ascii_uppercase),
            Casing::LowerFirst => map_first(name, char::to_ascii_lowercase),
            Casing::Snake => to_snake_case(name),
        }
    }
}

fn map_first(name: &str, f: impl Fn(&char) -> char) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => std::iter::once(f(&first)).chain(chars).collect(),
        None => String::new(),
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Replaces everything but ASCII letters and digits with `_` and keeps the result from starting
/// with a digit.
///
/// A lone `_` is a reserved token in both Rust and Java, so names that come out empty or as a
/// single underscore become `__`.
pub fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if out.is_empty() || out == "_" {
        return "__".to_owned();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// The part of a file name that names the test.
///
/// If `filter` has a capture group that took part in the match, that is the stem (so
/// `^(.+)\.kts$` gives `adder` for `adder.kts`). Otherwise the last extension is dropped.
pub fn file_stem<'a>(name: &'a str, filter: &Regex) -> &'a str {
    if let Some(stem) = filter
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|stem| !stem.is_empty())
    {
        return stem;
    }

    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Casing and prefix rules for derived identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    pub group_casing: Casing,
    pub fixture_casing: Casing,
    pub fixture_prefix: String,
    /// `{dir}` is replaced by the group-cased directory name.
    pub check_name: String,
    /// Identifiers that get a trailing `_`.
    pub reserved: Vec<String>,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::preserve()
    }
}

impl NamingPolicy {
    pub fn preserve() -> Self {
        Self {
            group_casing: Casing::Preserve,
            fixture_casing: Casing::Preserve,
            fixture_prefix: String::new(),
            check_name: "all_files_present".to_owned(),
            reserved: Vec::new(),
        }
    }

    /// `testAdder` in `class Script` checked by `testAllFilesPresentInScript`.
    pub fn junit() -> Self {
        Self {
            group_casing: Casing::UpperFirst,
            fixture_casing: Casing::UpperFirst,
            fixture_prefix: "test".to_owned(),
            check_name: "testAllFilesPresentIn{dir}".to_owned(),
            reserved: Vec::new(),
        }
    }

    /// `test_adder` in `mod script` checked by `all_files_present`.
    pub fn rust() -> Self {
        Self {
            group_casing: Casing::Snake,
            fixture_casing: Casing::Snake,
            fixture_prefix: "test_".to_owned(),
            check_name: "all_files_present".to_owned(),
            reserved: RUST_KEYWORDS.iter().map(|kw| kw.to_string()).collect(),
        }
    }

    pub fn fixture_ident(&self, stem: &str) -> String {
        let ident = format!(
            "{}{}",
            self.fixture_prefix,
            self.fixture_casing.apply(&sanitize(stem))
        );
        self.unreserve(ident)
    }

    pub fn group_ident(&self, name: &str) -> String {
        self.unreserve(self.group_casing.apply(&sanitize(name)))
    }

    pub fn check_ident(&self, dir: &str) -> String {
        let dir = self.group_casing.apply(&sanitize(dir));
        self.unreserve(self.check_name.replace("{dir}", &dir))
    }

    fn unreserve(&self, mut ident: String) -> String {
        if self.reserved.iter().any(|r| *r == ident) {
            ident.push('_');
        }
        ident
    }
}

/// Hands out identifiers unique within one group, suffixing repeats with `_2`, `_3`, ...
#[derive(Debug)]
pub struct NameTable {
    group: String,
    taken: FnvHashSet<String>,
    origins: FnvHashMap<String, Vec<String>>,
}

impl NameTable {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            taken: FnvHashSet::default(),
            origins: FnvHashMap::default(),
        }
    }

    /// Claims `base` (or the first free suffixed form of it) for the entry at `origin`.
    pub fn claim(&mut self, base: String, origin: &str) -> Result<String, NameError> {
        self.origins
            .entry(base.clone())
            .or_default()
            .push(origin.to_owned());

        if self.taken.insert(base.clone()) {
            return Ok(base);
        }

        for n in 2..MAX_SUFFIX_ATTEMPTS + 2 {
            let candidate = format!("{base}_{n}");
            if self.taken.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }

        let paths = self.origins.remove(&base).unwrap_or_default();
        Err(NameError::CollisionUnresolvable {
            group: self.group.clone(),
            ident: base,
            paths,
        })
    }
}

/// Assigns identifiers and labels to a scanned tree.
///
/// `suite` names the root group; `check_dir` is the directory name the root's completeness check
/// is named after.
#[tracing::instrument(skip_all, fields(suite = %suite))]
pub fn name_tree(
    raw: RawGroup,
    suite: &str,
    check_dir: &str,
    recursive: bool,
    policy: &NamingPolicy,
) -> Result<GroupNode, NameError> {
    let ident = policy.group_ident(suite);
    let check_ident = policy.check_ident(check_dir);
    name_group(raw, ident, check_ident, suite.to_owned(), recursive, policy)
}

fn name_group(
    raw: RawGroup,
    ident: String,
    check_ident: String,
    label: String,
    recursive: bool,
    policy: &NamingPolicy,
) -> Result<GroupNode, NameError> {
    let mut table = NameTable::new(display_group(&raw));
    let check_ident = table.claim(check_ident, "<completeness check>")?;

    let mut groups = Vec::new();
    let mut fixtures = Vec::new();
    for entry in raw.entries {
        match entry {
            RawEntry::Fixture { path, kind } => {
                let name = path.name().unwrap_or_default().to_owned();
                let stem = match kind {
                    FixtureKind::File => file_stem(&name, &raw.filter),
                    FixtureKind::Directory => &name,
                };
                let ident = table.claim(policy.fixture_ident(stem), &path.to_string())?;
                fixtures.push(FixtureNode::new(path, ident, name, kind));
            }
            RawEntry::Group(child) => {
                let name = child.path.name().unwrap_or_default().to_owned();
                let ident = table.claim(policy.group_ident(&name), &child.path.to_string())?;
                let check_ident = policy.check_ident(&ident);
                groups.push(name_group(
                    child,
                    ident,
                    check_ident,
                    name,
                    recursive,
                    policy,
                )?);
            }
        }
    }

    Ok(GroupNode {
        path: raw.path,
        ident,
        label,
        check_ident,
        filter: raw.filter,
        recursive,
        groups,
        fixtures,
    })
}

fn display_group(raw: &RawGroup) -> String {
    if raw.path.is_root() {
        ".".to_owned()
    } else {
        raw.path.to_string()
    }
}
