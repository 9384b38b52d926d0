use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::completeness::CompletenessCheck;
use crate::names::NamingPolicy;
use crate::tree::{FixtureKind, GroupNode, SuiteTree};

/// A JSON table of every group, check and fixture, for runners that register tests from data.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestTemplate {
    pub naming: ManifestNaming,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestNaming {
    #[default]
    Preserve,
    Rust,
    Junit,
}

impl ManifestTemplate {
    pub fn naming(&self) -> NamingPolicy {
        match self.naming {
            ManifestNaming::Preserve => NamingPolicy::preserve(),
            ManifestNaming::Rust => NamingPolicy::rust(),
            ManifestNaming::Junit => NamingPolicy::junit(),
        }
    }

    pub fn render(&self, suite: &SuiteTree) -> Result<String, serde_json::Error> {
        let manifest = Manifest {
            generated_by: "suitegen, do not edit by hand",
            suite: &suite.name,
            root: &suite.root,
            group: group(suite, &suite.group),
        };

        let mut json = serde_json::to_string_pretty(&manifest)?;
        json.push('\n');
        Ok(json)
    }
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    generated_by: &'static str,
    suite: &'a str,
    root: &'a str,
    group: Group<'a>,
}

#[derive(Debug, Serialize)]
struct Group<'a> {
    id: &'a str,
    label: &'a str,
    dir: String,
    pattern: &'a str,
    recursive: bool,
    check: Check<'a>,
    fixtures: Vec<Fixture<'a>>,
    groups: Vec<Group<'a>>,
}

#[derive(Debug, Serialize)]
struct Check<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_dirs: Vec<String>,
    directory_fixtures: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    overrides: BTreeMap<String, String>,
    expected: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
struct Fixture<'a> {
    id: &'a str,
    label: &'a str,
    path: String,
    kind: FixtureKind,
}

fn group<'a>(suite: &SuiteTree, node: &'a GroupNode) -> Group<'a> {
    let check = CompletenessCheck::bind(suite, node);

    Group {
        id: node.ident(),
        label: node.label(),
        dir: check.dir.clone(),
        pattern: node.filter().as_str(),
        recursive: node.is_recursive(),
        check: Check {
            id: check.ident(),
            exclude: check.options.exclude.as_ref().map(|e| e.as_str().to_owned()),
            exclude_dirs: check.options.exclude_dirs.clone(),
            directory_fixtures: check.options.directory_fixtures,
            overrides: check.overrides().into_iter().collect(),
            expected: check.expected,
        },
        fixtures: node
            .fixtures()
            .iter()
            .map(|fixture| Fixture {
                id: fixture.ident(),
                label: fixture.label(),
                path: suite.project_path(&fixture.display_path()),
                kind: fixture.kind(),
            })
            .collect(),
        groups: node.groups().iter().map(|child| group(suite, child)).collect(),
    }
}
