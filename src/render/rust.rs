use crate::completeness::CompletenessCheck;
use crate::names::NamingPolicy;
use crate::tree::{FixtureNode, GroupNode, SuiteTree};

use super::{CodeWriter, Emit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RustStyle {
    /// One `#[test]` function per fixture.
    #[default]
    Functions,
    /// One `rstest` case per fixture, all driven by a single function per group.
    Cases,
}

/// Name of the per-group `rstest` function in the `cases` style.
const CASES_FN: &str = "fixtures";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RustTemplate {
    pub style: RustStyle,
    /// Called with the project-relative path of every fixture.
    pub runner: String,
    /// Module providing `PresenceCheck` and `assert_all_files_present`.
    pub runtime: String,
    /// Emitted verbatim after the header.
    pub preamble: Vec<String>,
}

impl Default for RustTemplate {
    fn default() -> Self {
        Self {
            style: RustStyle::Functions,
            runner: "run_test".to_owned(),
            runtime: "::suitegen::runtime".to_owned(),
            preamble: Vec::new(),
        }
    }
}

impl RustTemplate {
    pub fn naming(&self) -> NamingPolicy {
        let mut policy = NamingPolicy::rust();
        // Generated modules must not shadow the paths the output itself refers to.
        policy.reserved.push("rstest".to_owned());
        policy.reserved.extend(self.runtime_root().map(str::to_owned));
        let modules = self.preamble.iter().map(String::as_str).filter_map(preamble_mod);
        policy.reserved.extend(modules.map(str::to_owned));
        if self.style == RustStyle::Cases {
            // rstest turns the case function into a module of the same name
            policy.fixture_prefix.clear();
            policy.reserved.push(CASES_FN.to_owned());
        }
        policy
    }

    /// The crate or module the runtime path starts from.
    fn runtime_root(&self) -> Option<&str> {
        self.runtime
            .trim_start_matches("::")
            .split("::")
            .next()
            .filter(|root| !root.is_empty())
    }
}

/// The module a preamble line such as `mod common;` or `pub(crate) mod util;` declares.
fn preamble_mod(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line
        .strip_prefix("pub ")
        .or_else(|| line.strip_prefix("pub(crate) "))
        .unwrap_or(line);
    let name = rest.strip_prefix("mod ")?.trim().strip_suffix(';')?.trim();
    (!name.is_empty()).then_some(name)
}

impl Emit for RustTemplate {
    fn writer(&self) -> CodeWriter {
        CodeWriter::new("    ")
    }

    fn header(&self, out: &mut CodeWriter, suite: &SuiteTree) {
        out.line(format_args!(
            "// @generated by suitegen from suite `{}`. Do not edit by hand.",
            suite.name
        ));
        out.line(format_args!("// Fixtures: {}", suite.root));
        out.line("");
        out.line(r#"#![allow(non_snake_case, reason = "test names follow fixture names")]"#);
        if !self.preamble.is_empty() {
            out.line("");
            for line in &self.preamble {
                out.line(line);
            }
        }
    }

    fn begin_group(&self, out: &mut CodeWriter, _: &SuiteTree, group: &GroupNode, root: bool) {
        if root {
            return;
        }
        out.unit();
        out.open(format_args!("mod {} {{", group.ident()));
        out.line("use super::*;");
    }

    fn check(&self, out: &mut CodeWriter, check: &CompletenessCheck<'_>) {
        let runtime = &self.runtime;
        out.unit();
        out.line("#[test]");
        out.open(format_args!("fn {}() {{", check.ident()));
        out.open(format_args!(
            "{runtime}::assert_all_files_present(&{runtime}::PresenceCheck {{"
        ));
        out.line(format_args!("dir: {:?},", check.dir));
        out.line(format_args!("pattern: {:?},", check.options.filter.as_str()));
        match &check.options.exclude {
            Some(exclude) => out.line(format_args!("exclude: Some({:?}),", exclude.as_str())),
            None => out.line("exclude: None,"),
        }
        out.line(format_args!(
            "exclude_dirs: &[{}],",
            check
                .options
                .exclude_dirs
                .iter()
                .map(|d| format!("{d:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        out.line(format_args!("recursive: {},", check.options.recursive));
        out.line(format_args!(
            "directory_fixtures: {},",
            check.options.directory_fixtures
        ));
        out.line(format_args!(
            "overrides: &[{}],",
            check
                .overrides()
                .iter()
                .map(|(dir, pattern)| format!("({dir:?}, {pattern:?})"))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        if check.expected.is_empty() {
            out.line("expected: &[],");
        } else {
            out.open("expected: &[");
            for path in &check.expected {
                out.line(format_args!("{path:?},"));
            }
            out.close("],");
        }
        out.close("});");
        out.close("}");
    }

    fn fixtures(&self, out: &mut CodeWriter, suite: &SuiteTree, group: &GroupNode) {
        match self.style {
            RustStyle::Functions => {
                for fixture in group.fixtures() {
                    self.fixture(out, suite, fixture);
                }
            }
            RustStyle::Cases => {
                if group.fixtures().is_empty() {
                    return;
                }
                out.unit();
                out.line("#[::rstest::rstest]");
                for fixture in group.fixtures() {
                    out.line(format_args!(
                        "#[case::{}({:?})]",
                        fixture.ident(),
                        suite.project_path(&fixture.display_path())
                    ));
                }
                out.open(format_args!("fn {CASES_FN}(#[case] path: &str) {{"));
                out.line(format_args!("{}(path);", self.runner));
                out.close("}");
            }
        }
    }

    fn fixture(&self, out: &mut CodeWriter, suite: &SuiteTree, fixture: &FixtureNode) {
        out.unit();
        out.line("#[test]");
        out.line(format_args!("#[doc = {:?}]", fixture.label()));
        out.open(format_args!("fn {}() {{", fixture.ident()));
        out.line(format_args!(
            "{}({:?});",
            self.runner,
            suite.project_path(&fixture.display_path())
        ));
        out.close("}");
    }

    fn end_group(&self, out: &mut CodeWriter, _: &GroupNode, root: bool) {
        if !root {
            out.close("}");
        }
    }
}
