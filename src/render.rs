use std::fmt;

use crate::completeness::CompletenessCheck;
use crate::names::NamingPolicy;
use crate::tree::{FixtureNode, GroupNode, SuiteTree};

mod junit;
mod manifest;
mod rust;
#[cfg(test)]
mod tests;

pub use junit::JUnitTemplate;
pub use manifest::ManifestTemplate;
pub use rust::{RustStyle, RustTemplate};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RenderError {
    #[error("failed to serialize the manifest")]
    #[diagnostic(code(suitegen::render::json))]
    Json(#[from] serde_json::Error),
}

/// Output format of a suite.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Template {
    Rust(RustTemplate),
    Junit(JUnitTemplate),
    Manifest(ManifestTemplate),
}

impl Default for Template {
    fn default() -> Self {
        Template::Rust(RustTemplate::default())
    }
}

impl Template {
    /// The naming convention of the target, before configuration overrides.
    pub fn naming(&self) -> NamingPolicy {
        match self {
            Template::Rust(t) => t.naming(),
            Template::Junit(t) => t.naming(),
            Template::Manifest(t) => t.naming(),
        }
    }

    #[tracing::instrument(skip_all, fields(suite = %suite.name))]
    pub fn render(&self, suite: &SuiteTree) -> Result<String, RenderError> {
        match self {
            Template::Rust(t) => Ok(walk(t, suite)),
            Template::Junit(t) => Ok(walk(t, suite)),
            Template::Manifest(t) => Ok(t.render(suite)?),
        }
    }
}

/// Source text with indentation and blank lines between units.
#[derive(Debug)]
pub(crate) struct CodeWriter {
    buf: String,
    indent: usize,
    unit: &'static str,
    block_start: bool,
}

impl CodeWriter {
    pub(crate) fn new(unit: &'static str) -> Self {
        Self {
            buf: String::new(),
            indent: 0,
            unit,
            block_start: true,
        }
    }

    pub(crate) fn line(&mut self, text: impl fmt::Display) {
        let text = text.to_string();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.buf.push_str(self.unit);
            }
            self.buf.push_str(&text);
        }
        self.buf.push('\n');
        self.block_start = false;
    }

    pub(crate) fn open(&mut self, text: impl fmt::Display) {
        self.line(text);
        self.indent += 1;
        self.block_start = true;
    }

    pub(crate) fn close(&mut self, text: impl fmt::Display) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    /// Starts a new unit; separated from the previous one by a blank line.
    pub(crate) fn unit(&mut self) {
        if !self.block_start {
            self.buf.push('\n');
        }
        self.block_start = false;
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

/// The source-text side of a template, driven by [`walk`].
pub(crate) trait Emit {
    fn writer(&self) -> CodeWriter;

    fn header(&self, out: &mut CodeWriter, suite: &SuiteTree);

    fn begin_group(&self, out: &mut CodeWriter, suite: &SuiteTree, group: &GroupNode, root: bool);

    fn check(&self, out: &mut CodeWriter, check: &CompletenessCheck<'_>);

    fn fixtures(&self, out: &mut CodeWriter, suite: &SuiteTree, group: &GroupNode) {
        for fixture in group.fixtures() {
            self.fixture(out, suite, fixture);
        }
    }

    fn fixture(&self, out: &mut CodeWriter, suite: &SuiteTree, fixture: &FixtureNode);

    fn end_group(&self, out: &mut CodeWriter, group: &GroupNode, root: bool);
}

/// Depth first in stored order: the check of a group first, then its fixtures, then its subgroups.
pub(crate) fn walk(emit: &impl Emit, suite: &SuiteTree) -> String {
    let mut out = emit.writer();
    emit.header(&mut out, suite);
    walk_group(emit, &mut out, suite, &suite.group, true);
    out.finish()
}

fn walk_group(
    emit: &impl Emit,
    out: &mut CodeWriter,
    suite: &SuiteTree,
    group: &GroupNode,
    root: bool,
) {
    emit.begin_group(out, suite, group, root);
    emit.check(out, &CompletenessCheck::bind(suite, group));
    emit.fixtures(out, suite, group);
    for child in group.groups() {
        walk_group(emit, out, suite, child, false);
    }
    emit.end_group(out, group, root);
}
