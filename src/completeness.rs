use std::collections::BTreeSet;
use std::path::Path;

use crate::scanner::{list_matching_files, ScanError, ScanOptions};
use crate::tree::{GroupNode, SuiteTree};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CompletenessError {
    #[error(
        "fixtures in `{dir}` changed since the suite was generated (missing: [{}], unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    #[diagnostic(
        code(suitegen::completeness::stale),
        help("regenerate the suite with `suitegen generate`")
    )]
    Stale {
        dir: String,
        /// Recorded at generation time but gone from disk.
        missing: Vec<String>,
        /// On disk but not recorded.
        unexpected: Vec<String>,
    },

    #[error("invalid fixture pattern `{pattern}`")]
    #[diagnostic(code(suitegen::completeness::pattern))]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scan(#[from] ScanError),
}

/// The "all files present" check of one group.
///
/// Borrows the group it guards; everything else is what the check needs to repeat the scan later.
#[derive(Debug, Clone)]
pub struct CompletenessCheck<'a> {
    pub group: &'a GroupNode,
    /// The group's directory relative to the project root.
    pub dir: String,
    /// Options for scanning `dir` as a root.
    pub options: ScanOptions,
    /// Fixture paths relative to `dir`.
    pub expected: BTreeSet<String>,
}

impl<'a> CompletenessCheck<'a> {
    pub fn bind(suite: &SuiteTree, group: &'a GroupNode) -> Self {
        let options = suite.options.rebased(group.path(), group.filter().clone());
        let fixtures = if group.is_recursive() {
            group.all_fixtures()
        } else {
            group.fixtures().iter().collect()
        };

        let expected = fixtures
            .into_iter()
            .map(|fixture| {
                let path = fixture.display_path();
                relative_to(&path, &group.path().to_string())
            })
            .collect();

        Self {
            group,
            dir: suite.project_path(&group.path().to_string()),
            options,
            expected,
        }
    }

    pub fn ident(&self) -> &'a str {
        self.group.check_ident()
    }

    /// Overrides below the group as `(directory, pattern)`, relative to the group.
    pub fn overrides(&self) -> Vec<(String, String)> {
        self.options
            .overrides
            .iter()
            .map(|(dir, filter)| (dir.to_string(), filter.as_str().to_owned()))
            .collect()
    }

    /// Repeats the scan below `project_root` and compares it with what was recorded.
    pub fn verify(&self, project_root: &Path) -> Result<(), CompletenessError> {
        let actual = list_matching_files(project_root.join(&self.dir), &self.options)?;
        compare(&self.dir, &self.expected, &actual)
    }
}

fn relative_to(path: &str, dir: &str) -> String {
    if dir.is_empty() {
        return path.to_owned();
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
        .to_owned()
}

/// One check per group, depth first, parents before children.
pub fn checks(suite: &SuiteTree) -> Vec<CompletenessCheck<'_>> {
    suite
        .group
        .all_groups()
        .into_iter()
        .map(|group| CompletenessCheck::bind(suite, group))
        .collect()
}

/// Fails with the symmetric difference of the two sets, if there is one.
pub fn compare(
    dir: &str,
    expected: &BTreeSet<String>,
    actual: &BTreeSet<String>,
) -> Result<(), CompletenessError> {
    let missing: Vec<String> = expected.difference(actual).cloned().collect();
    let unexpected: Vec<String> = actual.difference(expected).cloned().collect();
    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }

    Err(CompletenessError::Stale {
        dir: dir.to_owned(),
        missing,
        unexpected,
    })
}
