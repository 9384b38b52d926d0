//! Support code called by generated suites while they run.
//!
//! A generated completeness check is a [`PresenceCheck`] literal handed to
//! [`assert_all_files_present`], which repeats the generation-time scan and fails the test when
//! the fixtures on disk no longer match the generated tests.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;

use crate::common::RelPath;
use crate::completeness::{compare, CompletenessError};
use crate::scanner::{list_matching_files, ScanOptions};

/// Everything a generated completeness check records about its group.
#[derive(Debug, Clone, Copy)]
pub struct PresenceCheck<'a> {
    /// Group directory, relative to the directory tests run in.
    pub dir: &'a str,
    pub pattern: &'a str,
    pub exclude: Option<&'a str>,
    pub exclude_dirs: &'a [&'a str],
    pub recursive: bool,
    pub directory_fixtures: bool,
    /// `(directory relative to dir, pattern)`
    pub overrides: &'a [(&'a str, &'a str)],
    pub expected: &'a [&'a str],
}

impl PresenceCheck<'_> {
    pub fn scan_options(&self) -> Result<ScanOptions, CompletenessError> {
        let mut options = ScanOptions::new(compile(self.pattern)?)
            .recursive(self.recursive)
            .with_directory_fixtures(self.directory_fixtures);

        if let Some(exclude) = self.exclude {
            options = options.with_exclude(compile(exclude)?);
        }
        for dir in self.exclude_dirs {
            options = options.with_excluded_dir(*dir);
        }
        for (dir, pattern) in self.overrides {
            options = options.with_override(RelPath::parse(dir), compile(pattern)?);
        }

        Ok(options)
    }

    /// Checks the fixtures below `base.join(self.dir)`.
    pub fn verify_in(&self, base: &Path) -> Result<(), CompletenessError> {
        let options = self.scan_options()?;
        let actual = list_matching_files(base.join(self.dir), &options)?;
        let expected: BTreeSet<String> = self.expected.iter().map(|s| s.to_string()).collect();
        compare(self.dir, &expected, &actual)
    }

    pub fn verify(&self) -> Result<(), CompletenessError> {
        self.verify_in(Path::new("."))
    }
}

fn compile(pattern: &str) -> Result<Regex, CompletenessError> {
    Regex::new(pattern).map_err(|source| CompletenessError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })
}

/// Panics with a rendered report when the check fails.
#[track_caller]
pub fn assert_all_files_present(check: &PresenceCheck<'_>) {
    if let Err(err) = check.verify() {
        let summary = err.to_string();
        panic!("{summary}\n{:?}", miette::Report::new(err));
    }
}
