use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use crate::config::Suite;
use crate::names::{name_tree, NameError};
use crate::render::RenderError;
use crate::scanner::ScanError;
use crate::tree::{build_tree, SuiteTree};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SuiteErrorKind {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),
}

/// One suite could not be generated; the others are unaffected.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("suite `{suite}` could not be generated")]
#[diagnostic(code(suitegen::generate::suite))]
pub struct SuiteError {
    pub suite: String,
    #[source]
    #[diagnostic_source]
    pub kind: SuiteErrorKind,
}

impl SuiteError {
    fn new(suite: &Suite, kind: impl Into<SuiteErrorKind>) -> Self {
        Self {
            suite: suite.name.clone(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum OutputError {
    #[error("failed to write `{}`", .path.display())]
    #[diagnostic(code(suitegen::output::write))]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read `{}`", .path.display())]
    #[diagnostic(code(suitegen::output::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` of suite `{suite}` is out of date", .path.display())]
    #[diagnostic(
        code(suitegen::output::stale),
        help("run `suitegen generate` and commit the result")
    )]
    Stale { suite: String, path: PathBuf },

    #[error("`{}` of suite `{suite}` has not been generated", .path.display())]
    #[diagnostic(
        code(suitegen::output::missing),
        help("run `suitegen generate` and commit the result")
    )]
    Missing { suite: String, path: PathBuf },
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GenerationError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Suite(#[from] SuiteError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Output(#[from] OutputError),
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{} of {total} suites failed", .errors.len())]
#[diagnostic(code(suitegen::generate::failed))]
pub struct GenerationErrors {
    pub total: usize,
    #[related]
    pub errors: Vec<GenerationError>,
}

/// The rendered text of one suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub suite: String,
    /// Relative to the project root.
    pub output: PathBuf,
    pub contents: String,
    pub groups: usize,
    pub fixtures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Scans and names one suite.
pub fn build_suite(project_root: &Path, suite: &Suite) -> Result<SuiteTree, SuiteError> {
    let root = project_root.join(&suite.root);
    let raw = build_tree(&root, &suite.options).map_err(|e| SuiteError::new(suite, e))?;
    let group = name_tree(
        raw,
        &suite.name,
        suite.root_dir_name(),
        suite.options.recursive,
        &suite.naming,
    )
    .map_err(|e| SuiteError::new(suite, e))?;

    Ok(SuiteTree {
        name: suite.name.clone(),
        root: suite.root.clone(),
        options: suite.options.clone(),
        group,
    })
}

#[tracing::instrument(skip_all, fields(suite = %suite.name))]
pub fn generate_suite(project_root: &Path, suite: &Suite) -> Result<Generated, SuiteError> {
    let tree = build_suite(project_root, suite)?;
    let contents = suite
        .template
        .render(&tree)
        .map_err(|e| SuiteError::new(suite, e))?;

    let generated = Generated {
        suite: suite.name.clone(),
        output: suite.output.clone(),
        contents,
        groups: tree.group.all_groups().len(),
        fixtures: tree.group.all_fixtures().len(),
    };
    tracing::debug!(
        groups = generated.groups,
        fixtures = generated.fixtures,
        "generated"
    );
    Ok(generated)
}

/// Results are in the order of `suites`, whether or not they ran in parallel.
pub fn generate_all(
    project_root: &Path,
    suites: &[Suite],
    parallel: bool,
) -> Vec<Result<Generated, SuiteError>> {
    if !parallel || suites.len() < 2 {
        return suites
            .iter()
            .map(|suite| generate_suite(project_root, suite))
            .collect();
    }

    let current = tracing::Span::current();
    thread::scope(|scope| {
        let handles: Vec<_> = suites
            .iter()
            .map(|suite| {
                let span = current.clone();
                scope.spawn(move || span.in_scope(|| generate_suite(project_root, suite)))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Writes the output unless the file already holds exactly `generated.contents`.
pub fn write_output(project_root: &Path, generated: &Generated) -> Result<WriteOutcome, OutputError> {
    let path = project_root.join(&generated.output);
    if read_existing(&path)?.as_deref() == Some(generated.contents.as_str()) {
        tracing::debug!(path = %path.display(), "unchanged");
        return Ok(WriteOutcome::Unchanged);
    }

    let write_err = |source: io::Error| OutputError::Write {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&path, &generated.contents).map_err(write_err)?;
    tracing::info!(path = %path.display(), "written");
    Ok(WriteOutcome::Written)
}

/// Fails if the output on disk differs from what would be generated now.
pub fn check_output(project_root: &Path, generated: &Generated) -> Result<(), OutputError> {
    let path = project_root.join(&generated.output);
    match read_existing(&path)? {
        Some(existing) if existing == generated.contents => Ok(()),
        Some(_) => Err(OutputError::Stale {
            suite: generated.suite.clone(),
            path: generated.output.clone(),
        }),
        None => Err(OutputError::Missing {
            suite: generated.suite.clone(),
            path: generated.output.clone(),
        }),
    }
}

fn read_existing(path: &Path) -> Result<Option<String>, OutputError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(OutputError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Generates every suite and writes the outputs of those that succeeded.
pub fn generate(
    project_root: &Path,
    suites: &[Suite],
    parallel: bool,
) -> Result<Vec<(Generated, WriteOutcome)>, GenerationErrors> {
    let mut done = Vec::new();
    let mut errors = Vec::new();

    for result in generate_all(project_root, suites, parallel) {
        match result.map_err(GenerationError::from).and_then(|generated| {
            let outcome = write_output(project_root, &generated)?;
            Ok((generated, outcome))
        }) {
            Ok(ok) => done.push(ok),
            Err(e) => {
                tracing::error!(error = %e, "suite failed");
                errors.push(e);
            }
        }
    }

    finish(done, errors, suites.len())
}

/// Regenerates every suite in memory and compares the result with the outputs on disk.
pub fn check(project_root: &Path, suites: &[Suite], parallel: bool) -> Result<Vec<Generated>, GenerationErrors> {
    let mut done = Vec::new();
    let mut errors = Vec::new();

    for result in generate_all(project_root, suites, parallel) {
        match result.map_err(GenerationError::from).and_then(|generated| {
            check_output(project_root, &generated)?;
            Ok(generated)
        }) {
            Ok(ok) => done.push(ok),
            Err(e) => errors.push(e),
        }
    }

    finish(done, errors, suites.len())
}

fn finish<T>(done: Vec<T>, errors: Vec<GenerationError>, total: usize) -> Result<Vec<T>, GenerationErrors> {
    if errors.is_empty() {
        Ok(done)
    } else {
        Err(GenerationErrors { total, errors })
    }
}
