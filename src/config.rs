use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fnv::{FnvHashMap, FnvHashSet};
use miette::{NamedSource, SourceSpan};
use regex::Regex;

use crate::common::RelPath;
use crate::names::{Casing, NamingPolicy};
use crate::render::Template;
use crate::scanner::ScanOptions;

pub const DEFAULT_CONFIG: &str = "suites.json";

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    #[error("failed to read `{}`", .path.display())]
    #[diagnostic(code(suitegen::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {source}")]
    #[diagnostic(code(suitegen::config::parse))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        source: serde_json::Error,
    },

    #[error("suite `{suite}` has an invalid pattern `{pattern}`")]
    #[diagnostic(code(suitegen::config::pattern))]
    InvalidPattern {
        suite: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("suite name `{name}` is used more than once")]
    #[diagnostic(code(suitegen::config::duplicate_suite))]
    DuplicateSuite { name: String },

    #[error("suites `{first}` and `{second}` both write `{}`", .output.display())]
    #[diagnostic(
        code(suitegen::config::duplicate_output),
        help("every suite needs an output file of its own")
    )]
    DuplicateOutput {
        output: PathBuf,
        first: String,
        second: String,
    },

    #[error("no suite is named `{name}`")]
    #[diagnostic(code(suitegen::config::unknown_suite))]
    UnknownSuite { name: String },

    #[error("suite `{suite}` has an empty {field}")]
    #[diagnostic(code(suitegen::config::empty))]
    Empty { suite: String, field: &'static str },
}

/// The suite file, as written.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub suites: Vec<SuiteConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    pub name: String,
    /// Relative to the project root.
    pub root: String,
    pub pattern: String,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default)]
    pub directory_fixtures: bool,
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    /// Directory below `root` to the pattern used there instead.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    /// Relative to the project root.
    pub output: PathBuf,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub naming: NamingOverrides,
}

fn default_recursive() -> bool {
    true
}

/// Changes to the naming convention of a suite's template.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingOverrides {
    pub group_casing: Option<Casing>,
    pub fixture_casing: Option<Casing>,
    pub fixture_prefix: Option<String>,
    pub check_name: Option<String>,
    /// Added to the template's reserved words.
    pub reserved: Vec<String>,
}

impl NamingOverrides {
    pub fn apply(&self, mut policy: NamingPolicy) -> NamingPolicy {
        if let Some(casing) = self.group_casing {
            policy.group_casing = casing;
        }
        if let Some(casing) = self.fixture_casing {
            policy.fixture_casing = casing;
        }
        if let Some(prefix) = &self.fixture_prefix {
            policy.fixture_prefix = prefix.clone();
        }
        if let Some(check_name) = &self.check_name {
            policy.check_name = check_name.clone();
        }
        policy.reserved.extend(self.reserved.iter().cloned());
        policy
    }
}

/// A validated suite, ready to run.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    /// `/`-separated, without `.` or empty segments.
    pub root: String,
    pub output: PathBuf,
    pub options: ScanOptions,
    pub template: Template,
    pub naming: NamingPolicy,
}

impl Suite {
    /// The directory the root group's check is named after.
    pub fn root_dir_name(&self) -> &str {
        self.root.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(self.name.as_str())
    }
}

impl SuiteConfig {
    pub fn compile(&self) -> Result<Suite, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(self.empty("name"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(self.empty("output"));
        }

        let mut options = ScanOptions::new(self.regex(&self.pattern)?)
            .recursive(self.recursive)
            .with_directory_fixtures(self.directory_fixtures);
        if let Some(exclude) = &self.exclude {
            options = options.with_exclude(self.regex(exclude)?);
        }
        for dir in &self.exclude_dirs {
            options = options.with_excluded_dir(dir.as_str());
        }
        for (dir, pattern) in &self.overrides {
            options = options.with_override(RelPath::parse(dir), self.regex(pattern)?);
        }

        Ok(Suite {
            name: self.name.clone(),
            root: RelPath::parse(&self.root).to_string(),
            output: self.output.clone(),
            options,
            template: self.template.clone(),
            naming: self.naming.apply(self.template.naming()),
        })
    }

    fn regex(&self, pattern: &str) -> Result<Regex, ConfigError> {
        Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            suite: self.name.clone(),
            pattern: pattern.to_owned(),
            source,
        })
    }

    fn empty(&self, field: &'static str) -> ConfigError {
        ConfigError::Empty {
            suite: self.name.clone(),
            field,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&path.display().to_string(), text)
    }

    pub fn parse(name: &str, text: String) -> Result<Self, ConfigError> {
        serde_json::from_str(&text).map_err(|source| {
            let offset = offset_of(&text, source.line(), source.column());
            ConfigError::Parse {
                src: NamedSource::new(name, text),
                span: (offset, 0).into(),
                source,
            }
        })
    }

    /// Validates every suite; one bad suite fails the whole configuration.
    pub fn suites(&self) -> Result<Vec<Suite>, ConfigError> {
        let mut names = FnvHashSet::default();
        let mut outputs: FnvHashMap<PathBuf, &str> = FnvHashMap::default();
        let mut suites = Vec::with_capacity(self.suites.len());

        for config in &self.suites {
            if !names.insert(config.name.as_str()) {
                return Err(ConfigError::DuplicateSuite {
                    name: config.name.clone(),
                });
            }
            if let Some(first) = outputs.insert(config.output.clone(), &config.name) {
                return Err(ConfigError::DuplicateOutput {
                    output: config.output.clone(),
                    first: first.to_owned(),
                    second: config.name.clone(),
                });
            }
            suites.push(config.compile()?);
        }

        Ok(suites)
    }
}

/// The suites named in `names`, in configuration order; all of them if `names` is empty.
pub fn select(suites: Vec<Suite>, names: &[String]) -> Result<Vec<Suite>, ConfigError> {
    if let Some(name) = names.iter().find(|n| !suites.iter().any(|s| s.name == **n)) {
        return Err(ConfigError::UnknownSuite { name: name.clone() });
    }
    if names.is_empty() {
        return Ok(suites);
    }
    Ok(suites
        .into_iter()
        .filter(|suite| names.contains(&suite.name))
        .collect())
}

/// Byte offset of a 1-based line and column as reported by `serde_json`.
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}
