use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

mod error;
#[cfg(test)]
mod tests;

pub use error::*;

use crate::common::RelPath;

/// What to pick up below a fixture root.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Matched against entry names, never against full paths.
    pub filter: Regex,
    pub exclude: Option<Regex>,
    pub recursive: bool,
    /// Directories whose names match `filter` are fixtures themselves and are not entered.
    pub directory_fixtures: bool,
    pub exclude_dirs: Vec<String>,
    /// Filters replacing the inherited one for a directory and everything below it.
    pub overrides: BTreeMap<RelPath, Regex>,
}

impl ScanOptions {
    pub fn new(filter: Regex) -> Self {
        Self {
            filter,
            exclude: None,
            recursive: true,
            directory_fixtures: false,
            exclude_dirs: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_exclude(mut self, exclude: Regex) -> Self {
        self.exclude = Some(exclude);
        self
    }

    pub fn with_directory_fixtures(mut self, directory_fixtures: bool) -> Self {
        self.directory_fixtures = directory_fixtures;
        self
    }

    pub fn with_excluded_dir(mut self, name: impl Into<String>) -> Self {
        self.exclude_dirs.push(name.into());
        self
    }

    pub fn with_override(mut self, dir: RelPath, filter: Regex) -> Self {
        self.overrides.insert(dir, filter);
        self
    }

    /// The filter in effect for `dir`, given the one in effect for its parent.
    pub fn filter_for(&self, dir: &RelPath, inherited: &Regex) -> Regex {
        self.overrides
            .get(dir)
            .cloned()
            .unwrap_or_else(|| inherited.clone())
    }

    /// Options for scanning `dir` as if it were the root, with `filter` in effect there.
    ///
    /// Overrides below `dir` are kept and re-keyed, the rest are dropped.
    pub fn rebased(&self, dir: &RelPath, filter: Regex) -> Self {
        let overrides = self
            .overrides
            .iter()
            .filter_map(|(path, filter)| {
                let rest = path.strip_prefix(dir)?;
                (!rest.is_root()).then(|| (rest, filter.clone()))
            })
            .collect();

        Self {
            filter,
            exclude: self.exclude.clone(),
            recursive: self.recursive,
            directory_fixtures: self.directory_fixtures,
            exclude_dirs: self.exclude_dirs.clone(),
            overrides,
        }
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
            || self.exclude.as_ref().is_some_and(|e| e.is_match(name))
    }

    fn is_excluded_file(&self, name: &str) -> bool {
        self.exclude.as_ref().is_some_and(|e| e.is_match(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    DirectoryFixture,
}

#[derive(Debug, Clone)]
pub enum ScanEntry {
    /// A directory that is about to be entered, with the filter in effect inside it.
    Directory { path: RelPath, filter: Regex },
    File(RelPath),
    DirectoryFixture(RelPath),
}

impl ScanEntry {
    pub fn path(&self) -> &RelPath {
        match self {
            ScanEntry::Directory { path, .. } => path,
            ScanEntry::File(path) | ScanEntry::DirectoryFixture(path) => path,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            ScanEntry::Directory { .. } => EntryKind::Directory,
            ScanEntry::File(_) => EntryKind::File,
            ScanEntry::DirectoryFixture(_) => EntryKind::DirectoryFixture,
        }
    }
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    is_dir: bool,
    is_link: bool,
}

#[derive(Debug)]
struct Frame {
    dir: RelPath,
    /// Canonical location on disk, compared against symlink targets.
    real: PathBuf,
    filter: Regex,
    entries: std::vec::IntoIter<DirEntry>,
}

/// Lazy depth-first walk over a fixture root.
///
/// Every directory is listed when it is entered and its entries are visited in byte order of their
/// names, so two walks over the same tree yield the same sequence. After an error is yielded the
/// scanner is exhausted.
#[derive(Debug)]
pub struct Scanner<'o> {
    root: PathBuf,
    options: &'o ScanOptions,
    stack: Vec<Frame>,
}

impl<'o> Scanner<'o> {
    pub fn new(root: impl Into<PathBuf>, options: &'o ScanOptions) -> Result<Self, ScanError> {
        let root = root.into();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ScanError::NotADirectory { root }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ScanError::RootMissing { root })
            }
            Err(err) => return Err(ScanError::io(root)(err)),
        }

        tracing::debug!(root = %root.display(), filter = %options.filter, "scanning fixtures");

        let filter = options.filter_for(&RelPath::root(), &options.filter);
        let entries = read_sorted(&root)?;
        let real = fs::canonicalize(&root).map_err(ScanError::io(&root))?;
        let stack = vec![Frame {
            dir: RelPath::root(),
            real,
            filter,
            entries: entries.into_iter(),
        }];

        Ok(Self {
            root,
            options,
            stack,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The filter in effect at the root itself.
    pub fn root_filter(&self) -> Regex {
        self.options
            .filter_for(&RelPath::root(), &self.options.filter)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<ScanEntry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let path = frame.dir.join(entry.name.as_str());
            if !entry.is_dir {
                if frame.filter.is_match(&entry.name) && !self.options.is_excluded_file(&entry.name)
                {
                    return Some(Ok(ScanEntry::File(path)));
                }
                continue;
            }

            if self.options.is_excluded_dir(&entry.name) {
                continue;
            }

            if self.options.directory_fixtures && frame.filter.is_match(&entry.name) {
                return Some(Ok(ScanEntry::DirectoryFixture(path)));
            }

            if !self.options.recursive {
                continue;
            }

            let filter = self.options.filter_for(&path, &frame.filter);
            let fs_path = path.to_fs_path(&self.root);
            let real = if entry.is_link {
                match fs::canonicalize(&fs_path) {
                    Ok(real) => real,
                    Err(err) => {
                        self.stack.clear();
                        return Some(Err(ScanError::io(fs_path)(err)));
                    }
                }
            } else {
                frame.real.join(&entry.name)
            };

            // A link back to a directory being walked would never end.
            if entry.is_link && self.stack.iter().any(|open| open.real == real) {
                tracing::warn!(dir = %path, target = %real.display(), "skipping symlink cycle");
                continue;
            }

            match read_sorted(&fs_path) {
                Ok(entries) => {
                    tracing::trace!(dir = %path, "entering directory");
                    self.stack.push(Frame {
                        dir: path.clone(),
                        real,
                        filter: filter.clone(),
                        entries: entries.into_iter(),
                    });
                    return Some(Ok(ScanEntry::Directory { path, filter }));
                }
                Err(err) => {
                    self.stack.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}

fn read_sorted(dir: &Path) -> Result<Vec<DirEntry>, ScanError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(ScanError::io(dir))? {
        let entry = entry.map_err(ScanError::io(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(ScanError::io(&path))?;
        // Symlinks count as whatever they point to; dangling ones as files.
        let is_link = file_type.is_symlink();
        let is_dir = if is_link { path.is_dir() } else { file_type.is_dir() };
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| ScanError::NonUtf8Name { path })?;

        entries.push(DirEntry {
            name,
            is_dir,
            is_link,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Every fixture below `root` as a `/`-separated path relative to it.
///
/// Directory fixtures keep a trailing `/`. This is the listing both the generator and the emitted
/// completeness checks rely on, so the two always agree on what counts as a fixture.
pub fn list_matching_files(
    root: impl Into<PathBuf>,
    options: &ScanOptions,
) -> Result<BTreeSet<String>, ScanError> {
    Scanner::new(root, options)?
        .filter_map(|entry| match entry {
            Ok(ScanEntry::Directory { .. }) => None,
            Ok(ScanEntry::File(path)) => Some(Ok(path.to_string())),
            Ok(ScanEntry::DirectoryFixture(path)) => Some(Ok(format!("{path}/"))),
            Err(err) => Some(Err(err)),
        })
        .collect()
}
