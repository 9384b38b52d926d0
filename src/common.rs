use std::fmt;
use std::path::{Path, PathBuf};

/// A path relative to some scan root, stored as UTF-8 segments.
///
/// Always displayed with `/` separators so that generated output does not depend on the host
/// platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelPath {
    segments: Vec<String>,
}

impl RelPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Splits on `/`, ignoring empty and `.` segments, so `"./a//b/"` and `"a/b"` are the same
    /// path.
    pub fn parse(path: &str) -> Self {
        Self::new(
            path.split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self::new(parent.to_vec()))
    }

    pub fn starts_with(&self, prefix: &RelPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The remainder of `self` after `prefix`, if `prefix` is an ancestor (or `self`).
    pub fn strip_prefix(&self, prefix: &RelPath) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self::new(rest.to_vec()))
    }

    pub fn to_fs_path(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.segments.iter();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
            for segment in iter {
                write!(f, "/{}", segment)?;
            }
        }

        Ok(())
    }
}

/// Joins a project-relative root (as written in the configuration) with a path below it.
pub fn join_display(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    match (root.is_empty(), path.is_empty()) {
        (true, _) => path.to_owned(),
        (false, true) => root.to_owned(),
        (false, false) => format!("{root}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let path = RelPath::parse("./a//b/c/");
        assert_eq!(path.segments(), ["a", "b", "c"]);
        assert_eq!(path.to_string(), "a/b/c");
        assert_eq!(RelPath::root().to_string(), "");
    }

    #[test]
    fn parent_and_prefix() {
        let path = RelPath::parse("a/b/c");
        assert_eq!(path.parent(), Some(RelPath::parse("a/b")));
        assert_eq!(RelPath::root().parent(), None);
        assert!(path.starts_with(&RelPath::parse("a")));
        assert!(!path.starts_with(&RelPath::parse("b")));
        assert_eq!(
            path.strip_prefix(&RelPath::parse("a")),
            Some(RelPath::parse("b/c"))
        );
        assert_eq!(path.strip_prefix(&RelPath::parse("x")), None);
    }

    #[test]
    fn join_display_handles_empty_parts() {
        assert_eq!(join_display("root/", "a.kt"), "root/a.kt");
        assert_eq!(join_display("", "a.kt"), "a.kt");
        assert_eq!(join_display("root", ""), "root");
    }
}
