use std::fs;

use super::*;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// Creates the given entries below a fresh temporary directory; a trailing `/` makes a directory.
fn fixture_tree(entries: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in entries {
        let path = dir.path().join(entry);
        if entry.ends_with('/') {
            fs::create_dir_all(path).unwrap();
        } else {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "fun box() = \"OK\"\n").unwrap();
        }
    }
    dir
}

fn collect(root: &Path, options: &ScanOptions) -> Vec<(EntryKind, String)> {
    Scanner::new(root, options)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (entry.kind(), entry.path().to_string())
        })
        .collect()
}

#[test]
fn test_depth_first_lexicographic() {
    use EntryKind as K;

    let dir = fixture_tree(&["b.kt", "a/2.kt", "a/1.kt", "c/d/3.kt", "a.kt"]);
    let options = ScanOptions::new(regex(r"^(.+)\.kt$"));

    let expected = [
        (K::Directory, "a".to_owned()),
        (K::File, "a/1.kt".to_owned()),
        (K::File, "a/2.kt".to_owned()),
        (K::File, "a.kt".to_owned()),
        (K::File, "b.kt".to_owned()),
        (K::Directory, "c".to_owned()),
        (K::Directory, "c/d".to_owned()),
        (K::File, "c/d/3.kt".to_owned()),
    ];
    assert_eq!(collect(dir.path(), &options), expected);
}

#[test]
fn test_filter_applies_to_names_only() {
    let dir = fixture_tree(&["x.kts/inner.txt", "y.kts", "z.kt", "notes.txt"]);
    let options = ScanOptions::new(regex(r"^(.+)\.kts$"));

    let files = list_matching_files(dir.path(), &options).unwrap();
    assert_eq!(files, BTreeSet::from(["y.kts".to_owned()]));

    // directories are traversed even though their contents do not match
    let kinds = collect(dir.path(), &options);
    assert!(kinds.contains(&(EntryKind::Directory, "x.kts".to_owned())));
}

#[test]
fn test_non_recursive_ignores_directories() {
    let dir = fixture_tree(&["a/1.kt", "top.kt"]);
    let options = ScanOptions::new(regex(r"^(.+)\.kt$")).recursive(false);

    assert_eq!(
        collect(dir.path(), &options),
        [(EntryKind::File, "top.kt".to_owned())]
    );
}

#[test]
fn test_directory_fixtures() {
    let dir = fixture_tree(&["_helpers/", "kt1/main.kt", "kt2/", "top.kt"]);
    let options = ScanOptions::new(regex(r"^([^_](.+))$"))
        .recursive(false)
        .with_directory_fixtures(true);

    let files = list_matching_files(dir.path(), &options).unwrap();
    assert_eq!(
        files,
        BTreeSet::from(["kt1/".to_owned(), "kt2/".to_owned(), "top.kt".to_owned()])
    );
}

#[test]
fn test_overrides_are_inherited() {
    let dir = fixture_tree(&["a.kt", "a.kts", "js/b.kt", "js/b.js", "js/deep/c.js"]);
    let options =
        ScanOptions::new(regex(r"^(.+)\.kt$")).with_override(RelPath::parse("js"), regex(r"\.js$"));

    let files = list_matching_files(dir.path(), &options).unwrap();
    assert_eq!(
        files,
        BTreeSet::from([
            "a.kt".to_owned(),
            "js/b.js".to_owned(),
            "js/deep/c.js".to_owned()
        ])
    );
}

#[test]
fn test_exclusions() {
    let dir = fixture_tree(&["a.kt", "a.fir.kt", "build/x.kt", "skip.fir/y.kt", "ok/z.kt"]);
    let options = ScanOptions::new(regex(r"^(.+)\.kt$"))
        .with_exclude(regex(r"\.fir"))
        .with_excluded_dir("build");

    let files = list_matching_files(dir.path(), &options).unwrap();
    assert_eq!(
        files,
        BTreeSet::from(["a.kt".to_owned(), "ok/z.kt".to_owned()])
    );
}

#[test]
fn test_rebased_keeps_nested_overrides() {
    let options = ScanOptions::new(regex(r"\.kt$"))
        .with_override(RelPath::parse("a"), regex(r"\.a$"))
        .with_override(RelPath::parse("a/b"), regex(r"\.b$"))
        .with_override(RelPath::parse("c"), regex(r"\.c$"));

    let rebased = options.rebased(&RelPath::parse("a"), regex(r"\.a$"));
    assert_eq!(rebased.filter.as_str(), r"\.a$");
    let keys: Vec<_> = rebased.overrides.keys().map(ToString::to_string).collect();
    assert_eq!(keys, ["b"]);
}

#[test]
fn test_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let options = ScanOptions::new(regex(".*"));

    let err = Scanner::new(dir.path().join("nope"), &options).unwrap_err();
    assert!(matches!(err, ScanError::RootMissing { .. }), "{err:?}");
}

#[test]
fn test_root_is_a_file() {
    let dir = fixture_tree(&["file.kt"]);
    let options = ScanOptions::new(regex(".*"));

    let err = Scanner::new(dir.path().join("file.kt"), &options).unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory { .. }), "{err:?}");
    eprintln!("{:?}", miette::Report::new(err));
}

#[test]
fn test_scans_are_repeatable() {
    let dir = fixture_tree(&["q/w.kt", "e.kt", "r/t/y.kt", "u.kt"]);
    let options = ScanOptions::new(regex(r"\.kt$"));

    assert_eq!(collect(dir.path(), &options), collect(dir.path(), &options));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = fixture_tree(&["sub/"]);
    let bad = dir.path().join("sub").join(OsStr::from_bytes(b"\xff.kt"));
    if fs::write(&bad, "").is_err() {
        // the filesystem insists on UTF-8 names
        return;
    }
    let options = ScanOptions::new(regex(r"\.kt$"));

    let mut scanner = Scanner::new(dir.path(), &options).unwrap();
    let err = scanner.next().unwrap().unwrap_err();
    assert!(matches!(err, ScanError::NonUtf8Name { .. }), "{err:?}");
    assert!(scanner.next().is_none());
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_ends_the_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = fixture_tree(&["a.kt", "locked/b.kt", "z.kt"]);
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // running with privileges that ignore permissions
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }
    let options = ScanOptions::new(regex(r"\.kt$"));

    let results: Vec<_> = Scanner::new(dir.path(), &options).unwrap().collect();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(results.len(), 2, "{results:?}");
    assert!(matches!(&results[0], Ok(ScanEntry::File(path)) if path.to_string() == "a.kt"));
    assert!(matches!(&results[1], Err(ScanError::Io { .. })), "{results:?}");
}

#[cfg(unix)]
#[test]
fn test_symlink_cycles_are_not_entered() {
    use EntryKind as K;

    let dir = fixture_tree(&["a/x.kt", "b/y.kt"]);
    std::os::unix::fs::symlink("..", dir.path().join("a/loop")).unwrap();
    std::os::unix::fs::symlink("../b", dir.path().join("a/to_b")).unwrap();
    let options = ScanOptions::new(regex(r"\.kt$"));

    assert_eq!(
        collect(dir.path(), &options),
        [
            (K::Directory, "a".to_owned()),
            (K::Directory, "a/to_b".to_owned()),
            (K::File, "a/to_b/y.kt".to_owned()),
            (K::File, "a/x.kt".to_owned()),
            (K::Directory, "b".to_owned()),
            (K::File, "b/y.kt".to_owned()),
        ]
    );
}
