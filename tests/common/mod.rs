#![allow(
    dead_code,
    unused_imports,
    reason = "each integration test uses a different part of this module"
)]

use std::fs;
use std::path::Path;

use suitegen::config::Config;

pub const FIXTURES: &str = "tests/fixtures";

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(false)
                .wrap_lines(false)
                .break_words(false)
                .build(),
        )
    }))
    .ok();
}

/// Fixtures under an `invalid/` directory must be rejected, all others accepted.
pub(crate) fn run_test(path: &str) {
    init_miette();

    let text = fs::read_to_string(path).unwrap();
    let result = Config::parse(path, text).and_then(|config| config.suites());
    let invalid = Path::new(path).components().any(|c| c.as_os_str() == "invalid");

    match result {
        Ok(suites) if invalid => panic!("`{path}` was accepted with {} suites", suites.len()),
        Ok(suites) => assert!(!suites.is_empty(), "`{path}` has no suites"),
        Err(err) if invalid => eprintln!("{:?}", miette::Report::new(err)),
        Err(err) => panic!("`{path}` was rejected:\n{:?}", miette::Report::new(err)),
    }
}

/// Creates `files` (empty) below a fresh temporary directory.
pub(crate) fn project(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        write(dir.path(), file, "");
    }
    dir
}

pub(crate) fn write(root: &Path, file: &str, contents: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}
