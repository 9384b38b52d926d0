use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ScanError {
    #[error("fixture root `{}` does not exist", .root.display())]
    #[diagnostic(
        code(suitegen::scan::root_missing),
        help("suite roots are resolved against the project root")
    )]
    RootMissing { root: PathBuf },

    #[error("fixture root `{}` is not a directory", .root.display())]
    #[diagnostic(code(suitegen::scan::not_a_directory))]
    NotADirectory { root: PathBuf },

    #[error("`{}` does not have a UTF-8 name", .path.display())]
    #[diagnostic(
        code(suitegen::scan::non_utf8_name),
        help("rename the entry or exclude it from the suite")
    )]
    NonUtf8Name { path: PathBuf },

    #[error("failed to read `{}`", .path.display())]
    #[diagnostic(code(suitegen::scan::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> ScanError {
        let path = path.into();
        move |source| ScanError::Io { path, source }
    }
}
