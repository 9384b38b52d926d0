pub mod common;
pub mod completeness;
pub mod config;
pub mod generator;
pub mod names;
pub mod render;
pub mod runtime;
pub mod scanner;
pub mod tree;

pub use config::{Config, Suite};
pub use generator::{generate, generate_suite, Generated};
pub use render::Template;
pub use scanner::{list_matching_files, ScanOptions};
