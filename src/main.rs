use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::EnvFilter;

use suitegen::config::{self, Config, Suite, DEFAULT_CONFIG};
use suitegen::generator::{self, WriteOutcome};

/// Generates test suites from directories of test data.
#[derive(Debug, Parser)]
#[command(name = "suitegen", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suite configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Directory the configured paths are relative to [default: the configuration's directory]
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Only run this suite (repeatable)
    #[arg(long = "suite", global = true, value_name = "NAME")]
    suites: Vec<String>,

    /// Generate suites on separate threads
    #[arg(long, global = true)]
    parallel: bool,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write every suite whose output changed
    Generate,
    /// Fail if an output differs from what `generate` would write
    Check,
    /// Print the test names and fixture paths of each suite
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;
    let project_root = match &cli.project_root {
        Some(root) => root.clone(),
        None => cli
            .config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let suites = config::select(config.suites()?, &cli.suites)?;
    tracing::debug!(
        project_root = %project_root.display(),
        suites = suites.len(),
        "configuration loaded"
    );

    match cli.command {
        Command::Generate => {
            for (generated, outcome) in generator::generate(&project_root, &suites, cli.parallel)? {
                let status = match outcome {
                    WriteOutcome::Written => "written",
                    WriteOutcome::Unchanged => "unchanged",
                };
                println!(
                    "{status:>9} {} ({} fixtures)",
                    generated.output.display(),
                    generated.fixtures
                );
            }
        }
        Command::Check => {
            let checked = generator::check(&project_root, &suites, cli.parallel)?;
            println!("{} suites up to date", checked.len());
        }
        Command::List => list(&project_root, &suites)?,
    }

    Ok(())
}

fn list(project_root: &Path, suites: &[Suite]) -> Result<()> {
    for suite in suites {
        let tree = generator::build_suite(project_root, suite)?;
        println!("{} ({})", suite.name, suite.root);
        for group in tree.group.all_groups() {
            let indent = "  ".repeat(group.path().depth() + 1);
            if !group.path().is_root() {
                println!("{}{}/", "  ".repeat(group.path().depth()), group.label());
            }
            println!("{indent}{} <completeness check>", group.check_ident());
            for fixture in group.fixtures() {
                println!(
                    "{indent}{} {}",
                    fixture.ident(),
                    tree.project_path(&fixture.display_path())
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .try_init();
}
