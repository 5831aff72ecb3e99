//! gitstery: a Git murder mystery.
//!
//! **gitstery builds a repository whose history hides a crime, and checks that
//! the crime can be solved with everyday history queries.**
//!
//! A player solves it with the tools they would use on any real project:
//!
//! - `git log --author --since --until` to find one report in a long archive
//! - `git log -S` to find who touched a line in a log file
//! - `git show <tag>~N` to walk back along a tagged chain
//! - `git hash-object` and `git show <tag>` to check the answer
//!
//! # Examples
//!
//! ```bash
//! # Build a mystery, then make sure it is solvable
//! gitstery generate ./mystery --seed 00ff00ff
//! gitstery verify ./mystery
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: history providers, cast, calendar, session and shared plumbing
//! - [`phases`]: the narrative builder, one module per phase
//! - [`verify`]: the solver that proves a build has exactly one answer

pub mod core;
pub mod phases;
pub mod verify;

use crate::core::config::Config;
use crate::core::error::{BuildError, GitsteryError};
use crate::core::git::GitStore;
use crate::core::output;
use crate::phases::{BuildOptions, MAIN_BRANCH, Phase};
use clap::{Parser, Subcommand, ValueEnum};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Description written to the generated repository, naming its seed.
pub fn repo_description(seed: &[u8]) -> String {
    format!("A Git Murder Mystery ({})", phases::hex(seed))
}

#[derive(Parser, Debug)]
#[clap(
    name = "gitstery",
    version = env!("CARGO_PKG_VERSION"),
    about = "A Git murder mystery: generate a puzzle repository, or verify one"
)]
struct Cli {
    /// Log builder and verifier steps to stderr (overridden by GITSTERY_LOG).
    #[clap(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct GenerateCli {
    /// Directory to create the mystery repository in.
    #[clap(env = "GITSTERY_TEMP_DIR")]
    dir: PathBuf,
    /// Remove a non-empty target directory first.
    #[clap(long)]
    force: bool,
    /// Hex seed; the same seed always yields the same mystery.
    #[clap(long, env = "GITSTERY_SEED")]
    seed: Option<String>,
    /// Only run these phases (repeatable). Defaults to all of them.
    #[clap(long = "phase", value_enum)]
    phases: Vec<Phase>,
    /// Do not create the solution tag.
    #[clap(long)]
    no_solution: bool,
    /// TOML configuration file.
    #[clap(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct VerifyCli {
    /// Repository to verify.
    dir: PathBuf,
    /// Output format.
    #[clap(long, value_enum, default_value = "text")]
    format: Format,
    /// TOML configuration file.
    #[clap(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new mystery repository.
    Generate(GenerateCli),
    /// Check that a repository holds a solvable mystery.
    Verify(VerifyCli),
    /// Print the version.
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("GITSTERY_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("gitstery=debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<Config, BuildError> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

/// Make sure `dir` can receive a fresh repository.
fn prepare_target(dir: &Path, force: bool) -> Result<(), BuildError> {
    if !dir.exists() {
        return Ok(());
    }
    let occupied = !dir.is_dir() || fs::read_dir(dir)?.next().is_some();
    if !occupied {
        return Ok(());
    }
    if !force {
        return Err(BuildError::TargetNotEmpty(dir.display().to_string()));
    }
    info!(dir = %dir.display(), "removing existing target");
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    } else {
        fs::remove_file(dir)?;
    }
    Ok(())
}

fn run_generate(args: GenerateCli) -> Result<(), GitsteryError> {
    let config = load_config(args.config.as_deref())?;
    let seed = match &args.seed {
        Some(text) => phases::parse_hex(text)?,
        None => rand::thread_rng().r#gen::<[u8; 10]>().to_vec(),
    };
    prepare_target(&args.dir, args.force)?;
    output::print_build_start(&args.dir, &phases::hex(&seed));

    let store = GitStore::init(&args.dir)?;
    store.set_description(&repo_description(&seed))?;
    let options = BuildOptions {
        seed,
        phases: args.phases,
        with_solution: !args.no_solution,
        config: config.build,
    };
    let report = phases::generate(&store, &options)?;
    store.checkout(MAIN_BRANCH)?;
    output::print_build_report(&report);
    Ok(())
}

fn run_verify(args: VerifyCli) -> Result<(), GitsteryError> {
    let config = load_config(args.config.as_deref())?;
    let store = GitStore::open(&args.dir)?;
    let result = verify::verify(&store, &config.verify);
    match args.format {
        Format::Json => {
            let envelope = output::VerifyEnvelope::from_result(&result);
            println!(
                "{}",
                serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| "{}".to_string())
            );
        }
        Format::Text => match &result {
            Ok(verdict) => print!("{}", output::render_verdict_text(verdict)),
            Err(err) => println!("{}", output::render_failure_text(err)),
        },
    }
    result?;
    Ok(())
}

pub fn run() -> Result<(), GitsteryError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Version => {
            // Simple output for scripts/parsing
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Generate(args) => run_generate(args),
        Command::Verify(args) => run_verify(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "gitstery",
            "generate",
            "out",
            "--seed",
            "abcd",
            "--phase",
            "archive",
            "--phase",
            "access-log",
            "--no-solution",
        ])
        .unwrap();
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.dir, PathBuf::from("out"));
                assert_eq!(args.seed.as_deref(), Some("abcd"));
                assert_eq!(args.phases, vec![Phase::Archive, Phase::AccessLog]);
                assert!(args.no_solution);
                assert!(!args.force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_parses_verify_format() {
        let cli = Cli::try_parse_from(["gitstery", "verify", "repo", "--format", "json"]).unwrap();
        match cli.command {
            Command::Verify(args) => assert_eq!(args.format, Format::Json),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn description_names_the_seed() {
        assert_eq!(repo_description(&[0x0b, 0xad, 0xc0, 0xde]), "A Git Murder Mystery (0badc0de)");
    }

    #[test]
    fn prepare_target_refuses_non_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("mystery");
        assert!(prepare_target(&target, false).is_ok());

        fs::create_dir(&target).unwrap();
        assert!(prepare_target(&target, false).is_ok());

        fs::write(target.join("file"), "x").unwrap();
        assert!(matches!(
            prepare_target(&target, false),
            Err(BuildError::TargetNotEmpty(_))
        ));
        assert!(prepare_target(&target, true).is_ok());
        assert!(!target.exists());
    }
}
