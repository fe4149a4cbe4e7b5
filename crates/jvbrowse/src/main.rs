#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use jvbrowse::cli::app::{Cli, Command, RuntimeArgs};
use jvbrowse::cli::commands;
use jvbrowse::config::RuntimePaths;
use jvbrowse::models::{CommandFailure, FailureKind};
use jvbrowse::process::PreflightError;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_PREFLIGHT_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    jvbrowse::init_logging();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = cli.command.name();
    log::info!("jvbrowse: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            log::info!("jvbrowse: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            if let Some(failure) = error.downcast_ref::<CommandFailure>() {
                println!("{}", failure.envelope().to_line());
            }
            eprintln!("jvbrowse: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
    let overrides = cli.runtime.path_overrides();
    match &cli.command {
        Command::Days(args) => commands::days::run(args, &runtime_paths, &overrides),
        Command::Meetings(args) => commands::meetings::run(args, &runtime_paths, &overrides),
        Command::Card(args) => commands::card::run(args, &runtime_paths, &overrides),
        Command::Horse(args) => commands::horse::run(args, &runtime_paths, &overrides),
        Command::Schema(args) => commands::schema::run(args, &runtime_paths, &overrides),
        Command::Acquire(args) => commands::acquire::run(args, &runtime_paths, &overrides),
        Command::Predict(args) => commands::predict::run(args, &runtime_paths, &overrides),
        Command::Evaluate(args) => commands::evaluate::run(args, &runtime_paths, &overrides),
        Command::State(args) => commands::state::run(args, &runtime_paths, &overrides),
        Command::Config(args) => commands::config::run(args, &runtime_paths, &overrides),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if let Some(failure) = error.downcast_ref::<CommandFailure>() {
        return match failure.kind() {
            FailureKind::Preflight => EXIT_PREFLIGHT_FAILURE,
            FailureKind::Runtime | FailureKind::Cancelled => EXIT_RUNTIME_FAILURE,
        };
    }
    if error.downcast_ref::<PreflightError>().is_some() {
        EXIT_PREFLIGHT_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    jvbrowse::config::resolve_runtime_paths(&home_dir, &cwd, args.settings.as_deref())
}
