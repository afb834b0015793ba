use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use job_search_kernel::CredentialStore;
use job_search_kernel::config::resolve_config_dir;

mod commands;
mod search;


const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "\
Examples:
    job-search                  Search interactively
    job-search --save-key       Save or update your Anthropic API key
    job-search --reset-key      Remove the saved API key";

#[derive(Parser, Debug)]
#[command(
    name = "job-search",
    about = "Search for job openings using Claude's web search",
    version,
    long_version = LONG_VERSION,
    after_help = EXAMPLES
)]
struct Cli {
    /// Save or update your Anthropic API key
    #[arg(long, conflicts_with = "reset_key")]
    save_key: bool,

    /// Remove the saved API key
    #[arg(long)]
    reset_key: bool,

    /// Directory holding config.json and settings.yaml [default: ~/.job_search]
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Search,
    SaveKey,
    ResetKey,
}

impl Cli {
    fn action(&self) -> Action {
        if self.save_key {
            Action::SaveKey
        } else if self.reset_key {
            Action::ResetKey
        } else {
            Action::Search
        }
    }
}

#[derive(Debug)]
enum Parsed {
    Run(Cli),
    Unknown(String),
}

/// Parse arguments, turning unrecognized or misused flags into
/// [`Parsed::Unknown`] instead of a usage error. Long flags match
/// case-insensitively. Help, version and `--config-dir` value errors still
/// come back as clap errors.
fn parse_args<I, T>(args: I) -> Result<Parsed, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| normalize_flag(a.into())).collect();

    match Cli::try_parse_from(args.iter().cloned()) {
        Ok(cli) => Ok(Parsed::Run(cli)),
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::UnknownArgument
                    | ErrorKind::ArgumentConflict
                    | ErrorKind::TooManyValues
            ) =>
        {
            Ok(Parsed::Unknown(offending_arg(&err, &args)))
        }
        Err(err) => Err(err),
    }
}

/// The argument a parse error points at, as the user typed it.
fn offending_arg(err: &clap::Error, args: &[OsString]) -> String {
    let raw: Vec<String> = args
        .iter()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    match err.get(ContextKind::InvalidArg) {
        // `--save-key=yes` reports `--save-key`; show the whole token.
        Some(ContextValue::String(flag)) => raw
            .iter()
            .find(|a| a.starts_with(&format!("{flag}=")))
            .cloned()
            .unwrap_or_else(|| flag.clone()),
        _ => raw.into_iter().next().unwrap_or_default(),
    }
}

/// Lowercase the flag part of `--long[=value]`; leave values and short flags alone.
fn normalize_flag(arg: OsString) -> OsString {
    let Some(s) = arg.to_str() else {
        return arg;
    };
    if !s.starts_with("--") {
        return arg;
    }
    match s.split_once('=') {
        Some((flag, value)) => format!("{}={value}", flag.to_lowercase()).into(),
        None => s.to_lowercase().into(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = match parse_args(std::env::args_os()) {
        Ok(Parsed::Run(cli)) => cli,
        Ok(Parsed::Unknown(arg)) => {
            println!("Unknown argument: {arg}");
            println!("Use --help to see available options.");
            return Ok(());
        }
        Err(err) => err.exit(),
    };

    commands::setup_logging(cli.verbose);

    let config_dir = resolve_config_dir(cli.config_dir.as_deref())?;
    let store = CredentialStore::new(&config_dir);

    match cli.action() {
        Action::SaveKey => {
            let stdin = std::io::stdin();
            commands::keys::save(&store, &mut stdin.lock(), &mut std::io::stdout())
        }
        Action::ResetKey => commands::keys::reset(&store, &mut std::io::stdout()),
        Action::Search => commands::interactive::execute(&config_dir).await,
    }
}
