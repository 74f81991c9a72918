//! The `nix-manipulator` CLI (§6.2): `set`/`rm`/`test`/`shell` over the
//! library surface. Contains no domain logic of its own — every subcommand
//! is a thin wrapper over `nix_manipulator::{parse, set_value, remove_value}`
//! plus stdin/stdout/file plumbing.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nix_manipulator::{edit, parser, ManipulatorConfig, SourceFile};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nix-manipulator", version, about = "Structural, format-preserving editing of Nix source code")]
struct Cli {
    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease log verbosity (repeatable).
    #[arg(short = 'q', long = "quiet", action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    /// Read input from FILE instead of stdin.
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign VALUE (a single Nix expression) at NPATH.
    Set { npath: String, value: String },
    /// Remove the binding at NPATH.
    Rm { npath: String },
    /// Parse then rebuild the input, reporting OK or Fail.
    Test,
    /// Interactive REPL over an in-memory document.
    Shell,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Set { npath, value } => run_set(&cli, npath, value),
        Commands::Rm { npath } => run_rm(&cli, npath),
        Commands::Test => run_test(&cli),
        Commands::Shell => run_shell(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let level = match verbose as i8 - quiet as i8 {
        i8::MIN..=-1 => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("NIX_MANIPULATOR_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Builds config from `NIX_MANIPULATOR_INDENT_WIDTH` /
/// `NIX_MANIPULATOR_LIST_THRESHOLD`, falling back to `ManipulatorConfig`'s
/// defaults (§10: "environment-overridable for the CLI").
fn build_config() -> ManipulatorConfig {
    let mut config = ManipulatorConfig::default();
    if let Ok(width) = std::env::var("NIX_MANIPULATOR_INDENT_WIDTH") {
        if let Ok(width) = width.parse() {
            config.indent_width = width;
        }
    }
    if let Ok(threshold) = std::env::var("NIX_MANIPULATOR_LIST_THRESHOLD") {
        if let Ok(threshold) = threshold.parse() {
            config.list_multiline_threshold = threshold;
        }
    }
    config
}

fn read_input(cli: &Cli) -> anyhow::Result<String> {
    match &cli.file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<SourceFile> {
    let text = read_input(cli)?;
    Ok(parser::parse_with_config(&text, build_config())?)
}

fn emit(file: &SourceFile) -> anyhow::Result<()> {
    io::stdout().write_all(file.rebuild().as_bytes())?;
    Ok(())
}

fn run_set(cli: &Cli, npath: &str, value: &str) -> anyhow::Result<()> {
    let mut file = load(cli)?;
    edit::set_value(&mut file, npath, value)?;
    emit(&file)
}

fn run_rm(cli: &Cli, npath: &str) -> anyhow::Result<()> {
    let mut file = load(cli)?;
    edit::remove_value(&mut file, npath)?;
    emit(&file)
}

fn run_test(cli: &Cli) -> anyhow::Result<()> {
    match load(cli) {
        Ok(file) => {
            file.rebuild();
            println!("OK");
            Ok(())
        }
        Err(err) => {
            println!("Fail");
            Err(err.into())
        }
    }
}

fn run_shell(cli: &Cli) -> anyhow::Result<()> {
    let mut file = match &cli.file {
        Some(path) => Some(parser::parse_file_with_config(path, build_config())?),
        None => None,
    };

    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        let line = match rl.readline("nix-manipulator> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Eof | rustyline::error::ReadlineError::Interrupted) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        if let Err(err) = dispatch_shell_command(line, &mut file) {
            eprintln!("error: {err}");
        }
    }
    Ok(())
}

fn dispatch_shell_command(line: &str, file: &mut Option<SourceFile>) -> anyhow::Result<()> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match command {
        "parse" => {
            *file = Some(parser::parse_with_config(rest, build_config())?);
            println!("parsed.");
        }
        "set" => {
            let (npath, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow::anyhow!("usage: set NPATH VALUE"))?;
            let f = file.as_mut().ok_or_else(|| anyhow::anyhow!("no document loaded; use `parse` first"))?;
            edit::set_value(f, npath, value.trim())?;
            println!("{}", f.rebuild());
        }
        "rm" => {
            let f = file.as_mut().ok_or_else(|| anyhow::anyhow!("no document loaded; use `parse` first"))?;
            edit::remove_value(f, rest)?;
            println!("{}", f.rebuild());
        }
        "print" => {
            let f = file.as_ref().ok_or_else(|| anyhow::anyhow!("no document loaded; use `parse` first"))?;
            println!("{}", f.rebuild());
        }
        "quit" | "exit" => std::process::exit(0),
        other => anyhow::bail!("unknown command {other:?} (try: parse, set, rm, print, quit)"),
    }
    Ok(())
}
