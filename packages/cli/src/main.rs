mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, normalize, replay, CheckArgs, NormalizeArgs, ReplayArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Quill CLI - drive the rich-text editor core from a terminal
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Editor config file (defaults to ./quill.config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse markup and print its canonical form
    Normalize(NormalizeArgs),

    /// Validate markup files against the document schema
    Check(CheckArgs),

    /// Replay a JSON script of keystrokes and commands
    Replay(ReplayArgs),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Normalize(args) => normalize(args),
        Command::Check(args) => check(args),
        Command::Replay(args) => {
            let cwd = std::env::current_dir()?;
            let config = config::load(&cwd, cli.config.as_deref())?;
            replay(args, config)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
