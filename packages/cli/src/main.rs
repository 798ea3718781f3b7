mod commands;
mod config;
mod page;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, replay, CheckArgs, InitArgs, ReplayArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Weave CLI - replay and check reactive page payloads
#[derive(Parser, Debug)]
#[command(name = "weave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every propagation step (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a config file and a sample page
    Init(InitArgs),

    /// Replay a script of host calls against a recorded page
    Replay(ReplayArgs),

    /// Check that every table key of a page resolves on its tree
    Check(CheckArgs),
}

fn init_tracing(verbose: bool, config: &Config) {
    let fallback = if verbose { "debug" } else { config.log_filter() };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    // A broken config still gets reported by the command that loads it
    let config = Config::load(&cwd).unwrap_or_default();
    init_tracing(cli.verbose, &config);

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
        Command::Check(args) => check(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
