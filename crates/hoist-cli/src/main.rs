// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! hoist - suspension-point safety checks for resumable methods.

mod commands;
mod output;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hoist_compiler::CheckConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Check suspension points and hoist locals in resumable methods")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log analysis phases to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every method in a JSON input file
    Check {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        deny_warnings: bool,
    },
    /// Print the control-flow graph of every method
    Graph { file: PathBuf },
    /// Explain an error code
    Explain { code: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("HOIST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Check {
            file,
            format,
            config,
            deny_warnings,
        } => {
            let mut config = match config {
                Some(path) => CheckConfig::load(&path)?,
                None => CheckConfig::default(),
            };
            config.deny_warnings |= deny_warnings;
            commands::check::run(&file, &config, format)
        }
        Commands::Graph { file } => commands::graph::run(&file),
        Commands::Explain { code } => commands::explain::run(&code).map(|()| true),
    }
}

fn main() {
    let cli = Cli::parse();
    output::init();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("{}: {:#}", output::error_label(), err);
            process::exit(1);
        }
    }
}
