//! Tabula Command-Line Interface
//!
//! An interpreter for schemas of plain-text tables.
//!
//! # Usage
//!
//! ```bash
//! # Start interactive REPL
//! tabula --workdir ./workdir
//!
//! # Execute a single command
//! tabula -c "schemas"
//!
//! # Execute commands from a file
//! tabula -f setup.tab
//!
//! # Output as JSON
//! tabula -o json -f report.tab
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tabula_storage::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod formatter;
mod interpreter;
mod lexer;
mod repl;

use config::CliConfig;
use formatter::OutputFormat;
use interpreter::Interpreter;
use repl::{run_script, Repl};

/// Tabula command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "tabula",
    version,
    about = "Command-line interpreter for Tabula",
    long_about = "An interpreter for schemas of plain-text tables.\n\n\
                  Use this tool interactively, or run single commands and\n\
                  command files against a working directory."
)]
struct Args {
    /// Working directory holding one sub-directory per schema
    #[arg(short = 'w', long, value_name = "DIR", env = "TABULA_WORKDIR")]
    workdir: Option<PathBuf>,

    /// Execute a single command and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Execute commands from file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum)]
    output: Option<OutputFormatArg>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Suppress the banner
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display rows in a formatted table
    Table,
    /// Display rows as JSON
    Json,
    /// Display rows as CSV
    Csv,
    /// Display raw values
    Raw,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Raw => OutputFormat::Raw,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    let db = Database::open(config.store.clone()).with_context(|| {
        format!(
            "Failed to open working directory {}",
            config.store.workdir.display()
        )
    })?;
    let mut interpreter = Interpreter::new(db, std::io::stdout(), config.output_format);

    if let Some(command) = &args.command {
        info!("Executing command: {}", command);
        interpreter.execute_line(command)?;
    } else if let Some(file) = &args.file {
        info!("Executing file: {}", file.display());
        let script = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        run_script(&mut interpreter, &script)?;
    } else {
        let mut repl = Repl::new(&config, interpreter)?;
        if !config.quiet {
            repl.print_banner();
        }
        repl.run()?;
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("tabula_cli=debug,tabula_storage=debug")
        } else {
            EnvFilter::new("tabula=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = if let Some(path) = &args.config {
        CliConfig::from_file(path)?
    } else {
        CliConfig::load_default()?
    };

    if let Some(workdir) = &args.workdir {
        config.store.workdir = workdir.clone();
    }
    if let Some(output) = args.output {
        config.output_format = output.into();
    }
    config.quiet |= args.quiet;

    Ok(config)
}
