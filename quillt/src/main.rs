//! Quillt CLI - the command-line driver for the Quill bytecode virtual
//! machine.
//!
//! Parses arguments, initializes logging, loads configuration, and
//! dispatches to the appropriate command handler - the same shape as the
//! teacher's `faxt` binary.

mod commands;
mod config;
mod error;
mod program_file;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    disasm::{run_disasm, DisasmArgs},
    run::{run_run, RunArgs},
};
use config::Config;
use error::{QuilltError, Result};

#[derive(Parser, Debug)]
#[command(name = "quillt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI driver for the Quill bytecode virtual machine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "QUILLT_VERBOSE")]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "QUILLT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a function from a program file
    Run(RunCommand),
    /// Print a program file's instructions without executing them
    Disasm(DisasmCommand),
}

#[derive(Parser, Debug)]
struct RunCommand {
    /// Path to the JSON program file
    program: PathBuf,

    /// Function to run (defaults to the first function in the file)
    #[arg(short, long)]
    function: Option<String>,
}

#[derive(Parser, Debug)]
struct DisasmCommand {
    /// Path to the JSON program file
    program: PathBuf,

    /// Function to disassemble (defaults to the first function in the file)
    #[arg(short, long)]
    function: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let config = load_config(cli.config.as_deref())?;
    execute_command(cli.command, cli.verbose, config)
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") };
    let subscriber = fmt::layer().with_target(false).with_thread_ids(false).with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| QuilltError::Config(format!("failed to initialize logging: {e}")))?;
    Ok(())
}

fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

fn execute_command(command: Commands, verbose: bool, config: Config) -> Result<()> {
    match command {
        Commands::Run(args) => run_run(RunArgs {
            program: args.program,
            function: args.function,
            verbose,
            vm_config: config.vm.to_vm_config(),
        }),
        Commands::Disasm(args) => {
            run_disasm(DisasmArgs { program: args.program, function: args.function })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::parse_from(["quillt", "run", "prog.json"]);
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn parses_run_with_function_flag() {
        let cli = Cli::parse_from(["quillt", "run", "prog.json", "--function", "main"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.function, Some("main".to_string()));
        } else {
            panic!("expected Run command");
        }
    }

    #[test]
    fn parses_disasm_subcommand() {
        let cli = Cli::parse_from(["quillt", "disasm", "prog.json"]);
        assert!(matches!(cli.command, Commands::Disasm(_)));
    }

    #[test]
    fn parses_global_verbose() {
        let cli = Cli::parse_from(["quillt", "--verbose", "run", "prog.json"]);
        assert!(cli.verbose);
    }
}
