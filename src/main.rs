//! Virtual-Memory Simulator Console CLI.
//!
//! The main executable for the console. It handles command-line argument
//! parsing, configuration loading, logger setup and runs the operator console
//! until the input ends.
//!
//! # Usage
//!
//! The console can run in two modes:
//! 1. **Interactive**: Commands are read from stdin with a prompt.
//! 2. **Scripted**: `--script <file>` replays a command file, one command per line.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use memsim_console::config::{ConsoleConfig, TransportKind};
use memsim_console::console::Console;
use memsim_console::logger::{self, ConsoleLogger};
use memsim_console::session::Session;

/// Command-line arguments for the simulator console.
#[derive(Parser, Debug)]
#[command(author, version, about = "Virtual-Memory Simulator Console")]
struct Args {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `general.transport` (`socket` or `file`).
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Overrides `general.log_level`.
    #[arg(long)]
    log_level: Option<String>,

    /// Reads commands from a file instead of stdin.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Confirms destructive address-width migrations without asking.
    #[arg(short = 'y', long)]
    assume_yes: bool,

    /// Restores settings and processes left in the working directory.
    #[arg(long)]
    recover: bool,
}

/// Main entry point for the console.
///
/// # Behavior
///
/// 1. **Configuration**: Parses arguments and loads the TOML configuration.
/// 2. **Session**: Builds the session with the selected transport, optionally recovering state.
/// 3. **Console**: Runs commands until `quit` or end of input.
/// 4. **Teardown**: Stops the engine and removes the session documents.
fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    if let Some(transport) = args.transport {
        config.general.transport = transport;
    }
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }

    ConsoleLogger::new(logger::parse_level(&config.general.log_level))
        .init()
        .context("failed to install logger")?;

    println!("Console Configuration");
    println!("--------------------");
    println!("  Transport:          {}", config.general.transport);
    println!(
        "  Engine:             {}{}",
        config.engine.executable_path().display(),
        if config.engine.launch { "" } else { " (not launched)" }
    );
    match config.general.transport {
        TransportKind::Socket => println!("  Endpoint:           {}", config.socket.endpoint),
        TransportKind::File => println!(
            "  Documents:          {}",
            config.engine.work_dir.display()
        ),
    }
    println!("--------------------");

    let mut session = Session::new(&config);
    if args.recover {
        match session.recover() {
            Ok(true) => println!("[*] Recovered {} process(es)", session.processes().len()),
            Ok(false) => println!("[*] Nothing to recover"),
            Err(e) => println!("[!] Recovery failed: {}", e),
        }
    }

    let mut session = match &args.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open script {}", path.display()))?;
            let mut console = Console::new(session, BufReader::new(file), args.assume_yes).quiet();
            console.run().context("failed to read script")?;
            console.into_session()
        }
        None => {
            let mut console = Console::new(session, io::stdin().lock(), args.assume_yes);
            console.run().context("failed to read stdin")?;
            console.into_session()
        }
    };

    println!("\n[*] Shutting down");
    session.teardown().context("teardown failed")?;
    Ok(())
}
