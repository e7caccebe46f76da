//! Line-oriented operator console.
//!
//! Reads commands from stdin or a script, drives the [`Session`] and prints
//! what changed. Errors are reported and the loop keeps going; only `quit` or
//! end of input stops it.

/// Command-line parsing for console input.
pub mod commands;

pub use commands::{apply_overrides, Command, SettingOverride};

use crate::common::{AddressWidth, ConsoleError};
use crate::process::{MigrationPlan, Process};
use crate::session::Session;
use crate::settings::{SettingsOptions, RAM_SIZES_GB};
use crate::stats::ResultsSummary;
use std::io::{self, BufRead, Write};

/// Whether the loop continues after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Operator console over a [`Session`].
pub struct Console<R> {
    session: Session,
    input: R,
    assume_yes: bool,
    prompt: bool,
}

impl<R: BufRead> Console<R> {
    /// Creates a console reading commands from `input`.
    ///
    /// # Arguments
    ///
    /// * `session` - Session to drive
    /// * `input` - Command source; also answers migration prompts
    /// * `assume_yes` - Confirm destructive migrations without asking
    pub fn new(session: Session, input: R, assume_yes: bool) -> Self {
        Self {
            session,
            input,
            assume_yes,
            prompt: true,
        }
    }

    /// Disables the input prompt, for scripted runs.
    pub fn quiet(mut self) -> Self {
        self.prompt = false;
        self
    }

    /// Session driven by this console.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Hands the session back, e.g. for teardown.
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Runs until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let mut line = String::new();
        loop {
            if self.prompt {
                print!("memsim> ");
                io::stdout().flush()?;
            }
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(());
            }

            let cmd = match Command::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(msg) => {
                    println!("[!] {}", msg);
                    continue;
                }
            };

            match self.execute(cmd) {
                Ok(Flow::Quit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(e) => println!("[!] {}", e),
            }
        }
    }

    /// Executes one command against the session.
    pub fn execute(&mut self, cmd: Command) -> Result<Flow, ConsoleError> {
        match cmd {
            Command::Set(overrides) => self.set(&overrides)?,
            Command::Add {
                kind,
                size_gb,
                has_priority,
            } => {
                let id = self.session.add_process(kind, size_gb, has_priority)?;
                if let (Some(p), Some(settings)) = (self.session.process(id), self.session.settings()) {
                    println!(
                        "[*] Added {} process {} '{}' at {}",
                        p.kind.type_label(),
                        p.id,
                        p.name(),
                        p.virtual_address.format(settings.address_width)
                    );
                }
            }
            Command::Stop(id) => {
                self.session.stop_process(id)?;
                println!("[*] Process {} stopped", id);
            }
            Command::Resume(id) => {
                self.session.resume_process(id)?;
                println!("[*] Process {} resumed", id);
            }
            Command::Remove(id) => {
                let p = self.session.remove_process(id)?;
                println!("[*] Process {} '{}' removed", p.id, p.name());
            }
            Command::List => match self.session.settings() {
                Some(settings) => print_processes(self.session.processes(), settings.address_width),
                None => println!("No settings applied yet."),
            },
            Command::Show => match self.session.settings() {
                Some(settings) => settings.print(),
                None => println!("No settings applied yet."),
            },
            Command::Options(ram) => {
                let ram = ram
                    .or_else(|| self.session.settings().map(|s| s.ram_size_gb))
                    .unwrap_or(RAM_SIZES_GB[0]);
                print_options(ram);
            }
            Command::Simulate => {
                let results = self.session.simulate()?;
                ResultsSummary::from(results).print();
            }
            Command::Results => match self.session.last_results() {
                Some(results) => ResultsSummary::from(results).print(),
                None => println!("No results yet."),
            },
            Command::Help => print_help(),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn set(&mut self, overrides: &[SettingOverride]) -> Result<(), ConsoleError> {
        let base = self.session.settings().cloned().unwrap_or_default();
        let candidate = apply_overrides(&base, overrides);

        let assume_yes = self.assume_yes;
        let input = &mut self.input;
        let mut confirm = |plan: &MigrationPlan| confirm_destructive(&mut *input, plan, assume_yes);
        let report = self.session.apply_settings(candidate, &mut confirm)?;

        if report.is_first() {
            println!("[*] Settings applied");
        } else {
            println!("[*] Settings updated");
        }
        if let Some(plan) = &report.migration {
            println!(
                "[*] Addresses migrated {} -> {}: {} kept, {} deleted",
                plan.from,
                plan.to,
                plan.kept.len(),
                report.deleted.len()
            );
        }
        if let Some(settings) = self.session.settings() {
            settings.print();
        }
        Ok(())
    }
}

fn confirm_destructive<R: BufRead>(input: &mut R, plan: &MigrationPlan, assume_yes: bool) -> bool {
    println!(
        "[!] Narrowing {} -> {} deletes {} process(es):",
        plan.from,
        plan.to,
        plan.doomed.len()
    );
    for p in &plan.doomed {
        println!("      {} {:<16} {}", p.id, p.name(), p.virtual_address.format(plan.from));
    }
    if assume_yes {
        println!("    Proceeding (--assume-yes)");
        return true;
    }

    print!("    Proceed? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(n) if n > 0 => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}

/// Prints processes in canonical order.
pub fn print_processes(processes: &[Process], width: AddressWidth) {
    if processes.is_empty() {
        println!("No processes.");
        return;
    }
    println!(
        "{:<6} {:<16} {:>8} {:<7} {:<9} {:<8} Virtual Address",
        "ID", "Name", "Size GB", "Type", "Priority", "State"
    );
    for p in processes {
        println!(
            "{:<6} {:<16} {:>8} {:<7} {:<9} {:<8} {}",
            p.id,
            p.name(),
            p.size_gb,
            p.kind.type_label(),
            if p.has_priority { "yes" } else { "no" },
            if p.is_stopped { "stopped" } else { "running" },
            p.virtual_address.format(width)
        );
    }
}

fn print_options(ram_size_gb: u32) {
    let join = |v: Vec<String>| v.join(", ");
    let options = SettingsOptions::for_ram(ram_size_gb);
    println!("Options for {} GB RAM", ram_size_gb);
    println!("--------------------");
    println!(
        "  RAM Sizes (GB):     {}",
        join(RAM_SIZES_GB.iter().map(u32::to_string).collect())
    );
    println!(
        "  Page Sizes (KB):    {}",
        join(options.page_sizes_kb.iter().map(u32::to_string).collect())
    );
    println!(
        "  TLB Sizes:          {}",
        join(options.tlb_sizes.iter().map(u32::to_string).collect())
    );
    println!(
        "  Address Widths:     {}",
        join(options.widths.iter().map(AddressWidth::to_string).collect())
    );
    println!("--------------------");
}

fn print_help() {
    println!("Commands:");
    println!("  set key=value ...                 ram page tlb tlb_enabled va rom swap alloc");
    println!("  add user <name> <size_gb> [priority]");
    println!("  add system <role> <size_gb> [priority]");
    println!("  stop <id> | resume <id> | remove <id>");
    println!("  list | show | options [ram_gb]");
    println!("  simulate | results");
    println!("  help | quit");
}

