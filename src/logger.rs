//! Stderr logger for the `log` facade.
//!
//! Diagnostics go to stderr as `[LEVEL] target: message` so they never mix
//! with the process tables and result reports printed on stdout.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

/// `log::Log` implementation that writes to stderr.
pub struct ConsoleLogger {
    max_level: LevelFilter,
}

impl ConsoleLogger {
    /// Creates a logger that passes records up to `max_level`.
    ///
    /// With the `always-trace` feature every level is passed.
    pub fn new(max_level: LevelFilter) -> Self {
        let max_level = if cfg!(feature = "always-trace") {
            LevelFilter::Trace
        } else {
            max_level
        };
        Self { max_level }
    }

    /// Installs the logger. Call this once during startup.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parses a level name such as `"debug"`, falling back to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}
