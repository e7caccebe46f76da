//! Virtual-Memory Simulator Configuration Console.
//!
//! This crate is the operator-facing half of a virtual-memory simulator. It
//! validates environment settings, keeps the list of simulated processes with
//! their virtual addresses, and pushes every accepted change to a separate
//! simulation engine, reading back TLB and page-fault statistics.
//!
//! # Architecture
//!
//! * **Settings**: option tables derived from RAM size and the committed settings store.
//! * **Processes**: address allocation, width migration and the ordered registry.
//! * **Transport**: socket and file-drop clients plus the engine process supervisor.
//! * **Session**: the single writer tying the pieces together.
//!
//! # Modules
//!
//! * `common`: Shared identifiers, address types and error handling.
//! * `config`: Console configuration loading and parsing.
//! * `console`: Line-oriented operator console.
//! * `documents`: JSON documents exchanged with the engine.
//! * `logger`: Stderr logger behind the `log` facade.
//! * `process`: Processes, address allocation and migration.
//! * `session`: Owner of all mutable console state.
//! * `settings`: Environment settings and their option tables.
//! * `stats`: Engine results parsing and reporting.
//! * `transport`: Engine synchronization clients.

/// Shared identifiers, address types and error handling.
///
/// Provides the address width and virtual address types, process identifiers
/// and the error taxonomy used throughout the console.
pub mod common;

/// Configuration for transports, engine launch and retry budgets.
///
/// Loads and parses TOML configuration files; every field has a default so
/// an empty file is a valid configuration.
pub mod config;

/// Operator console: command parsing and the read-eval loop.
pub mod console;

/// On-disk JSON documents shared with the engine.
pub mod documents;

/// Stderr logger for the `log` facade.
pub mod logger;

/// Simulated processes, virtual address allocation and width migration.
///
/// Keeps the canonical process order and guarantees address uniqueness
/// within the configured RAM span.
pub mod process;

/// Session state owner.
pub mod session;

/// Environment settings, option tables and the committed settings store.
pub mod settings;

/// Engine results parsing and reporting.
///
/// Validates the results document returned after every push and aggregates
/// per-process TLB and page-fault statistics.
pub mod stats;

/// Engine synchronization.
///
/// Implements the socket and file-drop clients, their shared retry policy
/// and the engine process supervisor.
pub mod transport;
