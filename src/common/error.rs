//! Error Types.
//!
//! `ConsoleError` covers every way a console operation can fail. Failures that
//! originate in an engine transport are carried as `TransportError` so callers
//! can tell local validation problems apart from backend trouble.

use super::addr::AddressWidth;
use super::data::ProcessId;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of an exchange with the external simulation engine.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The engine executable is missing or could not be launched.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// No connection could be established within the retry budget.
    #[error("could not connect to {endpoint} after {attempts} attempts")]
    ConnectionFailed {
        /// Endpoint that was dialed.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The engine did not answer before the response deadline.
    #[error("no response from engine within {0:?}")]
    Timeout(Duration),

    /// The engine answered with something that is not a results document.
    #[error("invalid response from engine: {0}")]
    InvalidResponse(String),

    /// The file-drop engine never produced a readable results document.
    #[error("engine did not respond after {attempts} polling attempts")]
    EngineDidNotRespond {
        /// Number of polling attempts made.
        attempts: u32,
    },

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure of a console operation.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The operator supplied invalid input.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The referenced process does not exist.
    #[error("process {0} not found")]
    NotFound(ProcessId),

    /// Settings were resubmitted without any change.
    #[error("no changes detected")]
    NoChange,

    /// Processes cannot be managed before settings have been applied.
    #[error("configuration has not been applied yet")]
    NotConfigured,

    /// Narrowing the address width would delete processes and was declined.
    #[error("address width change declined; {} process(es) would have been deleted", doomed.len())]
    DestructiveMigration {
        /// Processes that would have been deleted.
        doomed: Vec<ProcessId>,
    },

    /// No free address remains in the addressable span.
    #[error("no free {width} address left in a span of {span:#x} bytes")]
    AddressSpaceExhausted {
        /// Width in effect.
        width: AddressWidth,
        /// Number of addressable locations.
        span: u64,
    },

    /// A settings, process or results document could not be read or written.
    #[error("persistence failed for {}: {source}", path.display())]
    Persistence {
        /// Document path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The console configuration file is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine exchange failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConsoleError {
    /// Builds a `Persistence` error for `path`.
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}
