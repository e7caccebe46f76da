//! Engine Transports.
//!
//! The console talks to the external simulation engine through one of two
//! transports: a persistent loopback socket with request/response exchanges,
//! or a file drop where documents are written to disk and a results file is
//! polled. Both sit behind `BackendTransport`, share the bounded retry state
//! machine and delegate process lifecycle to `EngineSupervisor`.

/// File-drop transport.
pub mod file_drop;

/// Bounded retry state machine.
pub mod retry;

/// Socket transport.
pub mod socket;

/// Engine process lifecycle.
pub mod supervisor;

pub use file_drop::FileDropTransport;
pub use retry::{Retry, RetryError, RetryPolicy, RetryState};
pub use socket::{SocketState, SocketTransport};
pub use supervisor::EngineSupervisor;

use crate::common::TransportError;
use crate::config::{ConsoleConfig, TransportKind};
use crate::documents::{DocumentStore, Snapshot};
use crate::stats::ResultsDocument;

/// A channel to the simulation engine.
///
/// Implementations block until the engine answers, the retry budget is spent
/// or a deadline passes. At most one push is in flight at a time; callers
/// hold `&mut self` for its duration.
pub trait BackendTransport {
    /// Returns a short name for logging.
    fn name(&self) -> &str;

    /// Sends `snapshot` to the engine and waits for its results document.
    fn push(&mut self, snapshot: &Snapshot) -> Result<ResultsDocument, TransportError>;

    /// Closes connections and terminates an owned engine process.
    fn shutdown(&mut self);
}

/// Builds the transport selected by `config`.
pub fn from_config(config: &ConsoleConfig) -> Box<dyn BackendTransport> {
    match config.general.transport {
        TransportKind::Socket => {
            let supervisor = config
                .engine
                .launch
                .then(|| EngineSupervisor::new(&config.engine));
            Box::new(SocketTransport::new(
                &config.socket,
                &config.retry,
                supervisor,
            ))
        }
        TransportKind::File => {
            let documents = DocumentStore::new(&config.engine, &config.file_drop);
            // The engine runs inside work_dir, so it gets the bare file names.
            let supervisor = EngineSupervisor::new(&config.engine).with_args([
                config.file_drop.settings_file.to_string_lossy().into_owned(),
                config.file_drop.processes_file.to_string_lossy().into_owned(),
            ]);
            Box::new(FileDropTransport::new(
                documents,
                supervisor,
                config.file_drop.poll_policy(&config.retry),
                config.file_drop.parse_retry_delay(),
                config.file_drop.restart_each_push,
            ))
        }
    }
}
