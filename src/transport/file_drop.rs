//! File-Drop Transport.
//!
//! Writes the settings and process documents into the engine's working
//! directory, raises the readiness marker, makes sure an engine process is
//! running and then polls for the results document. A results file that does
//! not parse yet (the engine may still be writing it) costs one attempt and is
//! re-read after a short delay. There is no live channel back from the engine,
//! so every push repeats the whole sequence.

use super::retry::RetryPolicy;
use super::supervisor::EngineSupervisor;
use super::BackendTransport;
use crate::common::TransportError;
use crate::documents::{DocumentStore, Snapshot};
use crate::stats::ResultsDocument;
use std::thread;
use std::time::Duration;

/// Result of one look at the results document.
enum Poll {
    Ready(ResultsDocument),
    Missing,
    Unparsable,
}

/// Engine transport over documents on disk.
pub struct FileDropTransport {
    documents: DocumentStore,
    supervisor: EngineSupervisor,
    poll_policy: RetryPolicy,
    parse_retry_delay: Duration,
    restart_each_push: bool,
}

impl FileDropTransport {
    /// Creates a file-drop transport.
    ///
    /// # Arguments
    ///
    /// * `documents` - Document paths shared with the engine
    /// * `supervisor` - Engine process launcher
    /// * `poll_policy` - Interval and budget for polling the results document
    /// * `parse_retry_delay` - Delay before re-reading an unparsable results file
    /// * `restart_each_push` - Relaunch the engine for every push
    pub fn new(
        documents: DocumentStore,
        supervisor: EngineSupervisor,
        poll_policy: RetryPolicy,
        parse_retry_delay: Duration,
        restart_each_push: bool,
    ) -> Self {
        Self {
            documents,
            supervisor,
            poll_policy,
            parse_retry_delay,
            restart_each_push,
        }
    }

    /// Documents this transport writes and polls.
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    fn poll_once(&self) -> Result<Poll, TransportError> {
        let Some(bytes) = self.documents.read_results()? else {
            return Ok(Poll::Missing);
        };
        match ResultsDocument::from_slice(&bytes) {
            Ok(doc) => Ok(Poll::Ready(doc)),
            Err(e) => {
                log::debug!("results document not readable yet: {}", e);
                Ok(Poll::Unparsable)
            }
        }
    }

    /// Polls for the results document within the attempt budget.
    fn await_results(&self) -> Result<ResultsDocument, TransportError> {
        let mut retry = self.poll_policy.start();
        loop {
            let wait = match self.poll_once()? {
                Poll::Ready(doc) => {
                    log::info!(
                        "results document read after {} attempt(s)",
                        retry.attempt()
                    );
                    return Ok(doc);
                }
                Poll::Missing => retry.fail(),
                Poll::Unparsable => retry.fail().map(|_| self.parse_retry_delay),
            };

            match wait {
                Some(delay) => {
                    thread::sleep(delay);
                    retry.resume();
                }
                None => {
                    let attempts = retry.attempt();
                    log::error!("no results document after {} attempts", attempts);
                    return Err(TransportError::EngineDidNotRespond { attempts });
                }
            }
        }
    }
}

impl BackendTransport for FileDropTransport {
    fn name(&self) -> &str {
        "file"
    }

    fn push(&mut self, snapshot: &Snapshot) -> Result<ResultsDocument, TransportError> {
        self.documents.clear_results()?;
        self.documents.write_snapshot(snapshot)?;
        self.documents.mark_ready()?;
        log::debug!(
            "dropped {} process(es) into {}",
            snapshot.processes.len(),
            self.documents.processes_path().display()
        );

        self.supervisor.ensure_running(self.restart_each_push)?;
        self.await_results()
    }

    fn shutdown(&mut self) {
        self.supervisor.terminate();
    }
}
