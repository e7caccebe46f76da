//! Console Session.
//!
//! A `Session` owns the settings store, the process registry, the document
//! store and the engine transport, and is the only way the presentation layer
//! mutates any of them. Every accepted mutation is persisted to the documents
//! first and then pushed to the engine, so an engine failure never loses
//! operator input: the error is returned, the canonical state stays as
//! committed.
//!
//! Operations run to completion on the caller's thread. A front end that moves
//! them to a worker must keep at most one in flight.

use crate::common::{ConsoleError, ProcessId, ProcessKind};
use crate::config::ConsoleConfig;
use crate::documents::{DocumentStore, ProcessDocument, Snapshot};
use crate::process::{Process, ProcessRegistry, VirtualAddressAllocator};
use crate::settings::{ApplyReport, ConfigStore, ConfirmMigration, Settings};
use crate::stats::ResultsDocument;
use crate::transport::{self, BackendTransport};

/// Single-writer owner of the console state.
pub struct Session {
    store: ConfigStore,
    registry: ProcessRegistry,
    documents: DocumentStore,
    transport: Box<dyn BackendTransport>,
    last_results: Option<ResultsDocument>,
}

impl Session {
    /// Creates a session with the transport selected by `config`.
    pub fn new(config: &ConsoleConfig) -> Self {
        Self::with_transport(config, transport::from_config(config))
    }

    /// Creates a session that pushes through `transport`.
    pub fn with_transport(config: &ConsoleConfig, transport: Box<dyn BackendTransport>) -> Self {
        Self {
            store: ConfigStore::new(),
            registry: ProcessRegistry::new(VirtualAddressAllocator::new(
                config.allocator.max_attempts,
            )),
            documents: DocumentStore::new(&config.engine, &config.file_drop),
            transport,
            last_results: None,
        }
    }

    /// Committed settings, `None` until the first successful apply.
    pub fn settings(&self) -> Option<&Settings> {
        self.store.committed()
    }

    /// Processes in canonical order.
    pub fn processes(&self) -> &[Process] {
        self.registry.processes()
    }

    /// Looks up a process by id.
    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.registry.get(id)
    }

    /// Results of the most recent successful push.
    pub fn last_results(&self) -> Option<&ResultsDocument> {
        self.last_results.as_ref()
    }

    /// Name of the engine transport in use.
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Session documents on disk.
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Applies new settings, migrating addresses if the width changed.
    ///
    /// `NoChange`, `ValidationFailed` and a declined `DestructiveMigration`
    /// leave everything untouched and make no engine call.
    pub fn apply_settings(
        &mut self,
        candidate: Settings,
        confirm: &mut dyn ConfirmMigration,
    ) -> Result<ApplyReport, ConsoleError> {
        let report = self.store.apply(candidate, &mut self.registry, confirm)?;
        self.persist()?;
        self.sync()?;
        Ok(report)
    }

    /// Adds a process under the committed settings.
    pub fn add_process(
        &mut self,
        kind: ProcessKind,
        size_gb: f64,
        has_priority: bool,
    ) -> Result<ProcessId, ConsoleError> {
        let settings = self
            .store
            .committed()
            .ok_or(ConsoleError::NotConfigured)?;
        let id = self.registry.add(kind, size_gb, has_priority, settings)?.id;
        self.persist()?;
        self.sync()?;
        Ok(id)
    }

    /// Removes a process and returns it.
    pub fn remove_process(&mut self, id: ProcessId) -> Result<Process, ConsoleError> {
        let removed = self.registry.remove(id)?;
        self.persist()?;
        self.sync()?;
        Ok(removed)
    }

    /// Marks a process stopped; it moves to the end of the list.
    pub fn stop_process(&mut self, id: ProcessId) -> Result<(), ConsoleError> {
        self.registry.stop(id)?;
        self.persist()?;
        self.sync()
    }

    /// Resumes a stopped process.
    pub fn resume_process(&mut self, id: ProcessId) -> Result<(), ConsoleError> {
        self.registry.resume(id)?;
        self.persist()?;
        self.sync()
    }

    /// Pushes the current snapshot again without changing anything.
    pub fn simulate(&mut self) -> Result<&ResultsDocument, ConsoleError> {
        self.sync()?;
        self.last_results.as_ref().ok_or(ConsoleError::NotConfigured)
    }

    /// Builds the snapshot the engine would receive now.
    pub fn snapshot(&self) -> Result<Snapshot, ConsoleError> {
        let settings = self.store.committed().ok_or(ConsoleError::NotConfigured)?;
        Ok(Snapshot::capture(settings, self.registry.processes()))
    }

    /// Reloads settings and processes left in the working directory.
    ///
    /// # Returns
    ///
    /// `true` if a settings document was found and restored.
    pub fn recover(&mut self) -> Result<bool, ConsoleError> {
        let settings_path = self.documents.settings_path().to_path_buf();
        let Some(settings) = self
            .documents
            .read_settings()
            .map_err(|e| ConsoleError::persistence(&settings_path, e))?
        else {
            return Ok(false);
        };

        let processes_path = self.documents.processes_path().to_path_buf();
        let docs = self
            .documents
            .read_processes()
            .map_err(|e| ConsoleError::persistence(&processes_path, e))?
            .unwrap_or_default();
        let processes = docs
            .iter()
            .map(ProcessDocument::to_process)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConsoleError::ValidationFailed)?;

        for proc in &processes {
            let address = proc.virtual_address.val();
            if !settings.address_width.fits(address) {
                return Err(ConsoleError::ValidationFailed(format!(
                    "process {} address {:#x} does not fit {}",
                    proc.id, proc.virtual_address, settings.address_width
                )));
            }
            if address >= settings.ram_size_bytes() {
                return Err(ConsoleError::ValidationFailed(format!(
                    "process {} address {:#x} lies beyond {} GB of RAM",
                    proc.id, proc.virtual_address, settings.ram_size_gb
                )));
            }
        }

        settings.validate()?;
        self.registry.restore(processes)?;
        self.store.restore(settings)?;
        log::info!(
            "recovered settings and {} process(es) from {}",
            self.registry.len(),
            settings_path.display()
        );
        Ok(true)
    }

    /// Deletes the session documents and shuts the transport down.
    pub fn teardown(&mut self) -> Result<(), ConsoleError> {
        self.transport.shutdown();
        self.store.reset();
        self.registry.clear();
        self.last_results = None;
        self.documents.remove_all().map_err(|e| {
            ConsoleError::persistence(self.documents.settings_path().to_path_buf(), e)
        })
    }

    fn persist(&self) -> Result<(), ConsoleError> {
        let Some(settings) = self.store.committed() else {
            return Ok(());
        };
        self.documents
            .write_settings(settings)
            .map_err(|e| ConsoleError::persistence(self.documents.settings_path(), e))?;

        let docs: Vec<ProcessDocument> = self
            .registry
            .processes()
            .iter()
            .map(|p| ProcessDocument::from_process(p, settings.address_width))
            .collect();
        self.documents
            .write_processes(&docs)
            .map_err(|e| ConsoleError::persistence(self.documents.processes_path(), e))
    }

    fn sync(&mut self) -> Result<(), ConsoleError> {
        let snapshot = self.snapshot()?;
        log::debug!(
            "pushing snapshot with {} process(es) via {}",
            snapshot.processes.len(),
            self.transport.name()
        );
        match self.transport.push(&snapshot) {
            Ok(results) => {
                self.last_results = Some(results);
                Ok(())
            }
            Err(e) => {
                log::error!("engine push failed: {}", e);
                Err(e.into())
            }
        }
    }
}
