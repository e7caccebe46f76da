//! Engine Documents.
//!
//! Wire shapes of the process document and the combined snapshot, plus the
//! on-disk store that holds the settings, process and results documents in
//! the engine's working directory. The store assumes a single console writing
//! and a single engine reading; there is no cross-process locking. Writes go
//! through a temporary file and a rename so the engine never observes a
//! half-written document.

use crate::common::{AddressWidth, ProcessId, ProcessKind, SystemRole, VirtAddr};
use crate::config::{EngineConfig, FileDropConfig};
use crate::process::Process;
use crate::settings::Settings;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Process type label on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessType {
    User,
    System,
}

/// One entry of the process document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessDocument {
    /// Decimal process id.
    pub id: String,
    pub name: String,
    #[serde(serialize_with = "serialize_size")]
    pub size_gb: f64,
    #[serde(rename = "type")]
    pub kind: ProcessType,
    pub has_priority: bool,
    pub is_process_stop: bool,
    /// Zero-padded `0x` hex for the width in effect.
    pub virtual_address: String,
}

impl ProcessDocument {
    /// Renders `proc` with its address formatted for `width`.
    pub fn from_process(proc: &Process, width: AddressWidth) -> Self {
        Self {
            id: proc.id.to_string(),
            name: proc.name().to_string(),
            size_gb: proc.size_gb,
            kind: match proc.kind {
                ProcessKind::User { .. } => ProcessType::User,
                ProcessKind::System { .. } => ProcessType::System,
            },
            has_priority: proc.has_priority,
            is_process_stop: proc.is_stopped,
            virtual_address: proc.virtual_address.format(width),
        }
    }

    /// Converts the document entry back into a process.
    ///
    /// `created` is left at zero; the registry assigns creation order on restore.
    pub fn to_process(&self) -> Result<Process, String> {
        let id = self
            .id
            .parse::<ProcessId>()
            .map_err(|e| format!("bad process id '{}': {}", self.id, e))?;
        let kind = match self.kind {
            ProcessType::User => ProcessKind::user(self.name.clone()),
            ProcessType::System => ProcessKind::system(self.name.parse::<SystemRole>()?),
        };
        let virtual_address = VirtAddr::parse(&self.virtual_address)
            .ok_or_else(|| format!("bad virtual address '{}'", self.virtual_address))?;
        Ok(Process {
            id,
            kind,
            size_gb: self.size_gb,
            has_priority: self.has_priority,
            is_stopped: self.is_process_stop,
            virtual_address,
            created: 0,
        })
    }
}

/// Whole sizes go out as JSON integers, fractional ones as floats.
fn serialize_size<S: Serializer>(size: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if size.fract() == 0.0 && *size >= 0.0 && *size <= u32::MAX as f64 {
        serializer.serialize_u64(*size as u64)
    } else {
        serializer.serialize_f64(*size)
    }
}

/// Settings plus the ordered process list, sent to the engine as one document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub settings: Settings,
    pub processes: Vec<ProcessDocument>,
}

impl Snapshot {
    /// Captures the committed settings and the processes in canonical order.
    pub fn capture(settings: &Settings, processes: &[Process]) -> Self {
        Self {
            settings: settings.clone(),
            processes: processes
                .iter()
                .map(|p| ProcessDocument::from_process(p, settings.address_width))
                .collect(),
        }
    }
}

/// Settings, process, results and readiness documents in one directory.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    settings_path: PathBuf,
    processes_path: PathBuf,
    results_path: PathBuf,
    ready_path: Option<PathBuf>,
}

impl DocumentStore {
    /// Creates a store rooted at the engine's working directory.
    pub fn new(engine: &EngineConfig, files: &FileDropConfig) -> Self {
        let dir = &engine.work_dir;
        Self {
            settings_path: dir.join(&files.settings_file),
            processes_path: dir.join(&files.processes_file),
            results_path: dir.join(&files.results_file),
            ready_path: files
                .ready_file
                .as_ref()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| dir.join(p)),
        }
    }

    /// Path of the settings document.
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Path of the process document.
    pub fn processes_path(&self) -> &Path {
        &self.processes_path
    }

    /// Path of the results document written by the engine.
    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Path of the ready marker, if one is configured.
    pub fn ready_path(&self) -> Option<&Path> {
        self.ready_path.as_deref()
    }

    /// Atomically replaces the settings document.
    pub fn write_settings(&self, settings: &Settings) -> io::Result<()> {
        write_json(&self.settings_path, settings)
    }

    /// Atomically replaces the process document.
    pub fn write_processes(&self, processes: &[ProcessDocument]) -> io::Result<()> {
        write_json(&self.processes_path, &processes)
    }

    /// Writes both halves of a snapshot to their documents.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> io::Result<()> {
        self.write_settings(&snapshot.settings)?;
        self.write_processes(&snapshot.processes)
    }

    /// Reads the settings document, `None` if it does not exist.
    pub fn read_settings(&self) -> io::Result<Option<Settings>> {
        read_json(&self.settings_path)
    }

    /// Reads the process document, `None` if it does not exist.
    pub fn read_processes(&self) -> io::Result<Option<Vec<ProcessDocument>>> {
        read_json(&self.processes_path)
    }

    /// Returns the raw results document, `None` if the engine has not written it.
    pub fn read_results(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.results_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates the readiness marker, if one is configured.
    pub fn mark_ready(&self) -> io::Result<()> {
        match &self.ready_path {
            Some(path) => fs::write(path, b"ready"),
            None => Ok(()),
        }
    }

    /// Deletes a stale results document and readiness marker.
    pub fn clear_results(&self) -> io::Result<()> {
        remove_if_exists(&self.results_path)?;
        match &self.ready_path {
            Some(path) => remove_if_exists(path),
            None => Ok(()),
        }
    }

    /// Deletes every document; used at session teardown.
    pub fn remove_all(&self) -> io::Result<()> {
        remove_if_exists(&self.settings_path)?;
        remove_if_exists(&self.processes_path)?;
        self.clear_results()
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> io::Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
