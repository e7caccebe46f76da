//! Process Registry.
//!
//! Owns the canonical process list. Every mutation re-sorts the list into the
//! display and scheduling order: priority-flagged running processes first,
//! then the other running processes, then stopped ones, each bucket in
//! creation order.

use super::{MigrationPlan, Process, VirtualAddressAllocator};
use crate::common::{ConsoleError, ProcessId, ProcessKind};
use crate::settings::Settings;
use std::collections::HashSet;

/// Canonical, ordered collection of simulated processes.
pub struct ProcessRegistry {
    processes: Vec<Process>,
    next_id: ProcessId,
    next_seq: u64,
    allocator: VirtualAddressAllocator,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new(VirtualAddressAllocator::default())
    }
}

impl ProcessRegistry {
    /// Creates an empty registry that draws addresses from `allocator`.
    pub fn new(allocator: VirtualAddressAllocator) -> Self {
        Self {
            processes: Vec::new(),
            next_id: ProcessId::FIRST,
            next_seq: 0,
            allocator,
        }
    }

    /// Returns the processes in canonical order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Looks up a process by id.
    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }

    /// Number of processes, stopped ones included.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` when no process exists.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Returns the id the next added process will receive.
    pub fn next_id(&self) -> ProcessId {
        self.next_id
    }

    /// Returns the set of addresses held by live processes.
    pub fn addresses(&self) -> HashSet<u64> {
        self.processes
            .iter()
            .map(|p| p.virtual_address.val())
            .collect()
    }

    /// Adds a process and assigns it an id and a unique virtual address.
    ///
    /// # Arguments
    ///
    /// * `kind` - User process with a name, or a system role
    /// * `size_gb` - Process size, must be positive
    /// * `has_priority` - Ordering hint
    /// * `settings` - Committed settings providing the width and RAM span
    ///
    /// # Returns
    ///
    /// The newly added process. On `ValidationFailed` nothing is mutated.
    pub fn add(
        &mut self,
        kind: ProcessKind,
        size_gb: f64,
        has_priority: bool,
        settings: &Settings,
    ) -> Result<&Process, ConsoleError> {
        if let ProcessKind::User { name } = &kind {
            if name.trim().is_empty() {
                return Err(ConsoleError::ValidationFailed(
                    "process name is required".to_string(),
                ));
            }
        }
        if !(size_gb.is_finite() && size_gb > 0.0) {
            return Err(ConsoleError::ValidationFailed(format!(
                "process size must be a positive number, got {}",
                size_gb
            )));
        }

        let address = self.allocator.allocate(
            settings.address_width,
            settings.ram_size_bytes(),
            &self.addresses(),
        )?;

        let id = self.next_id;
        self.next_id = id.next();
        let created = self.next_seq;
        self.next_seq += 1;

        log::info!(
            "added process {} '{}' ({} GB) at {}",
            id,
            kind.name(),
            size_gb,
            address.format(settings.address_width)
        );

        self.processes.push(Process {
            id,
            kind,
            size_gb,
            has_priority,
            is_stopped: false,
            virtual_address: address,
            created,
        });
        self.reorder();

        self.get(id).ok_or(ConsoleError::NotFound(id))
    }

    /// Removes a process.
    pub fn remove(&mut self, id: ProcessId) -> Result<Process, ConsoleError> {
        let pos = self
            .processes
            .iter()
            .position(|p| p.id == id)
            .ok_or(ConsoleError::NotFound(id))?;
        let removed = self.processes.remove(pos);
        log::info!("removed process {} '{}'", id, removed.name());
        self.reorder();
        Ok(removed)
    }

    /// Marks a process as stopped.
    pub fn stop(&mut self, id: ProcessId) -> Result<&Process, ConsoleError> {
        self.set_stopped(id, true)
    }

    /// Marks a stopped process as running again.
    pub fn resume(&mut self, id: ProcessId) -> Result<&Process, ConsoleError> {
        self.set_stopped(id, false)
    }

    fn set_stopped(&mut self, id: ProcessId, stopped: bool) -> Result<&Process, ConsoleError> {
        let proc = self
            .processes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ConsoleError::NotFound(id))?;
        if proc.is_stopped == stopped {
            log::debug!("process {} already {}", id, state_name(stopped));
        }
        proc.is_stopped = stopped;
        log::info!("process {} '{}' {}", id, proc.name(), state_name(stopped));
        self.reorder();
        self.get(id).ok_or(ConsoleError::NotFound(id))
    }

    /// Re-sorts the list into canonical order and returns it.
    ///
    /// Sorting is stable and keyed on (bucket, creation order), so calling this
    /// repeatedly yields the same sequence.
    pub fn reorder(&mut self) -> &[Process] {
        self.processes.sort_by_key(|p| (p.bucket(), p.created));
        &self.processes
    }

    /// Deletes the processes a confirmed migration plan marked as doomed.
    ///
    /// # Returns
    ///
    /// The deleted processes.
    pub fn apply_migration(&mut self, plan: &MigrationPlan) -> Vec<Process> {
        let doomed: HashSet<ProcessId> = plan.doomed.iter().map(|p| p.id).collect();
        let (removed, kept): (Vec<Process>, Vec<Process>) = self
            .processes
            .drain(..)
            .partition(|p| doomed.contains(&p.id));
        self.processes = kept;
        for proc in &removed {
            log::info!(
                "deleted process {} '{}': address {:#x} does not fit {}",
                proc.id,
                proc.name(),
                proc.virtual_address,
                plan.to
            );
        }
        self.reorder();
        removed
    }

    /// Replaces the contents with recovered processes.
    ///
    /// Creation order follows the order of `processes`; the next id continues
    /// after the largest recovered id.
    pub fn restore(&mut self, processes: Vec<Process>) -> Result<(), ConsoleError> {
        let mut ids = HashSet::new();
        let mut addrs = HashSet::new();
        for proc in &processes {
            if !(proc.size_gb.is_finite() && proc.size_gb > 0.0) {
                return Err(ConsoleError::ValidationFailed(format!(
                    "process {} size must be a positive number, got {}",
                    proc.id, proc.size_gb
                )));
            }
            if !ids.insert(proc.id) {
                return Err(ConsoleError::ValidationFailed(format!(
                    "duplicate process id {}",
                    proc.id
                )));
            }
            if !addrs.insert(proc.virtual_address.val()) {
                return Err(ConsoleError::ValidationFailed(format!(
                    "duplicate virtual address {:#x}",
                    proc.virtual_address
                )));
            }
        }

        self.processes = processes
            .into_iter()
            .enumerate()
            .map(|(seq, mut proc)| {
                proc.created = seq as u64;
                proc
            })
            .collect();
        self.next_seq = self.processes.len() as u64;
        self.next_id = self
            .processes
            .iter()
            .map(|p| p.id.next())
            .max()
            .map_or(ProcessId::FIRST, |id| id.max(ProcessId::FIRST));
        self.reorder();
        Ok(())
    }

    /// Removes every process and restarts id assignment.
    pub fn clear(&mut self) {
        self.processes.clear();
        self.next_id = ProcessId::FIRST;
        self.next_seq = 0;
    }
}

fn state_name(stopped: bool) -> &'static str {
    if stopped {
        "stopped"
    } else {
        "resumed"
    }
}
