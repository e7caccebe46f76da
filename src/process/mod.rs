//! Simulated Processes.
//!
//! A `Process` is one entry of the population handed to the engine. The
//! registry owns the collection and its ordering, the allocator hands out
//! collision-free virtual addresses and the migrator rewrites or purges
//! addresses when the configured width changes.

/// Collision-free virtual address generation.
pub mod allocator;

/// Address-width migration planning.
pub mod migrate;

/// Canonical process collection and ordering policy.
pub mod registry;

pub use allocator::VirtualAddressAllocator;
pub use migrate::{AddressWidthMigrator, MigrationPlan};
pub use registry::ProcessRegistry;

use crate::common::{ProcessId, ProcessKind, VirtAddr};

/// Ordering bucket of a process; lower buckets are listed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderBucket {
    /// Priority-flagged and running.
    PriorityRunning = 0,
    /// Running without priority.
    Running = 1,
    /// Stopped, regardless of priority.
    Stopped = 2,
}

/// A simulated process.
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    /// Console-assigned id, unique for the session.
    pub id: ProcessId,
    /// User process with a name, or a system role.
    pub kind: ProcessKind,
    /// Size in GB, always positive.
    pub size_gb: f64,
    /// Running priority processes are listed first.
    pub has_priority: bool,
    /// Stopped processes are listed last.
    pub is_stopped: bool,
    /// Unique, below both `2^width` and the RAM size.
    pub virtual_address: VirtAddr,
    /// Creation order key.
    pub created: u64,
}

impl Process {
    /// Returns the process name.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Returns the ordering bucket for the current state.
    pub fn bucket(&self) -> OrderBucket {
        match (self.is_stopped, self.has_priority) {
            (true, _) => OrderBucket::Stopped,
            (false, true) => OrderBucket::PriorityRunning,
            (false, false) => OrderBucket::Running,
        }
    }
}
