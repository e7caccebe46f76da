//! Address-Width Migration.
//!
//! When the configured width changes, every existing address has to be
//! re-expressed in the new width. Widening never changes a value. Narrowing
//! keeps an address only if none of the bits between the new and the old width
//! are set; the remaining processes are marked for deletion and must be
//! confirmed by the operator before anything is committed.

use super::Process;
use crate::common::{AddressWidth, ProcessId};

/// Outcome of planning a width change against the current processes.
#[derive(Clone, Debug, PartialEq)]
pub struct MigrationPlan {
    /// Width before the change.
    pub from: AddressWidth,
    /// Width after the change.
    pub to: AddressWidth,
    /// Processes whose address survives unchanged in value.
    pub kept: Vec<ProcessId>,
    /// Processes whose address cannot be represented in `to`.
    pub doomed: Vec<Process>,
}

impl MigrationPlan {
    /// Returns `true` if committing the plan deletes processes.
    pub fn is_destructive(&self) -> bool {
        !self.doomed.is_empty()
    }

    /// Returns the identifiers of the processes marked for deletion.
    pub fn doomed_ids(&self) -> Vec<ProcessId> {
        self.doomed.iter().map(|p| p.id).collect()
    }
}

/// Plans address rewrites for a width change.
pub struct AddressWidthMigrator;

impl AddressWidthMigrator {
    /// Returns the mask of bits in `[to, from)`.
    ///
    /// Zero when `to` is at least as wide as `from`.
    pub fn truncated_bits(from: AddressWidth, to: AddressWidth) -> u64 {
        from.mask() & !to.mask()
    }

    /// Splits `processes` into those that survive the change and those that must go.
    ///
    /// # Arguments
    ///
    /// * `from` - Width currently committed
    /// * `to` - Width requested
    /// * `processes` - Current registry contents
    pub fn migrate(from: AddressWidth, to: AddressWidth, processes: &[Process]) -> MigrationPlan {
        let truncated = Self::truncated_bits(from, to);
        let (doomed, kept): (Vec<&Process>, Vec<&Process>) = processes
            .iter()
            .partition(|p| p.virtual_address.val() & truncated != 0);

        MigrationPlan {
            from,
            to,
            kept: kept.into_iter().map(|p| p.id).collect(),
            doomed: doomed.into_iter().cloned().collect(),
        }
    }
}
