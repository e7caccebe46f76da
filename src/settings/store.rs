//! Settings Store.
//!
//! `ConfigStore` owns the committed settings. Applying a candidate validates
//! it, rejects an unchanged resubmission, and runs the address-width migration
//! against the process registry before committing. A narrowing change that
//! would delete processes is only committed if the operator confirms it;
//! declining leaves both the settings and the registry untouched.

use super::Settings;
use crate::common::ConsoleError;
use crate::process::{AddressWidthMigrator, MigrationPlan, Process, ProcessRegistry};

/// Asks the operator whether a destructive migration may proceed.
pub trait ConfirmMigration {
    /// Returns `true` to delete the processes listed in `plan.doomed`.
    fn confirm(&mut self, plan: &MigrationPlan) -> bool;
}

impl<F> ConfirmMigration for F
where
    F: FnMut(&MigrationPlan) -> bool,
{
    fn confirm(&mut self, plan: &MigrationPlan) -> bool {
        self(plan)
    }
}

/// What a successful `apply` did.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Settings that were replaced, `None` on the first application.
    pub previous: Option<Settings>,
    /// Width migration that ran, if the width changed with processes present.
    pub migration: Option<MigrationPlan>,
    /// Processes deleted by a confirmed narrowing migration.
    pub deleted: Vec<Process>,
}

impl ApplyReport {
    /// Returns `true` if this was the first application of the session.
    pub fn is_first(&self) -> bool {
        self.previous.is_none()
    }
}

/// Owner of the committed settings.
#[derive(Debug, Default)]
pub struct ConfigStore {
    committed: Option<Settings>,
}

impl ConfigStore {
    /// Creates a store with nothing committed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed settings, if any have been applied.
    pub fn committed(&self) -> Option<&Settings> {
        self.committed.as_ref()
    }

    /// Returns `true` once settings have been committed.
    pub fn is_configured(&self) -> bool {
        self.committed.is_some()
    }

    /// Validates and commits `candidate`.
    ///
    /// # Arguments
    ///
    /// * `candidate` - Settings requested by the operator
    /// * `registry` - Process registry to migrate when the width changes
    /// * `confirm` - Consulted only when narrowing would delete processes
    ///
    /// # Errors
    ///
    /// * `ValidationFailed` - candidate violates the option tables
    /// * `NoChange` - candidate equals the committed settings
    /// * `DestructiveMigration` - operator declined the deletions; nothing changed
    pub fn apply(
        &mut self,
        candidate: Settings,
        registry: &mut ProcessRegistry,
        confirm: &mut dyn ConfirmMigration,
    ) -> Result<ApplyReport, ConsoleError> {
        candidate.validate()?;

        let Some(previous) = self.committed.clone() else {
            log::info!("settings applied for the first time");
            self.committed = Some(candidate);
            return Ok(ApplyReport::default());
        };

        if previous == candidate {
            return Err(ConsoleError::NoChange);
        }

        let mut report = ApplyReport::default();

        if previous.address_width != candidate.address_width && !registry.is_empty() {
            let plan = AddressWidthMigrator::migrate(
                previous.address_width,
                candidate.address_width,
                registry.processes(),
            );

            if plan.is_destructive() {
                log::info!(
                    "narrowing {} -> {} would delete {} process(es)",
                    plan.from,
                    plan.to,
                    plan.doomed.len()
                );
                if !confirm.confirm(&plan) {
                    log::info!("width change declined; keeping {}", plan.from);
                    return Err(ConsoleError::DestructiveMigration {
                        doomed: plan.doomed_ids(),
                    });
                }
                report.deleted = registry.apply_migration(&plan);
            } else {
                log::info!(
                    "migrated {} address(es) from {} to {}",
                    plan.kept.len(),
                    plan.from,
                    plan.to
                );
            }
            report.migration = Some(plan);
        }

        report.previous = Some(previous);
        self.committed = Some(candidate);
        Ok(report)
    }

    /// Installs recovered settings without migration or change detection.
    pub fn restore(&mut self, settings: Settings) -> Result<(), ConsoleError> {
        settings.validate()?;
        self.committed = Some(settings);
        Ok(())
    }

    /// Forgets the committed settings.
    pub fn reset(&mut self) {
        self.committed = None;
    }
}
