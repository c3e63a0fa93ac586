//! Migration runner
//!
//! Executes the steps in order against one store. Any fatal error stops
//! the run at once; committed pages and definition edits stay as they are,
//! and the checkpoint names the step to resume from.
//!
//! # Example
//!
//! ```rust,ignore
//! use svcmgmt_migration::{MigrationConfig, MigrationRunner};
//! use svcmgmt_store::InMemoryStore;
//!
//! let store = InMemoryStore::from_snapshot(snapshot);
//! let report = MigrationRunner::new(&store, MigrationConfig::new()).run()?;
//! println!("{} services rewritten", report.rewrite.map_or(0, |r| r.services_visited));
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::flatten::{ChainFlattener, FlattenOutcome};
use crate::journal::{Checkpoint, LogJournal, StepJournal};
use crate::precedence::VersionPrecedenceMap;
use crate::rewrite::{RewriteOutcome, ServiceRewriter};
use crate::schema::{SchemaEditor, ServiceSchemaChange};
use crate::steps::MigrationStep;
use chrono::{DateTime, Utc};
use svcmgmt_model::FieldEdit;
use svcmgmt_store::{DefinitionStore, DomInstanceStore};

/// Summary of a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// When the run first started (earlier than now when resumed)
    pub started_at: DateTime<Utc>,
    /// Timestamp stamped on configuration versions
    pub migrated_at: Option<DateTime<Utc>>,
    /// Step the run resumed after, if a checkpoint was found
    pub resumed_after: Option<MigrationStep>,
    /// Steps executed by this invocation
    pub steps_executed: Vec<MigrationStep>,
    /// Created At field edit
    pub created_at_field: Option<FieldEdit>,
    /// Flatten walk counters
    pub flatten: Option<FlattenOutcome>,
    /// Whether the Previous Version descriptor was removed by this invocation
    pub previous_version_field_removed: bool,
    /// Service schema edits
    pub service_schema: Option<ServiceSchemaChange>,
    /// Rewrite walk counters
    pub rewrite: Option<RewriteOutcome>,
    /// Precedence map used for the rewrite
    pub precedence: VersionPrecedenceMap,
}

impl MigrationReport {
    fn new(checkpoint: &Checkpoint, resumed_after: Option<MigrationStep>) -> Self {
        Self {
            started_at: checkpoint.started_at,
            migrated_at: checkpoint.migrated_at,
            resumed_after,
            steps_executed: Vec::new(),
            created_at_field: None,
            flatten: None,
            previous_version_field_removed: false,
            service_schema: None,
            rewrite: None,
            precedence: VersionPrecedenceMap::new(),
        }
    }
}

/// Runs the migration against a store
pub struct MigrationRunner<'a, S: ?Sized> {
    store: &'a S,
    config: MigrationConfig,
    journal: Box<dyn StepJournal + 'a>,
    clock: Box<dyn Clock + 'a>,
}

impl<S: ?Sized> std::fmt::Debug for MigrationRunner<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, S> MigrationRunner<'a, S>
where
    S: DomInstanceStore + DefinitionStore + ?Sized,
{
    /// Create a runner logging progress only, using the wall clock
    #[must_use]
    pub fn new(store: &'a S, config: MigrationConfig) -> Self {
        Self {
            store,
            config,
            journal: Box::new(LogJournal),
            clock: Box::new(SystemClock),
        }
    }

    /// With checkpoint journal
    #[must_use]
    pub fn with_journal(mut self, journal: impl StepJournal + 'a) -> Self {
        self.journal = Box::new(journal);
        self
    }

    /// With clock
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run every step not yet completed
    ///
    /// # Errors
    /// - `MigrationError::Config` for an invalid configuration
    /// - `MigrationError::MissingPrecedenceMap` for a checkpoint that cannot
    ///   be resumed
    /// - `MigrationError::StepFailed` wrapping the first fatal error of a step
    pub fn run(&self) -> Result<MigrationReport, MigrationError> {
        self.config.validate()?;

        let (mut checkpoint, resumed_after) = match self.journal.load()? {
            Some(checkpoint) => {
                checkpoint.validate_resumable()?;
                let last = checkpoint.last_completed;
                tracing::info!(last_completed = ?last, "resuming migration from checkpoint");
                (checkpoint, last)
            }
            None => (Checkpoint::new(self.clock.now()), None),
        };
        let mut report = MigrationReport::new(&checkpoint, resumed_after);

        if checkpoint.is_complete() {
            tracing::info!("migration already completed, nothing to do");
            report.precedence = checkpoint.precedence.clone().unwrap_or_default();
            return Ok(report);
        }

        for &step in checkpoint.remaining_steps() {
            tracing::info!(step = %step, description = step.description(), "step started");

            if let Err(error) = self.execute(step, &mut checkpoint, &mut report) {
                tracing::error!(step = %step, %error, "step failed");
                if let Err(save_error) = self.journal.save(&checkpoint) {
                    tracing::error!(%save_error, "checkpoint after failure not saved");
                }
                return Err(MigrationError::StepFailed {
                    step,
                    error: Box::new(error),
                });
            }

            checkpoint.last_completed = Some(step);
            report.steps_executed.push(step);
            self.journal
                .save(&checkpoint)
                .map_err(|error| MigrationError::StepFailed {
                    step,
                    error: Box::new(error),
                })?;
            tracing::info!(step = %step, ordinal = step.ordinal() + 1, total = MigrationStep::ALL.len(), "step completed");
        }

        report.migrated_at = checkpoint.migrated_at;
        report.precedence = checkpoint.precedence.unwrap_or_default();
        Ok(report)
    }

    fn execute(
        &self,
        step: MigrationStep,
        checkpoint: &mut Checkpoint,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        let targets = &self.config.targets;
        let editor = SchemaEditor::new(self.store);

        match step {
            MigrationStep::ConfigurationVersionSchema => {
                report.created_at_field = Some(editor.prepare_configuration_version_schema(targets)?);
            }
            MigrationStep::FlattenVersionChains => {
                let migrated_at = *checkpoint
                    .migrated_at
                    .get_or_insert_with(|| self.clock.now());
                report.migrated_at = Some(migrated_at);

                let mut map = checkpoint.precedence.take().unwrap_or_default();
                let flattener = ChainFlattener::new(self.store, targets, self.config.page_size);
                let header = checkpoint.clone();
                let result = flattener.run(migrated_at, &mut map, |map| {
                    self.journal.save(&Checkpoint {
                        precedence: Some(map.clone()),
                        ..header.clone()
                    })
                });
                checkpoint.precedence = Some(map);
                report.flatten = Some(result?);
            }
            MigrationStep::RetirePreviousVersionField => {
                report.previous_version_field_removed = editor.retire_previous_version_field(targets)?;
            }
            MigrationStep::ServiceSchema => {
                report.service_schema =
                    Some(editor.prepare_service_schema(targets, self.config.behavior_link_mode)?);
            }
            MigrationStep::RewriteServices => {
                let map = checkpoint.precedence.as_ref().ok_or(
                    MigrationError::MissingPrecedenceMap {
                        completed: MigrationStep::ServiceSchema,
                    },
                )?;
                let rewriter = ServiceRewriter::new(self.store, targets, self.config.page_size);
                report.rewrite = Some(rewriter.run(map)?);
            }
        }
        Ok(())
    }
}

/// Run the migration with a log-only journal and the wall clock
///
/// # Errors
/// See [`MigrationRunner::run`]
pub fn run_migration<S>(store: &S, config: MigrationConfig) -> Result<MigrationReport, MigrationError>
where
    S: DomInstanceStore + DefinitionStore + ?Sized,
{
    MigrationRunner::new(store, config).run()
}
