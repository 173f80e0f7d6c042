//! The submission driver.
//!
//! [`EntitiesRoot`] owns the committed database, the staging double buffer,
//! the operation log and the engine registry. One call to
//! [`EntitiesRoot::submit_entities`] runs one pass:
//!
//! 1. Snapshot the operation log and apply it in enqueue order against the
//!    previously committed state.
//! 2. While the writable staging side holds entities: swap sides, merge the
//!    whole batch into the database, then notify engines about every merged
//!    component. Entities staged by those engines form the next generation.
//!    A pass whose re-entrant generation exceeds `reentrancy_limit` fails
//!    once that generation has been merged and notified.

use groupdb_component::Component;
use tracing::{debug, error, warn};

use crate::config::{OperationErrorPolicy, SubmissionConfig};
use crate::database::EntityDatabase;
use crate::engine::{EngineContext, EngineRegistry, ReactOnAdd};
use crate::error::{OperationFailure, RegistryError, SubmissionError};
use crate::operation::{OperationLog, PendingOperation};
use crate::report::SubmissionReport;
use crate::staging::DoubleBufferedEntities;
use crate::submitter::Submitter;

/// Owner of all entity state and driver of submission passes.
#[derive(Debug)]
pub struct EntitiesRoot {
    config: SubmissionConfig,
    database: EntityDatabase,
    staging: DoubleBufferedEntities,
    operations: OperationLog,
    /// Reused buffer for the per-pass operation snapshot.
    operation_scratch: Vec<PendingOperation>,
    engines: EngineRegistry,
    passes: u64,
}

impl EntitiesRoot {
    /// Create an empty root.
    #[must_use]
    pub fn new(config: SubmissionConfig) -> Self {
        Self {
            config,
            database: EntityDatabase::new(),
            staging: DoubleBufferedEntities::new(),
            operations: OperationLog::new(),
            operation_scratch: Vec::new(),
            engines: EngineRegistry::new(),
            passes: 0,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Register an engine for component type `T`.
    ///
    /// # Errors
    ///
    /// See [`EngineRegistry::register`]. Also fails with
    /// [`RegistryError::TypeNameCollision`] if the database already holds
    /// another Rust type under `T`'s component name.
    pub fn register_engine<T, E>(&mut self, engine: E) -> Result<(), RegistryError>
    where
        T: Component,
        E: ReactOnAdd<T>,
    {
        if !self.database.accepts::<T>() {
            return Err(RegistryError::TypeNameCollision {
                name: T::type_name(),
            });
        }
        let name = engine.name();
        self.engines.register::<T, E>(engine)?;
        debug!(engine = name, component = T::type_name(), "registered engine");
        Ok(())
    }

    /// The engine registry.
    #[must_use]
    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    /// Stage entities or enqueue operations for the next pass.
    pub fn submitter(&mut self) -> Submitter<'_> {
        Submitter::new(self.staging.current_mut(), &mut self.operations)
    }

    /// The committed database.
    #[must_use]
    pub fn database(&self) -> &EntityDatabase {
        &self.database
    }

    /// Returns `true` if the next pass has operations or entities to process.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.operations.is_empty() || !self.staging.current().is_empty()
    }

    /// Operations waiting for the next pass.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.operations.len()
    }

    /// Entities waiting for the next pass.
    #[must_use]
    pub fn staged_entities(&self) -> usize {
        self.staging.current().entity_count()
    }

    /// Number of passes run so far, failed ones included.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run one submission pass.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::Operation`] if an operation fails under
    ///   [`OperationErrorPolicy::Halt`]. The rest of the snapshot is dropped
    ///   and staged entities wait for the next pass.
    /// - [`SubmissionError::DuplicateEntity`] if a staged entity is already
    ///   committed, or [`SubmissionError::Container`] if a staged container
    ///   clashes with the committed or engine-registered type of its name.
    ///   The offending batch is discarded before anything merges.
    /// - [`SubmissionError::ReentrancyLimit`] if engines keep staging entities
    ///   past the configured limit. The runaway generation is still merged
    ///   and notified; whatever it staged waits for the next pass.
    pub fn submit_entities(&mut self) -> Result<SubmissionReport, SubmissionError> {
        self.passes += 1;
        let mut report = SubmissionReport::default();
        if !self.has_pending_work() {
            return Ok(report);
        }

        self.apply_operations(&mut report)?;
        self.merge_staged(&mut report)?;

        debug!(
            pass = self.passes,
            operations_applied = report.operations_applied,
            failures = report.failures.len(),
            iterations = report.iterations,
            entities_added = report.entities_added,
            notifications = report.notifications,
            "submission pass complete"
        );
        Ok(report)
    }

    fn apply_operations(&mut self, report: &mut SubmissionReport) -> Result<(), SubmissionError> {
        if self.operations.is_empty() {
            return Ok(());
        }

        let mut snapshot = std::mem::take(&mut self.operation_scratch);
        self.operations.swap_into(&mut snapshot);
        let result = apply_snapshot(
            &mut self.database,
            self.config.on_operation_error,
            &mut snapshot,
            report,
        );
        snapshot.clear();
        self.operation_scratch = snapshot;
        result
    }

    fn merge_staged(&mut self, report: &mut SubmissionReport) -> Result<(), SubmissionError> {
        let limit = self.config.reentrancy_limit;
        let mut generation = 0;

        while !self.staging.current().is_empty() {
            self.staging.swap();
            let result = self.merge_and_notify(generation, report);
            self.staging.clear_other();
            result?;
            report.iterations = generation + 1;

            if generation > limit {
                let pending = self.staging.current().entity_count();
                error!(
                    limit,
                    generation,
                    pending,
                    "engines kept building entities during submission"
                );
                return Err(SubmissionError::ReentrancyLimit {
                    limit,
                    generation,
                    pending,
                });
            }
            generation += 1;
        }
        Ok(())
    }

    /// Merge the non-current staging side, then notify engines with the
    /// current side open for re-entrant staging.
    fn merge_and_notify(&mut self, generation: u32, report: &mut SubmissionReport) -> Result<(), SubmissionError> {
        let Self {
            database,
            staging,
            operations,
            engines,
            ..
        } = self;
        let (batch, current) = staging.split_mut();

        let entities = batch.entity_count();
        let merged = engines
            .check_batch(batch)
            .map_err(SubmissionError::from)
            .and_then(|()| database.merge_batch(batch))
            .inspect_err(|err| {
                error!(generation, entities, %err, "discarding staged batch");
            })?;
        let components: usize = merged.iter().map(|m| m.ids.len()).sum();
        report.entities_added += entities;
        report.components_added += components;
        debug!(
            generation,
            entities,
            components,
            containers = merged.len(),
            "merged staged batch"
        );

        let database: &EntityDatabase = database;
        let mut ctx = EngineContext::new(database, Submitter::new(current, operations), generation);
        for entry in &merged {
            let Some(container) = database.container(entry.group, entry.type_id) else {
                continue;
            };
            report.notifications += engines.notify_added(container, entry.group, &entry.ids, &mut ctx)?;
        }
        Ok(())
    }
}

impl Default for EntitiesRoot {
    fn default() -> Self {
        Self::new(SubmissionConfig::default())
    }
}

fn apply_snapshot(
    database: &mut EntityDatabase,
    policy: OperationErrorPolicy,
    snapshot: &mut Vec<PendingOperation>,
    report: &mut SubmissionReport,
) -> Result<(), SubmissionError> {
    for pending in snapshot.drain(..) {
        match database.apply(&pending.operation) {
            Ok(()) => {
                debug!(operation = %pending.operation, "applied operation");
                report.operations_applied += 1;
            }
            Err(error) => {
                let failure = OperationFailure {
                    operation: pending.operation,
                    trace: pending.trace,
                    error,
                };
                match policy {
                    OperationErrorPolicy::Continue => {
                        warn!(
                            operation = %failure.operation,
                            trace = %failure.trace,
                            error = %failure.error,
                            "operation failed; continuing"
                        );
                        report.failures.push(failure);
                    }
                    OperationErrorPolicy::Halt => {
                        error!(
                            operation = %failure.operation,
                            trace = %failure.trace,
                            error = %failure.error,
                            "operation failed; halting pass"
                        );
                        return Err(failure.into());
                    }
                }
            }
        }
    }
    Ok(())
}
