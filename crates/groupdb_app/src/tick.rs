//! Fixed-rate tick loop.
//!
//! Each tick:
//!
//! 1. The spawner stages new entities and enqueues operations.
//! 2. The scheduler decides whether this tick ends with a submission pass.
//! 3. If so, the pass runs and its report is folded into [`RunStats`].
//!
//! A re-entrancy overflow is fatal and ends the loop with an error. Other
//! submission errors are logged and the loop carries on.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use groupdb_submission::{EntitiesRoot, SubmissionConfig, SubmissionError, SubmissionReport};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::demo::{self, Census, Spawner};
use crate::scheduler::SubmissionScheduler;

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Totals over every pass of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub ticks: u64,
    pub passes: u64,
    pub failed_passes: u64,
    pub operations_applied: usize,
    pub operation_failures: usize,
    pub entities_added: usize,
    pub notifications: usize,
    pub positions_seen: u64,
}

impl RunStats {
    fn record(&mut self, report: &SubmissionReport) {
        self.passes += 1;
        self.operations_applied += report.operations_applied;
        self.operation_failures += report.failures.len();
        self.entities_added += report.entities_added;
        self.notifications += report.notifications;
    }
}

/// The tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    root: EntitiesRoot,
    scheduler: Box<dyn SubmissionScheduler>,
    spawner: Spawner,
    census: Census,
    stats: RunStats,
}

impl TickLoop {
    /// Create a tick loop with the demo engines registered.
    pub fn new(
        config: TickConfig,
        submission: SubmissionConfig,
        scheduler: Box<dyn SubmissionScheduler>,
    ) -> Result<Self> {
        let mut root = EntitiesRoot::new(submission);
        let census = demo::register_engines(&mut root).context("failed to register demo engines")?;
        Ok(Self {
            tick_id: 0,
            config,
            root,
            scheduler,
            spawner: Spawner::new(),
            census,
            stats: RunStats::default(),
        })
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the entity root.
    #[must_use]
    pub fn root(&self) -> &EntitiesRoot {
        &self.root
    }

    /// Returns the totals so far.
    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Run one tick.
    pub fn tick(&mut self) -> Result<()> {
        self.tick_id += 1;
        self.stats.ticks += 1;

        self.spawner
            .tick(self.tick_id, &mut self.root)
            .with_context(|| format!("spawner failed on tick {}", self.tick_id))?;

        if !self.scheduler.should_submit(self.tick_id) {
            debug!(
                tick_id = self.tick_id,
                staged = self.root.staged_entities(),
                operations = self.root.pending_operations(),
                "submission deferred"
            );
            return Ok(());
        }

        match self.root.submit_entities() {
            Ok(report) => {
                debug!(
                    tick_id = self.tick_id,
                    operations_applied = report.operations_applied,
                    failures = report.failures.len(),
                    iterations = report.iterations,
                    entities_added = report.entities_added,
                    "submitted"
                );
                self.stats.record(&report);
            }
            Err(err @ SubmissionError::ReentrancyLimit { .. }) => {
                return Err(err).context(format!("submission failed on tick {}", self.tick_id));
            }
            Err(err) => {
                error!(tick_id = self.tick_id, %err, "submission pass failed");
                self.stats.failed_passes += 1;
            }
        }
        self.stats.positions_seen = self.census.positions();
        Ok(())
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) -> Result<()> {
        let tick_duration = Duration::try_from_secs_f64(1.0 / self.config.tick_rate)
            .with_context(|| format!("invalid tick rate {}", self.config.tick_rate))?;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            reentrancy_limit = self.root.config().reentrancy_limit,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.tick()?;

            if self.config.max_ticks > 0 && self.tick_id >= self.config.max_ticks {
                info!(ticks = self.tick_id, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use groupdb_component::{Egid, GroupId};
    use groupdb_submission::OperationErrorPolicy;

    use super::*;
    use crate::demo::{ACTIVE, DEBRIS, DORMANT, Position, Velocity};
    use crate::scheduler::{EveryNTicks, EveryTick};

    fn fast(max_ticks: u64) -> TickConfig {
        TickConfig {
            tick_rate: 10_000.0,
            max_ticks,
        }
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop =
            TickLoop::new(TickConfig::default(), SubmissionConfig::default(), Box::new(EveryTick)).unwrap();
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_run_every_tick() {
        let mut tick_loop = TickLoop::new(fast(12), SubmissionConfig::default(), Box::new(EveryTick)).unwrap();
        tick_loop.run().unwrap();

        let stats = tick_loop.stats();
        assert_eq!(stats.ticks, 12);
        assert_eq!(stats.passes, 12);
        assert_eq!(stats.failed_passes, 0);
        assert_eq!(stats.entities_added, 24);
        assert_eq!(stats.notifications, 36);
        assert_eq!(stats.positions_seen, 24);
        // Swaps on ticks 4, 8 and 12; removals on 6 and 12; debris cleared on 10.
        assert_eq!(stats.operations_applied, 6);
        assert_eq!(stats.operation_failures, 0);

        let db = tick_loop.root().database();
        assert_eq!(db.count::<Velocity>(ACTIVE), 9);
        assert_eq!(db.count::<Velocity>(DORMANT), 1);
        assert!(db.exists::<Position>(Egid::new(2, DORMANT.raw())));
        assert_eq!(db.count::<Position>(DEBRIS), 3);
        assert!(!tick_loop.root().has_pending_work());
    }

    #[test]
    fn test_deferred_submission_accumulates() {
        let mut tick_loop =
            TickLoop::new(fast(6), SubmissionConfig::default(), Box::new(EveryNTicks::new(3))).unwrap();
        tick_loop.tick().unwrap();
        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.root().staged_entities(), 2);
        assert_eq!(tick_loop.stats().passes, 0);

        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.stats().passes, 1);
        assert_eq!(tick_loop.stats().entities_added, 6);
        assert_eq!(tick_loop.root().database().count::<Position>(GroupId(1)), 3);
    }

    #[test]
    fn test_reentrancy_overflow_is_fatal() {
        // Debris needs one re-entrant generation; a limit of 0 forbids it.
        let submission = SubmissionConfig::new()
            .with_reentrancy_limit(0)
            .with_operation_error_policy(OperationErrorPolicy::Halt);
        let mut tick_loop = TickLoop::new(fast(3), submission, Box::new(EveryTick)).unwrap();

        let err = tick_loop.run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SubmissionError>(),
            Some(SubmissionError::ReentrancyLimit { limit: 0, .. })
        ));
        assert_eq!(tick_loop.tick_id(), 1);
        // The debris generation that overflowed was still committed.
        assert_eq!(tick_loop.root().database().count::<Position>(DEBRIS), 1);
    }

    #[test]
    fn test_unusable_tick_rate_is_an_error() {
        for tick_rate in [f64::NAN, 1e-320, 0.0] {
            let config = TickConfig {
                tick_rate,
                max_ticks: 1,
            };
            let mut tick_loop =
                TickLoop::new(config, SubmissionConfig::default(), Box::new(EveryTick)).unwrap();
            assert!(tick_loop.run().is_err());
            assert_eq!(tick_loop.tick_id(), 0);
        }
    }
}
