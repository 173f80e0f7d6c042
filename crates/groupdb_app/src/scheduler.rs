//! Submission cadence.
//!
//! The tick loop asks its scheduler once per tick whether to fire a
//! submission pass. Everything staged or enqueued on the ticks in between
//! accumulates and is handled by the next pass.

use std::fmt::Debug;

/// Decides on which ticks a submission pass runs.
pub trait SubmissionScheduler: Debug {
    /// Returns `true` if a pass should run at the end of `tick_id`.
    fn should_submit(&mut self, tick_id: u64) -> bool;
}

/// Submit at the end of every tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct EveryTick;

impl SubmissionScheduler for EveryTick {
    fn should_submit(&mut self, _tick_id: u64) -> bool {
        true
    }
}

/// Submit on every `interval`-th tick.
#[derive(Debug, Clone, Copy)]
pub struct EveryNTicks {
    interval: u64,
}

impl EveryNTicks {
    /// Create a schedule firing every `interval` ticks. An interval of 0 is
    /// treated as 1.
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl SubmissionScheduler for EveryNTicks {
    fn should_submit(&mut self, tick_id: u64) -> bool {
        tick_id % self.interval == 0
    }
}

/// Build the scheduler for a `--submit-every` value.
#[must_use]
pub fn from_interval(interval: u64) -> Box<dyn SubmissionScheduler> {
    if interval <= 1 {
        Box::new(EveryTick)
    } else {
        Box::new(EveryNTicks::new(interval))
    }
}
