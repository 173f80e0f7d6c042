//! Summary of one submission pass.

use crate::error::OperationFailure;

/// What a successful pass did.
#[derive(Debug, Default)]
pub struct SubmissionReport {
    /// Operations from the log that applied cleanly.
    pub operations_applied: usize,
    /// Operations that failed validation, in log order, when the policy is
    /// to continue.
    pub failures: Vec<OperationFailure>,
    /// Merge loop iterations run (0 if nothing was staged).
    pub iterations: u32,
    /// Entities committed across all iterations.
    pub entities_added: usize,
    /// Components committed across all iterations.
    pub components_added: usize,
    /// Engine `add` calls made.
    pub notifications: usize,
}

impl SubmissionReport {
    /// Returns `true` if the pass changed nothing and notified nobody.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.operations_applied == 0
            && self.failures.is_empty()
            && self.iterations == 0
            && self.notifications == 0
    }

    /// Returns `true` if any operation failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
