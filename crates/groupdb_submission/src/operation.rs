//! The operation log: structural changes waiting for the next pass.
//!
//! Collaborators append [`Operation`]s at any time, including from engine
//! callbacks while a pass is running. The driver takes a snapshot of the log
//! before applying it, so anything appended during a pass waits for the next
//! one. Each entry remembers the call site that requested it.

use std::panic::Location;

use groupdb_component::{Egid, EntityDescriptor, EntityId, GroupId};

/// A structural change to committed entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Move an entity's components from one group to another, keeping its id.
    Swap {
        /// Component types the entity was built with.
        descriptor: EntityDescriptor,
        /// The entity id, unchanged by the move.
        entity: EntityId,
        /// Source group.
        from: GroupId,
        /// Destination group.
        to: GroupId,
    },
    /// Delete an entity's components from its group.
    Remove {
        /// Component types the entity was built with.
        descriptor: EntityDescriptor,
        /// The entity to delete.
        egid: Egid,
    },
    /// Delete a whole group and every container in it.
    RemoveGroup {
        /// The group to delete.
        group: GroupId,
    },
}

impl Operation {
    /// Short name of the operation kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Swap { .. } => "swap",
            Operation::Remove { .. } => "remove",
            Operation::RemoveGroup { .. } => "remove_group",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Swap {
                entity, from, to, ..
            } => write!(f, "swap entity {entity} from {from} to {to}"),
            Operation::Remove { egid, .. } => write!(f, "remove {egid}"),
            Operation::RemoveGroup { group } => write!(f, "remove {group}"),
        }
    }
}

/// An [`Operation`] together with the call site that requested it.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    /// The requested change.
    pub operation: Operation,
    /// Where the change was requested.
    pub trace: &'static Location<'static>,
}

/// Ordered, append-only buffer of pending operations.
#[derive(Debug, Default)]
pub struct OperationLog {
    pending: Vec<PendingOperation>,
}

impl OperationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation, recording the caller's location as its trace.
    #[track_caller]
    pub fn enqueue(&mut self, operation: Operation) {
        self.pending.push(PendingOperation {
            operation,
            trace: Location::caller(),
        });
    }

    /// Number of operations waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterate over waiting operations in enqueue order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.pending.iter()
    }

    /// Exchange the pending operations with `snapshot`.
    ///
    /// `snapshot` must be empty; it becomes the log's new (empty) buffer, so
    /// the two vectors' allocations are recycled between passes.
    pub(crate) fn swap_into(&mut self, snapshot: &mut Vec<PendingOperation>) {
        debug_assert!(snapshot.is_empty(), "operation snapshot was not drained");
        std::mem::swap(&mut self.pending, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_preserves_order() {
        let mut log = OperationLog::new();
        log.enqueue(Operation::RemoveGroup { group: GroupId(1) });
        log.enqueue(Operation::RemoveGroup { group: GroupId(2) });
        let groups: Vec<_> = log
            .iter()
            .map(|p| match p.operation {
                Operation::RemoveGroup { group } => group,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(groups, vec![GroupId(1), GroupId(2)]);
    }

    #[test]
    fn test_trace_points_at_caller() {
        let mut log = OperationLog::new();
        let line = line!() + 1;
        log.enqueue(Operation::RemoveGroup { group: GroupId(3) });
        let trace = log.iter().next().unwrap().trace;
        assert_eq!(trace.line(), line);
        assert!(trace.file().ends_with("operation.rs"));
    }

    #[test]
    fn test_swap_into_leaves_log_empty() {
        let mut log = OperationLog::new();
        log.enqueue(Operation::RemoveGroup { group: GroupId(3) });
        let mut snapshot = Vec::new();
        log.swap_into(&mut snapshot);
        assert!(log.is_empty());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_display() {
        let op = Operation::Swap {
            descriptor: EntityDescriptor::new(),
            entity: EntityId(4),
            from: GroupId(1),
            to: GroupId(2),
        };
        assert_eq!(op.to_string(), "swap entity 4 from group 1 to group 2");
        assert_eq!(op.kind(), "swap");
    }
}
