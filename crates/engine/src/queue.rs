use std::collections::VecDeque;

use cartsync_core::ops::QueuedOperation;

/// Ordered buffer of mutations deferred while offline. Drained FIFO; a
/// failed replay goes to the back of the line until its attempt budget
/// runs out.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    ops: VecDeque<QueuedOperation>,
}

impl OfflineQueue {
    pub fn push(&mut self, op: QueuedOperation) {
        self.ops.push_back(op);
    }

    pub fn pop_front(&mut self) -> Option<QueuedOperation> {
        self.ops.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Copy of the queue contents, for persistence.
    pub fn snapshot(&self) -> Vec<QueuedOperation> {
        self.ops.iter().cloned().collect()
    }

    /// Replace the queue contents, for session restore.
    pub fn restore(&mut self, ops: Vec<QueuedOperation>) {
        self.ops = ops.into();
    }
}

/// Outcome of one drain pass over the offline queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueReport {
    /// Operations confirmed remotely and removed.
    pub resolved: usize,
    /// Operations still waiting after the pass.
    pub pending: usize,
    /// Operations dropped after exhausting their attempt budget.
    pub abandoned: usize,
}
