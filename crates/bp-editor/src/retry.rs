//! Bounded retry-after-delay for host work that depends on UI state not
//! mounted yet (e.g. a toggle widget label).

use bp_core::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    node: NodeId,
    attempts: u32,
    due: Option<u64>,
}

#[derive(Debug)]
pub struct RetrySchedule {
    delay_ms: u64,
    max_attempts: u32,
    entries: Vec<Entry>,
}

impl RetrySchedule {
    pub fn new(delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            delay_ms,
            max_attempts,
            entries: Vec::new(),
        }
    }

    /// Schedule another attempt for `node`. Returns `false` (and gives up on
    /// the node) once the attempt budget is spent.
    pub fn schedule(&mut self, node: NodeId, now: u64) -> bool {
        let idx = match self.entries.iter().position(|e| e.node == node) {
            Some(idx) => idx,
            None => {
                self.entries.push(Entry {
                    node,
                    attempts: 0,
                    due: None,
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[idx];
        if entry.attempts >= self.max_attempts {
            log::error!(
                "retry: giving up on node {node} after {} attempts",
                entry.attempts
            );
            self.entries.remove(idx);
            return false;
        }
        entry.attempts += 1;
        entry.due = Some(now + self.delay_ms);
        true
    }

    /// Nodes whose attempt is due. Their attempt counts are kept until
    /// `succeeded` or the budget runs out.
    pub fn take_due(&mut self, now: u64) -> Vec<NodeId> {
        self.entries
            .iter_mut()
            .filter(|e| e.due.is_some_and(|due| due <= now))
            .map(|e| {
                e.due = None;
                e.node
            })
            .collect()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().filter_map(|e| e.due).min()
    }

    pub fn succeeded(&mut self, node: NodeId) {
        self.entries.retain(|e| e.node != node);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn due_after_delay() {
        let mut retries = RetrySchedule::new(200, 5);
        assert!(retries.schedule(NodeId(1), 0));
        assert!(retries.take_due(199).is_empty());
        assert_eq!(retries.take_due(200), vec![NodeId(1)]);
        assert!(retries.take_due(400).is_empty());
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut retries = RetrySchedule::new(200, 2);
        assert!(retries.schedule(NodeId(1), 0));
        assert!(retries.schedule(NodeId(1), 200));
        assert!(!retries.schedule(NodeId(1), 400));
        assert!(retries.is_empty());
    }

    #[test]
    fn success_clears_attempts() {
        let mut retries = RetrySchedule::new(200, 1);
        retries.schedule(NodeId(1), 0);
        retries.succeeded(NodeId(1));
        assert!(retries.schedule(NodeId(1), 0));
    }
}
