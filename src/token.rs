// The circulating permit. Exactly one exists system-wide; it moves, never copies.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// FIFO wait queue plus the last-granted-sequence table.
///
/// Deliberately not `Clone`: ownership is transferred with `Option::take`,
/// so the single-owner invariant is carried by the type system.
#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    /// Waiting node ids, no duplicates, front = next recipient.
    queue: VecDeque<NodeId>,
    /// Per node: sequence number of its most recently satisfied request.
    last_request: Vec<u64>,
}

impl Token {
    pub fn new(num_nodes: usize) -> Self {
        Token {
            queue: VecDeque::new(),
            last_request: vec![0; num_nodes],
        }
    }

    /// Append `id` unless it is already queued or is the current holder.
    /// Returns whether the id was actually enqueued.
    pub fn enqueue(&mut self, id: NodeId, holder: NodeId) -> bool {
        if id == holder || self.queue.contains(&id) {
            return false;
        }
        self.queue.push_back(id);
        true
    }

    pub fn dequeue_front(&mut self) -> Option<NodeId> {
        self.queue.pop_front()
    }

    /// Monotonic update: the recorded sequence for `id` never decreases.
    pub fn set_last_granted(&mut self, id: NodeId, seq: u64) {
        if let Some(entry) = self.last_request.get_mut(id) {
            if seq > *entry {
                *entry = seq;
            }
        }
    }

    pub fn last_granted(&self, id: NodeId) -> u64 {
        self.last_request.get(id).copied().unwrap_or(0)
    }

    pub fn is_queued(&self, id: NodeId) -> bool {
        self.queue.contains(&id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot copy of the wait queue (small; OK for diagnostics).
    pub fn queue_snapshot(&self) -> Vec<NodeId> {
        self.queue.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_keeps_queue_unique() {
        let mut token = Token::new(4);
        assert!(token.enqueue(2, 0));
        assert!(!token.enqueue(2, 0), "second enqueue of same id must be refused");
        assert!(token.enqueue(3, 0));
        assert_eq!(token.queue_snapshot(), vec![2, 3]);
    }

    #[test]
    fn enqueue_refuses_current_holder() {
        let mut token = Token::new(3);
        assert!(!token.enqueue(1, 1));
        assert_eq!(token.queue_len(), 0);
    }

    #[test]
    fn dequeue_is_fifo() {
        let mut token = Token::new(4);
        token.enqueue(3, 0);
        token.enqueue(1, 0);
        token.enqueue(2, 0);
        assert_eq!(token.dequeue_front(), Some(3));
        assert_eq!(token.dequeue_front(), Some(1));
        assert_eq!(token.dequeue_front(), Some(2));
        assert_eq!(token.dequeue_front(), None);
    }

    #[test]
    fn last_granted_only_increases() {
        let mut token = Token::new(2);
        token.set_last_granted(1, 5);
        assert_eq!(token.last_granted(1), 5);
        token.set_last_granted(1, 3);
        assert_eq!(token.last_granted(1), 5, "stale update must not rewind");
        token.set_last_granted(1, 6);
        assert_eq!(token.last_granted(1), 6);
    }

    #[test]
    fn table_covers_every_node() {
        let token = Token::new(5);
        for id in 0..5 {
            assert_eq!(token.last_granted(id), 0);
        }
    }
}
