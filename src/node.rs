// Per-process protocol state machine.
//
// A node tracks the newest request sequence it has seen from every peer,
// owns the token (or not), and decides when the token must move.

use crate::token::Token;
use crate::types::{NodeId, RequestMsg};

/// Coarse view of where a node stands in the protocol. Derived from the
/// underlying fields; no protocol decision reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Holding,
    InCs,
}

/// Result of `exit_critical_section`.
#[derive(Debug)]
pub enum ExitOutcome {
    /// Guard failed: the node was not inside the critical section.
    Rejected,
    /// Exited; the wait queue stayed empty so the token stays put.
    Kept,
    /// Exited; the token moves to the named node.
    Handoff(NodeId, Token),
}

#[derive(Debug)]
pub struct NodeState {
    node_id: NodeId,
    num_nodes: usize,
    /// Highest sequence observed per node; the entry for self is this
    /// node's own request counter.
    request_number: Vec<u64>,
    /// Present iff this node currently holds the token.
    token: Option<Token>,
    in_critical_section: bool,
    /// An own request was broadcast and the token has not arrived yet.
    requesting: bool,
}

impl NodeState {
    pub fn new(node_id: NodeId, num_nodes: usize) -> Self {
        NodeState {
            node_id,
            num_nodes,
            request_number: vec![0; num_nodes],
            token: None,
            in_critical_section: false,
            requesting: false,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn in_critical_section(&self) -> bool {
        self.in_critical_section
    }

    /// This node's own request counter (mirrored in `request_number[self]`).
    pub fn own_sequence(&self) -> u64 {
        self.request_number[self.node_id]
    }

    /// Highest sequence this node has observed from `id`.
    pub fn observed_sequence(&self, id: NodeId) -> u64 {
        self.request_number.get(id).copied().unwrap_or(0)
    }

    /// Read-only peek at the token, when held.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match (&self.token, self.in_critical_section, self.requesting) {
            (Some(_), true, _) => Phase::InCs,
            (Some(_), false, _) => Phase::Holding,
            (None, _, true) => Phase::Requesting,
            (None, _, false) => Phase::Idle,
        }
    }

    /// Start a request for the critical section.
    ///
    /// The counter advances on every call, even while an earlier request by
    /// this node is still unresolved, and even when the node already holds
    /// the token (in which case this is a no-op transition).
    pub fn issue_request(&mut self) -> RequestMsg {
        self.request_number[self.node_id] += 1;
        if self.token.is_none() {
            self.requesting = true;
        }
        RequestMsg {
            sender_id: self.node_id,
            sequence: self.request_number[self.node_id],
        }
    }

    /// Absorb a peer's REQUEST.
    ///
    /// Always max-merges the sender's sequence into local bookkeeping. If
    /// this node holds an idle token and the request is exactly the sender's
    /// next unsatisfied one, ownership moves out and the token is returned
    /// for delivery. Otherwise the eventual holder discovers the pending
    /// need through the exit scan.
    pub fn receive_request(&mut self, msg: &RequestMsg) -> Option<Token> {
        if let Some(seen) = self.request_number.get_mut(msg.sender_id) {
            if msg.sequence > *seen {
                *seen = msg.sequence;
            }
        }

        if self.in_critical_section {
            return None;
        }
        match &self.token {
            Some(token) if token.last_granted(msg.sender_id) + 1 == msg.sequence => {
                self.release_token()
            }
            _ => None,
        }
    }

    /// Enter the critical section. Pure guard: holding the token and not
    /// already inside. A reject changes no state.
    pub fn enter_critical_section(&mut self) -> bool {
        if self.token.is_some() && !self.in_critical_section {
            self.in_critical_section = true;
            true
        } else {
            false
        }
    }

    /// Leave the critical section.
    ///
    /// Records the own grant in the token, then scans peers in ascending id
    /// order (a deterministic convention of this implementation) and queues
    /// every observed-but-unsatisfied request. This is the single fairness
    /// step, performed exactly once per exit. If the queue is non-empty
    /// afterwards, the front node takes the token.
    pub fn exit_critical_section(&mut self) -> ExitOutcome {
        if !self.in_critical_section {
            return ExitOutcome::Rejected;
        }
        self.in_critical_section = false;

        let own_seq = self.request_number[self.node_id];
        let token = self
            .token
            .as_mut()
            .expect("in the critical section implies holding the token");
        token.set_last_granted(self.node_id, own_seq);

        for id in 0..self.num_nodes {
            if id == self.node_id {
                continue;
            }
            if self.request_number[id] == token.last_granted(id) + 1 {
                token.enqueue(id, self.node_id);
            }
        }

        match token.dequeue_front() {
            Some(next) => {
                let token = self
                    .release_token()
                    .expect("token checked present above");
                ExitOutcome::Handoff(next, token)
            }
            None => ExitOutcome::Kept,
        }
    }

    /// Take delivery of the token.
    pub fn receive_token(&mut self, token: Token) {
        self.token = Some(token);
        self.requesting = false;
    }

    /// Clear ownership and yield the token in one step. If the own request
    /// is still unsatisfied at hand-off time, the node goes back to waiting.
    fn release_token(&mut self) -> Option<Token> {
        let token = self.token.take();
        if let Some(t) = &token {
            self.requesting = t.last_granted(self.node_id) < self.request_number[self.node_id];
        }
        token
    }
}
