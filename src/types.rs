// Shared protocol vocabulary: identifiers, wire messages, audit records, snapshots.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Dense node index, `0..num_nodes`. Fixed at cluster construction.
pub type NodeId = usize;

/// REQUEST broadcast by a node that wants the critical section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMsg {
    pub sender_id: NodeId,
    pub sequence: u64,
}

/// One entry of the coordinator's message log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MessageRecord {
    Request {
        from: NodeId,
        sequence: u64,
        timestamp_ms: u64,
    },
    Token {
        from: NodeId,
        to: NodeId,
        timestamp_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CsAction {
    Enter,
    Exit,
}

/// One entry of the coordinator's critical-section access log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CsRecord {
    pub node_id: NodeId,
    pub action: CsAction,
    pub timestamp_ms: u64,
}

/// Read-only view of one node, as reported by `get_system_state`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub node_id: NodeId,
    pub has_token: bool,
    pub in_critical_section: bool,
    pub own_sequence: u64,
    /// Token wait-queue contents; `None` unless this node is the holder.
    pub token_queue: Option<Vec<NodeId>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemSnapshot {
    pub num_nodes: usize,
    pub nodes: Vec<NodeSnapshot>,
    pub total_messages: usize,
    pub cs_accesses: usize,
}

/// Wall-clock stamp for audit records. Protocol logic never reads the clock.
pub fn now_ms() -> u64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    dur.as_millis() as u64
}
