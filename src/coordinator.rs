// System-level API: owns the N node states, realizes the broadcast and
// point-to-point delivery contract, and keeps the audit logs.
//
// The logs are append-only and diagnostic; protocol logic never reads them.

use crate::config::{ClusterConfig, ConfigError};
use crate::node::{ExitOutcome, NodeState};
use crate::token::Token;
use crate::types::{
    now_ms, CsAction, CsRecord, MessageRecord, NodeId, NodeSnapshot, SystemSnapshot,
};

/// Rejected operation: the id names no node in this cluster. Non-fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidNodeId {
    pub id: NodeId,
    pub num_nodes: usize,
}

/// Outcome of `request_cs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestCsOutcome {
    /// Sequence number the broadcast carried.
    pub sequence: u64,
    /// Whether the requester holds the token once delivery settles.
    pub has_token_now: bool,
    /// Node that surrendered the token, when the grant was immediate.
    pub granted_from: Option<NodeId>,
}

/// Outcome of `exit_cs`. `exited == false` is the rejected-transition case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitCsOutcome {
    pub exited: bool,
    pub token_sent_to: Option<NodeId>,
}

pub struct Coordinator {
    nodes: Vec<NodeState>,
    message_log: Vec<MessageRecord>,
    cs_access_log: Vec<CsRecord>,
}

impl Coordinator {
    /// Build a cluster and seed the one token at the configured holder.
    /// Configuration violations abort construction.
    pub fn new(config: ClusterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut nodes: Vec<NodeState> = (0..config.num_nodes)
            .map(|id| NodeState::new(id, config.num_nodes))
            .collect();
        nodes[config.initial_holder].receive_token(Token::new(config.num_nodes));
        Ok(Coordinator {
            nodes,
            message_log: Vec::new(),
            cs_access_log: Vec::new(),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Read-only peek at one node, for diagnostics and tests.
    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(id)
    }

    fn check_id(&self, id: NodeId) -> Result<(), InvalidNodeId> {
        if id < self.nodes.len() {
            Ok(())
        } else {
            Err(InvalidNodeId {
                id,
                num_nodes: self.nodes.len(),
            })
        }
    }

    /// Broadcast a REQUEST from `node_id` to every peer, in ascending id
    /// order (a delivery convention of this implementation, not a protocol
    /// requirement). An immediate grant is delivered to the requester before
    /// this returns.
    pub fn request_cs(&mut self, node_id: NodeId) -> Result<RequestCsOutcome, InvalidNodeId> {
        self.check_id(node_id)?;

        let msg = self.nodes[node_id].issue_request();

        let mut granted_from = None;
        for peer in 0..self.nodes.len() {
            if peer == node_id {
                continue;
            }
            if let Some(token) = self.nodes[peer].receive_request(&msg) {
                self.nodes[node_id].receive_token(token);
                self.message_log.push(MessageRecord::Token {
                    from: peer,
                    to: node_id,
                    timestamp_ms: now_ms(),
                });
                granted_from = Some(peer);
            }
        }

        self.message_log.push(MessageRecord::Request {
            from: node_id,
            sequence: msg.sequence,
            timestamp_ms: now_ms(),
        });

        Ok(RequestCsOutcome {
            sequence: msg.sequence,
            has_token_now: self.nodes[node_id].has_token(),
            granted_from,
        })
    }

    /// Enter the critical section. `Ok(false)` means the guard rejected the
    /// transition; nothing changed.
    pub fn enter_cs(&mut self, node_id: NodeId) -> Result<bool, InvalidNodeId> {
        self.check_id(node_id)?;
        let entered = self.nodes[node_id].enter_critical_section();
        if entered {
            self.cs_access_log.push(CsRecord {
                node_id,
                action: CsAction::Enter,
                timestamp_ms: now_ms(),
            });
        }
        Ok(entered)
    }

    /// Exit the critical section, handing the token to the next waiter the
    /// exit scan queued, if any. The recipient is exactly the id the node's
    /// dequeue chose.
    pub fn exit_cs(&mut self, node_id: NodeId) -> Result<ExitCsOutcome, InvalidNodeId> {
        self.check_id(node_id)?;

        let outcome = match self.nodes[node_id].exit_critical_section() {
            ExitOutcome::Rejected => {
                return Ok(ExitCsOutcome {
                    exited: false,
                    token_sent_to: None,
                })
            }
            ExitOutcome::Kept => ExitCsOutcome {
                exited: true,
                token_sent_to: None,
            },
            ExitOutcome::Handoff(next, token) => {
                self.nodes[next].receive_token(token);
                self.message_log.push(MessageRecord::Token {
                    from: node_id,
                    to: next,
                    timestamp_ms: now_ms(),
                });
                ExitCsOutcome {
                    exited: true,
                    token_sent_to: Some(next),
                }
            }
        };

        self.cs_access_log.push(CsRecord {
            node_id,
            action: CsAction::Exit,
            timestamp_ms: now_ms(),
        });

        Ok(outcome)
    }

    /// Per-node snapshot of the whole system. No protocol side effects.
    pub fn get_system_state(&self) -> SystemSnapshot {
        SystemSnapshot {
            num_nodes: self.nodes.len(),
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeSnapshot {
                    node_id: node.node_id(),
                    has_token: node.has_token(),
                    in_critical_section: node.in_critical_section(),
                    own_sequence: node.own_sequence(),
                    token_queue: node.token().map(|t| t.queue_snapshot()),
                })
                .collect(),
            total_messages: self.message_log.len(),
            cs_accesses: self.cs_access_log.len(),
        }
    }

    pub fn get_message_log(&self) -> &[MessageRecord] {
        &self.message_log
    }

    pub fn get_cs_access_log(&self) -> &[CsRecord] {
        &self.cs_access_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_seeds_exactly_one_token() {
        let coordinator =
            Coordinator::new(ClusterConfig::new(4, 2)).expect("valid cluster config");
        let holders: Vec<NodeId> = coordinator
            .get_system_state()
            .nodes
            .iter()
            .filter(|n| n.has_token)
            .map(|n| n.node_id)
            .collect();
        assert_eq!(holders, vec![2]);
    }

    #[test]
    fn immediate_grant_logs_token_before_request() {
        let mut coordinator =
            Coordinator::new(ClusterConfig::new(3, 0)).expect("valid cluster config");
        let outcome = coordinator.request_cs(1).expect("valid node id");
        assert!(outcome.has_token_now);
        assert_eq!(outcome.granted_from, Some(0));

        let log = coordinator.get_message_log();
        assert!(matches!(log[0], MessageRecord::Token { from: 0, to: 1, .. }));
        assert!(matches!(
            log[1],
            MessageRecord::Request {
                from: 1,
                sequence: 1,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_ids_are_rejected_everywhere() {
        let mut coordinator =
            Coordinator::new(ClusterConfig::new(3, 0)).expect("valid cluster config");
        let bad = InvalidNodeId {
            id: 3,
            num_nodes: 3,
        };
        assert_eq!(coordinator.request_cs(3), Err(bad));
        assert_eq!(coordinator.enter_cs(3), Err(bad));
        assert_eq!(coordinator.exit_cs(3), Err(bad));
    }
}
