// Cluster shape: node count and initial token placement.

use serde::{Deserialize, Serialize};

/// The protocol is meaningless below two participants.
pub const MIN_NODES: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    TooFewNodes { num_nodes: usize },
    HolderOutOfRange { initial_holder: usize, num_nodes: usize },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub num_nodes: usize,
    /// Node seeded with the token at construction.
    #[serde(default)]
    pub initial_holder: usize,
}

impl ClusterConfig {
    pub fn new(num_nodes: usize, initial_holder: usize) -> Self {
        ClusterConfig {
            num_nodes,
            initial_holder,
        }
    }

    /// Construction-time checks; violations abort cluster construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes < MIN_NODES {
            return Err(ConfigError::TooFewNodes {
                num_nodes: self.num_nodes,
            });
        }
        if self.initial_holder >= self.num_nodes {
            return Err(ConfigError::HolderOutOfRange {
                initial_holder: self.initial_holder,
                num_nodes: self.num_nodes,
            });
        }
        Ok(())
    }
}
