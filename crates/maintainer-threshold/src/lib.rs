//! Witness Pool Fault Tolerance
//!
//! Pure arithmetic over a witness pool topology. Nothing here blocks an
//! operation; the numbers are surfaced so operators can see when a pool is
//! under-provisioned.
//!
//! # Bounds
//!
//! - `n` total nodes tolerate `floor((n - 1) / 3)` faults
//! - tolerating `f` faults needs `3f + 1` nodes in total
//! - tolerating `f` faults needs `2f + 2` primary (voting) nodes
//!
//! Secondaries count toward the total but never toward the primary bound.

mod threshold;

pub use threshold::{
    max_faults, min_nodes, min_primary_nodes, nodes_needed, tolerates, NODES_PER_FAULT,
    PRIMARIES_PER_FAULT,
};

/// Fault budget of a concrete topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FaultBudget {
    pub primary_nodes: usize,
    pub secondary_nodes: usize,
    pub total_nodes: usize,
    pub max_faults: usize,
    pub min_nodes: usize,
    pub min_primary_nodes: usize,
}

impl FaultBudget {
    /// Compute the budget for a primary/secondary split.
    pub const fn new(primary_nodes: usize, secondary_nodes: usize) -> Self {
        let total_nodes = primary_nodes + secondary_nodes;
        let faults = max_faults(total_nodes);
        Self {
            primary_nodes,
            secondary_nodes,
            total_nodes,
            max_faults: faults,
            min_nodes: min_nodes(faults),
            min_primary_nodes: min_primary_nodes(faults),
        }
    }

    /// Whether there are enough primaries to keep voting through `max_faults`.
    pub const fn primaries_sufficient(&self) -> bool {
        self.primary_nodes >= self.min_primary_nodes
    }

    /// Whether the total node count satisfies `3f + 1`.
    pub const fn total_sufficient(&self) -> bool {
        tolerates(self.total_nodes, self.max_faults)
    }

    /// Nodes missing before `max_faults` is covered; 0 when sufficient.
    pub const fn nodes_short(&self) -> usize {
        nodes_needed(self.total_nodes, self.max_faults)
    }
}
