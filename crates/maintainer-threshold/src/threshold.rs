//! Fault-tolerance thresholds for a witness pool.
//!
//! The pool follows the classic BFT bound: `n` nodes tolerate `f` faults
//! iff `n >= 3f + 1`. Primaries are the voting set and need `2f + 2`
//! members to keep a quorum when `f` of them misbehave.
//!
//! All functions are `const` and saturate instead of overflowing.

/// Nodes required per tolerated fault under the `3f + 1` bound.
pub const NODES_PER_FAULT: usize = 3;

/// Primaries required per tolerated fault under the `2f + 2` bound.
pub const PRIMARIES_PER_FAULT: usize = 2;

/// Largest `f` such that `total_nodes >= 3f + 1`.
///
/// Formula: floor((n - 1) / 3), with an empty topology tolerating nothing.
///
/// # Examples
///
/// ```
/// use maintainer_threshold::max_faults;
///
/// assert_eq!(max_faults(1), 0);
/// assert_eq!(max_faults(4), 1);
/// assert_eq!(max_faults(7), 2);
/// ```
pub const fn max_faults(total_nodes: usize) -> usize {
    if total_nodes == 0 {
        return 0;
    }
    (total_nodes - 1) / NODES_PER_FAULT
}

/// Minimum total nodes needed to tolerate `faults` faults: `3f + 1`.
pub const fn min_nodes(faults: usize) -> usize {
    faults.saturating_mul(NODES_PER_FAULT).saturating_add(1)
}

/// Minimum primary (voting) nodes needed to tolerate `faults` faults: `2f + 2`.
pub const fn min_primary_nodes(faults: usize) -> usize {
    faults.saturating_mul(PRIMARIES_PER_FAULT).saturating_add(2)
}

/// Check if a topology of `total_nodes` can tolerate `faults` faults.
pub const fn tolerates(total_nodes: usize, faults: usize) -> bool {
    total_nodes >= min_nodes(faults)
}

/// How many more nodes are needed before `faults` faults are tolerated.
pub const fn nodes_needed(total_nodes: usize, faults: usize) -> usize {
    let required = min_nodes(faults);
    if total_nodes >= required {
        0
    } else {
        required - total_nodes
    }
}
