//! Ledger nodes and the resolved topology of a maintenance run.

use crate::error::{Error, Result};
use crate::ledger::{GenesisBlock, LedgerAccess};
use maintainer_threshold::FaultBudget;
use std::sync::Arc;

const SECURE_SCHEME: &str = "https://";
const INSECURE_SCHEME: &str = "http://";

/// A normalized, HTTPS-only node address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    url: String,
    host: String,
}

impl NodeAddress {
    /// Normalize a bare host or `https://` URL.
    ///
    /// Bare hosts get `https://` prepended. An explicit `http://` is an
    /// [`Error::InsecureProtocol`].
    pub fn parse(address: &str) -> Result<Self> {
        let trimmed = address.trim();
        if starts_with_ignore_case(trimmed, INSECURE_SCHEME) {
            return Err(Error::InsecureProtocol {
                address: trimmed.to_string(),
            });
        }

        let rest = if starts_with_ignore_case(trimmed, SECURE_SCHEME) {
            &trimmed[SECURE_SCHEME.len()..]
        } else {
            trimmed
        };

        let host = rest
            .split(&['/', '?', '#'][..])
            .next()
            .unwrap_or_default();
        if host.is_empty() || rest.contains("://") || rest.chars().any(char::is_whitespace) {
            return Err(Error::InvalidAddress(address.to_string()));
        }

        Ok(Self {
            url: format!("{}{}", SECURE_SCHEME, rest),
            host: host.to_string(),
        })
    }

    /// Full `https://` URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `host[:port]` the ledger client binds to.
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Split a comma separated node list, dropping blank entries.
pub fn parse_node_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One resolved ledger participant.
#[derive(Clone)]
pub struct Node {
    pub address: NodeAddress,
    /// Identity the node reported for itself.
    pub target_node: String,
    pub genesis: GenesisBlock,
    ledger: Arc<dyn LedgerAccess>,
}

impl Node {
    pub fn new(
        address: NodeAddress,
        target_node: String,
        genesis: GenesisBlock,
        ledger: Arc<dyn LedgerAccess>,
    ) -> Self {
        Self {
            address,
            target_node,
            genesis,
            ledger,
        }
    }

    /// The ledger access point bound to this node.
    pub fn ledger(&self) -> &Arc<dyn LedgerAccess> {
        &self.ledger
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.address)
            .field("target_node", &self.target_node)
            .finish_non_exhaustive()
    }
}

/// Primary and secondary nodes in caller-supplied order.
///
/// The first primary is the anchor: its genesis block names the pool and the
/// ledger, and its access point receives every read and write.
#[derive(Debug, Clone)]
pub struct Topology {
    primary: Vec<Node>,
    secondary: Vec<Node>,
}

impl Topology {
    pub fn new(primary: Vec<Node>, secondary: Vec<Node>) -> Result<Self> {
        if primary.is_empty() {
            return Err(Error::NoPrimaryNodes);
        }
        Ok(Self { primary, secondary })
    }

    pub fn primary(&self) -> &[Node] {
        &self.primary
    }

    pub fn secondary(&self) -> &[Node] {
        &self.secondary
    }

    /// The anchor node (first primary).
    pub fn anchor(&self) -> &Node {
        // non-empty by construction
        &self.primary[0]
    }

    /// Identity tokens of the primaries, in order.
    pub fn primary_candidates(&self) -> Vec<String> {
        self.primary.iter().map(|n| n.target_node.clone()).collect()
    }

    /// Identity tokens of the secondaries, in order.
    pub fn secondary_candidates(&self) -> Vec<String> {
        self.secondary.iter().map(|n| n.target_node.clone()).collect()
    }

    pub fn total_nodes(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn max_faults(&self) -> usize {
        maintainer_threshold::max_faults(self.total_nodes())
    }

    pub fn fault_budget(&self) -> FaultBudget {
        FaultBudget::new(self.primary.len(), self.secondary.len())
    }

    /// Pool id from the anchor's genesis configuration.
    pub fn witness_pool_id(&self) -> Result<String> {
        self.anchor().genesis.witness_pool_id()
    }

    /// Ledger id from the anchor's genesis configuration.
    pub fn ledger_id(&self) -> Result<String> {
        self.anchor().genesis.ledger_id()
    }

    /// Access point all reads and writes go through.
    pub fn anchor_ledger(&self) -> &Arc<dyn LedgerAccess> {
        self.anchor().ledger()
    }
}
