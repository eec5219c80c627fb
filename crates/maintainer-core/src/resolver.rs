//! Concurrent node discovery.
//!
//! Every address of a role is fetched in parallel; results come back in input
//! order because candidate lists in the pool document are positional. All
//! addresses of both roles are validated before the first network call.

use crate::error::{Error, Result};
use crate::ledger::LedgerConnector;
use crate::node::{Node, NodeAddress, Topology};
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What to do when some nodes of a role fail to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Any failure fails the whole role.
    #[default]
    FailFast,
    /// Keep the nodes that resolved as long as at least `min` of them did.
    /// `min` is capped at the number of addresses in the role.
    Quorum { min: usize },
}

/// Fan-out policy for discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoveryPolicy {
    pub resolution: ResolutionPolicy,
    /// Per-node deadline covering both the genesis and identity fetch.
    pub node_timeout: Option<Duration>,
}

impl DiscoveryPolicy {
    /// Set the per-node timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Tolerate failures as long as `min` nodes per role resolve.
    #[must_use]
    pub fn with_quorum(mut self, min: usize) -> Self {
        self.resolution = ResolutionPolicy::Quorum { min };
        self
    }
}

/// Resolves configured addresses into a [`Topology`].
pub struct NodeResolver {
    connector: Arc<dyn LedgerConnector>,
    policy: DiscoveryPolicy,
}

impl NodeResolver {
    pub fn new(connector: Arc<dyn LedgerConnector>, policy: DiscoveryPolicy) -> Self {
        Self { connector, policy }
    }

    pub fn policy(&self) -> DiscoveryPolicy {
        self.policy
    }

    /// Resolve both roles and build the topology.
    pub async fn resolve(&self, primary: &[String], secondary: &[String]) -> Result<Topology> {
        let primary = normalize(primary)?;
        let secondary = normalize(secondary)?;

        let primary = self.resolve_role("primary", primary).await?;
        let secondary = self.resolve_role("secondary", secondary).await?;

        info!(
            primary = primary.len(),
            secondary = secondary.len(),
            "Resolved witness topology"
        );
        Topology::new(primary, secondary)
    }

    /// Fetch every node of one role concurrently.
    pub async fn resolve_role(&self, role: &str, addresses: Vec<NodeAddress>) -> Result<Vec<Node>> {
        let requested = addresses.len();
        debug!(role, nodes = requested, "Resolving nodes");

        let fetches = addresses.into_iter().map(|address| {
            let connector = Arc::clone(&self.connector);
            let timeout = self.policy.node_timeout;
            async move {
                let label = address.to_string();
                fetch_node(connector.as_ref(), address, timeout)
                    .await
                    .map_err(|e| Error::node_resolution(label, e))
            }
        });

        match self.policy.resolution {
            ResolutionPolicy::FailFast => try_join_all(fetches).await,
            ResolutionPolicy::Quorum { min } => {
                let required = min.min(requested);
                let mut nodes = Vec::with_capacity(requested);
                for result in join_all(fetches).await {
                    match result {
                        Ok(node) => nodes.push(node),
                        Err(e) => warn!(role, error = %e, "Skipping unresolved node"),
                    }
                }
                if nodes.len() < required {
                    return Err(Error::QuorumNotMet {
                        resolved: nodes.len(),
                        required,
                    });
                }
                Ok(nodes)
            }
        }
    }
}

fn normalize(addresses: &[String]) -> Result<Vec<NodeAddress>> {
    addresses.iter().map(|a| NodeAddress::parse(a)).collect()
}

async fn fetch_node(
    connector: &dyn LedgerConnector,
    address: NodeAddress,
    timeout: Option<Duration>,
) -> Result<Node> {
    let fetch = async {
        let ledger = connector.connect(address.host())?;
        let genesis = ledger.genesis_block().await?;
        let target_node = ledger.target_node().await?;
        debug!(node = %address, target_node = %target_node, "Resolved node");
        Ok::<_, Error>(Node::new(address.clone(), target_node, genesis, ledger))
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => fetch.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, FakeLedger};

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn preserves_input_order() {
        let connector = FakeConnector::new("urn:uuid:pool")
            // first node answers last
            .with_delay("a.example", Duration::from_millis(30))
            .with_delay("b.example", Duration::from_millis(10));
        let resolver = NodeResolver::new(Arc::new(connector), DiscoveryPolicy::default());

        let topology = resolver
            .resolve(&addrs(&["a.example", "b.example", "c.example"]), &addrs(&["d.example"]))
            .await
            .unwrap();

        assert_eq!(
            topology.primary_candidates(),
            vec!["node:a.example", "node:b.example", "node:c.example"]
        );
        assert_eq!(topology.secondary_candidates(), vec!["node:d.example"]);
        assert_eq!(topology.anchor().address.host(), "a.example");
    }

    #[tokio::test]
    async fn insecure_address_fails_before_any_fetch() {
        let connector = Arc::new(FakeConnector::new("urn:uuid:pool"));
        let resolver = NodeResolver::new(connector.clone(), DiscoveryPolicy::default());

        let err = resolver
            .resolve(&addrs(&["a.example"]), &addrs(&["http://b.example"]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsecureProtocol { .. }));
        assert_eq!(connector.connections(), 0);
    }

    #[tokio::test]
    async fn one_failure_fails_the_role() {
        let connector = FakeConnector::new("urn:uuid:pool").with_failure("b.example");
        let resolver = NodeResolver::new(Arc::new(connector), DiscoveryPolicy::default());

        let err = resolver
            .resolve(&addrs(&["a.example", "b.example"]), &[])
            .await
            .unwrap_err();

        match err {
            Error::NodeResolution { address, .. } => assert_eq!(address, "https://b.example"),
            other => panic!("expected NodeResolution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn quorum_keeps_resolved_nodes_in_order() {
        let connector = FakeConnector::new("urn:uuid:pool").with_failure("b.example");
        let resolver = NodeResolver::new(
            Arc::new(connector),
            DiscoveryPolicy::default().with_quorum(2),
        );

        let topology = resolver
            .resolve(&addrs(&["a.example", "b.example", "c.example"]), &[])
            .await
            .unwrap();

        assert_eq!(
            topology.primary_candidates(),
            vec!["node:a.example", "node:c.example"]
        );
    }

    #[tokio::test]
    async fn quorum_not_met() {
        let connector = FakeConnector::new("urn:uuid:pool")
            .with_failure("a.example")
            .with_failure("b.example");
        let resolver = NodeResolver::new(
            Arc::new(connector),
            DiscoveryPolicy::default().with_quorum(2),
        );

        let err = resolver
            .resolve(&addrs(&["a.example", "b.example", "c.example"]), &[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::QuorumNotMet {
                resolved: 1,
                required: 2
            }
        ));
    }

    #[tokio::test]
    async fn slow_node_times_out() {
        let connector = FakeConnector::new("urn:uuid:pool")
            .with_delay("slow.example", Duration::from_secs(5));
        let resolver = NodeResolver::new(
            Arc::new(connector),
            DiscoveryPolicy::default().with_timeout(Duration::from_millis(20)),
        );

        let err = resolver
            .resolve(&addrs(&["slow.example"]), &[])
            .await
            .unwrap_err();

        match err {
            Error::NodeResolution { source, .. } => {
                assert!(matches!(*source, Error::Timeout(_)))
            }
            other => panic!("expected NodeResolution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_primary_list_has_no_anchor() {
        let resolver = NodeResolver::new(
            Arc::new(FakeConnector::new("urn:uuid:pool")),
            DiscoveryPolicy::default(),
        );
        let err = resolver.resolve(&[], &addrs(&["a.example"])).await.unwrap_err();
        assert!(matches!(err, Error::NoPrimaryNodes));
    }

    #[tokio::test]
    async fn resolved_nodes_share_the_fake_ledger() {
        let ledger = Arc::new(FakeLedger::new("urn:uuid:pool"));
        let connector = FakeConnector::with_ledger(ledger.clone());
        let resolver = NodeResolver::new(Arc::new(connector), DiscoveryPolicy::default());

        let topology = resolver.resolve(&addrs(&["a.example"]), &[]).await.unwrap();
        assert_eq!(topology.witness_pool_id().unwrap(), "urn:uuid:pool");
        assert_eq!(topology.ledger_id().unwrap(), crate::testing::LEDGER_ID);
    }
}
