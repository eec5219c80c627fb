//! Witness Pool Maintenance Engine
//!
//! Keeps the on-ledger witness pool of a Web Ledger network in step with the
//! set of nodes an operator wants as witnesses.
//!
//! # Architecture
//!
//! - **Resolver**: concurrent discovery of primary and secondary nodes over HTTPS
//! - **Document**: pool records for new pools, minimal patches for existing ones
//! - **Auth**: capability invocation proofs for the `v1` and `key` identity methods
//! - **Ledger**: the node access contract and its Web Ledger client
//! - **Orchestrator**: resolve, look up, build, authorize, submit
//!
//! # Example
//!
//! ```no_run
//! use maintainer_core::{MaintainerConfig, MaintenanceOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MaintainerConfig::from_env()?
//!         .with_primary(vec!["node-1.example.com".into()]);
//!     let orchestrator = MaintenanceOrchestrator::with_web_connector(config)?;
//!     let report = orchestrator.sync().await?;
//!     println!("{} {}", report.kind, report.witness_pool_id);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod contexts;
pub mod did;
pub mod document;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod multibase;
pub mod node;
pub mod orchestrator;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use auth::{sign_operation, AuthorizationChain, AuthorizationTargets, Authorize};
pub use config::MaintainerConfig;
pub use contexts::ContextSet;
pub use did::DidMethod;
pub use document::{DesiredPool, PatchOp, PoolDocumentBuilder, PoolPatch, WitnessPoolDocument};
pub use error::{Error, Result};
pub use keys::{resolve_signing_key, KeyPurpose, KeySource, SigningIdentity};
pub use ledger::{LedgerAccess, LedgerConnector, OperationKind, WebConnector, WebLedgerClient};
pub use node::{NodeAddress, Topology};
pub use orchestrator::{MaintenanceOrchestrator, MaintenanceReport, Setup, TopologySummary};
pub use resolver::{DiscoveryPolicy, NodeResolver, ResolutionPolicy};

pub use maintainer_threshold::{max_faults, min_nodes, min_primary_nodes, FaultBudget};
