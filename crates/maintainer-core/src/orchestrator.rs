//! One maintenance run: discover, diff, authorize, submit.

use crate::auth::{AuthorizationChain, AuthorizationTargets, Authorize};
use crate::config::{MaintainerConfig, DEFAULT_MAXIMUM_WITNESS_COUNT};
use crate::document::{DesiredPool, PoolDocumentBuilder};
use crate::error::{Error, Result};
use crate::keys::{resolve_signing_key, KeyPurpose, SigningIdentity};
use crate::ledger::{LedgerAccess, LedgerConnector, OperationKind, RecordEnvelope, RecordMeta, WebConnector};
use crate::node::Topology;
use crate::resolver::NodeResolver;
use maintainer_threshold::FaultBudget;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of the discovery phase.
#[derive(Debug, Clone)]
pub struct Setup {
    pub topology: Topology,
    pub witness_pool_id: String,
    pub ledger_id: String,
    /// The pool as currently stored, if any.
    pub existing: Option<RecordEnvelope>,
}

impl Setup {
    pub fn found(&self) -> bool {
        self.existing.is_some()
    }

    pub fn meta(&self) -> Option<&RecordMeta> {
        self.existing.as_ref().map(|e| &e.meta)
    }
}

/// Candidate lists and fault budget logged alongside each operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySummary {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    #[serde(flatten)]
    pub budget: FaultBudget,
}

impl TopologySummary {
    pub fn new(topology: &Topology) -> Self {
        Self {
            primary: topology.primary_candidates(),
            secondary: topology.secondary_candidates(),
            budget: topology.fault_budget(),
        }
    }
}

/// What a successful run submitted.
#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    pub kind: OperationKind,
    pub witness_pool_id: String,
    pub summary: TopologySummary,
    /// BLAKE3 of the submitted operation, hex encoded.
    pub digest: String,
}

/// Look up the pool record; a missing record is `None`, other failures propagate.
pub async fn find_witness_pool(ledger: &dyn LedgerAccess, witness_pool_id: &str) -> Result<Option<RecordEnvelope>> {
    match ledger.get_record(witness_pool_id).await {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Warn when the topology cannot tolerate its own fault budget.
///
/// Never fails the run.
pub fn check_thresholds(budget: &FaultBudget) -> bool {
    let mut sufficient = true;
    if !budget.primaries_sufficient() {
        warn!(
            primary = budget.primary_nodes,
            required = budget.min_primary_nodes,
            max_faults = budget.max_faults,
            "Too few primary witness candidates for the fault budget"
        );
        sufficient = false;
    }
    if !budget.total_sufficient() {
        warn!(
            total = budget.total_nodes,
            required = budget.min_nodes,
            needed = budget.nodes_short(),
            max_faults = budget.max_faults,
            "Too few witness candidates for the fault budget"
        );
        sufficient = false;
    }
    sufficient
}

fn operation_digest(operation: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(operation)?;
    Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
}

/// Fields of the audit line written before an operation is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AuditRecord {
    operation: String,
    topology: String,
}

impl AuditRecord {
    fn new(operation: &Value, summary: &TopologySummary) -> Result<Self> {
        Ok(Self {
            operation: serde_json::to_string(operation)?,
            topology: serde_json::to_string(summary)?,
        })
    }
}

/// Drives a maintenance run against the configured nodes.
pub struct MaintenanceOrchestrator {
    config: MaintainerConfig,
    resolver: NodeResolver,
    identity: SigningIdentity,
}

impl MaintenanceOrchestrator {
    /// Resolves the signing identity before any network traffic.
    pub fn new(config: MaintainerConfig, connector: Arc<dyn LedgerConnector>) -> Result<Self> {
        let identity = resolve_signing_key(&config.key_source, config.did_method, &config.veres_mode)?;
        let resolver = NodeResolver::new(connector, config.discovery);
        debug!(
            did = %identity.did(),
            method = %config.did_method,
            document = %identity.did_document(),
            "Loaded maintainer identity"
        );
        Ok(Self {
            config,
            resolver,
            identity,
        })
    }

    /// Orchestrator talking HTTPS to real ledger nodes.
    pub fn with_web_connector(config: MaintainerConfig) -> Result<Self> {
        let connector = WebConnector::new(&config.http)?;
        Self::new(config, Arc::new(connector))
    }

    pub fn config(&self) -> &MaintainerConfig {
        &self.config
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// Resolve the topology and look up the current pool.
    pub async fn setup(&self) -> Result<Setup> {
        info!(
            primary = ?self.config.primary,
            secondary = ?self.config.secondary,
            "Resolving witness nodes"
        );
        let topology = self
            .resolver
            .resolve(&self.config.primary, &self.config.secondary)
            .await?;

        let witness_pool_id = topology.witness_pool_id()?;
        let ledger_id = topology.ledger_id()?;
        check_thresholds(&topology.fault_budget());

        let existing = find_witness_pool(topology.anchor_ledger().as_ref(), &witness_pool_id).await?;
        info!(
            witness_pool = %witness_pool_id,
            ledger = %ledger_id,
            found = existing.is_some(),
            "Looked up witness pool"
        );

        Ok(Setup {
            topology,
            witness_pool_id,
            ledger_id,
            existing,
        })
    }

    /// Publish a new pool; fails if one already exists.
    pub async fn create(&self) -> Result<MaintenanceReport> {
        let setup = self.setup().await?;
        if setup.found() {
            return Err(Error::AlreadyExists(setup.witness_pool_id));
        }
        self.submit_create(&setup).await
    }

    /// Patch the existing pool; fails if there is none.
    pub async fn update(&self) -> Result<MaintenanceReport> {
        let setup = self.setup().await?;
        match &setup.existing {
            Some(existing) => self.submit_update(&setup, existing).await,
            None => Err(Error::NotFound(setup.witness_pool_id)),
        }
    }

    /// Create when absent, update when present.
    pub async fn sync(&self) -> Result<MaintenanceReport> {
        let setup = self.setup().await?;
        match &setup.existing {
            Some(existing) => self.submit_update(&setup, existing).await,
            None => self.submit_create(&setup).await,
        }
    }

    fn builder(&self) -> PoolDocumentBuilder {
        PoolDocumentBuilder::new(self.config.contexts.clone(), self.config.did_method)
    }

    async fn submit_create(&self, setup: &Setup) -> Result<MaintenanceReport> {
        let count = self
            .config
            .maximum_witness_count
            .unwrap_or(DEFAULT_MAXIMUM_WITNESS_COUNT);
        let desired = DesiredPool::from_topology(&setup.topology, Some(count));
        let record = self
            .builder()
            .create(&setup.witness_pool_id, self.identity.did(), &desired);
        self.submit(setup, serde_json::to_value(record)?, OperationKind::Create)
            .await
    }

    async fn submit_update(&self, setup: &Setup, existing: &RecordEnvelope) -> Result<MaintenanceReport> {
        let desired = DesiredPool::from_topology(&setup.topology, self.config.maximum_witness_count);
        let patch = self.builder().update(existing, &desired)?;
        debug!(entries = patch.patch.len(), sequence = patch.sequence, "Built witness pool patch");
        self.submit(setup, serde_json::to_value(patch)?, OperationKind::Update)
            .await
    }

    async fn submit(&self, setup: &Setup, payload: Value, kind: OperationKind) -> Result<MaintenanceReport> {
        let ledger = setup.topology.anchor_ledger();
        let operation = ledger.wrap(payload, kind, &self.config.contexts).await?;

        let key = self
            .identity
            .method_for(KeyPurpose::CapabilityInvocation)?
            .clone();
        let targets = AuthorizationTargets::new(&setup.witness_pool_id, &setup.ledger_id);
        let chain = AuthorizationChain::new(
            self.config.did_method,
            key,
            targets,
            self.config.ledger_proof.clone(),
        );
        let operation = chain.authorize(operation)?;

        let report = MaintenanceReport {
            kind,
            witness_pool_id: setup.witness_pool_id.clone(),
            summary: TopologySummary::new(&setup.topology),
            digest: operation_digest(&operation)?,
        };
        let audit = AuditRecord::new(&operation, &report.summary)?;
        info!(
            kind = %kind,
            operation = %audit.operation,
            topology = %audit.topology,
            digest = %report.digest,
            "Sending witness pool operation"
        );

        ledger.send_operation(&operation).await?;
        info!(kind = %kind, witness_pool = %report.witness_pool_id, "Witness pool operation accepted");
        Ok(report)
    }
}
