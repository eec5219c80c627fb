//! Ledger access point contract.
//!
//! The engine talks to ledger nodes only through [`LedgerAccess`]; the
//! HTTPS implementation lives in [`web`]. Discovery creates one client per
//! node through a [`LedgerConnector`] so tests can swap in fakes.

pub mod web;

use crate::contexts::ContextSet;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub use web::{HttpOptions, WebConnector, WebLedgerClient};

/// Founding configuration block of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisBlock {
    #[serde(default)]
    pub event: Vec<ConfigurationEvent>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The configuration event carried by a genesis block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationEvent {
    pub ledger_configuration: LedgerConfiguration,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Consensus parameters from the genesis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_selection_method: Option<WitnessSelectionMethod>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How witnesses are selected; names the pool document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessSelectionMethod {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_pool: Option<String>,
}

impl GenesisBlock {
    /// The ledger configuration from the first event.
    pub fn configuration(&self) -> Result<&LedgerConfiguration> {
        self.event
            .first()
            .map(|e| &e.ledger_configuration)
            .ok_or_else(|| Error::MalformedGenesis("genesis block has no events".into()))
    }

    /// Id of the witness pool document this ledger selects witnesses from.
    pub fn witness_pool_id(&self) -> Result<String> {
        self.configuration()?
            .witness_selection_method
            .as_ref()
            .and_then(|m| m.witness_pool.clone())
            .ok_or(Error::MissingWitnessSelectionConfig)
    }

    /// Id of the ledger itself.
    pub fn ledger_id(&self) -> Result<String> {
        self.configuration()?
            .ledger
            .clone()
            .ok_or_else(|| Error::MalformedGenesis("ledger configuration has no ledger id".into()))
    }
}

/// A record as returned by the ledger query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnvelope {
    pub record: Value,
    pub meta: RecordMeta,
}

/// Ledger bookkeeping attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(default)]
    pub sequence: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The two operation shapes the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
}

impl OperationKind {
    /// Web Ledger operation type tag.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Create => "CreateWebLedgerRecord",
            Self::Update => "UpdateWebLedgerRecord",
        }
    }

    /// Field that holds the payload in the operation envelope.
    pub const fn payload_field(&self) -> &'static str {
        match self {
            Self::Create => "record",
            Self::Update => "recordPatch",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Envelope a record or patch into a ledger operation.
pub fn wrap_operation(
    payload: Value,
    kind: OperationKind,
    creator: &str,
    contexts: &ContextSet,
) -> Value {
    let mut operation = Map::new();
    operation.insert("@context".into(), Value::from(contexts.operation_contexts()));
    operation.insert("type".into(), Value::from(kind.type_name()));
    operation.insert("creator".into(), Value::from(creator));
    operation.insert(kind.payload_field().into(), payload);
    Value::Object(operation)
}

/// Operations a ledger node exposes to the maintainer.
#[async_trait]
pub trait LedgerAccess: Send + Sync {
    /// Genesis configuration of the ledger this node serves.
    async fn genesis_block(&self) -> Result<GenesisBlock>;

    /// Identity the node reports for itself.
    async fn target_node(&self) -> Result<String>;

    /// Read a record by id; [`Error::NotFound`] when it does not exist.
    async fn get_record(&self, id: &str) -> Result<RecordEnvelope>;

    /// Submit a signed operation.
    async fn send_operation(&self, operation: &Value) -> Result<()>;

    /// Envelope a payload into an operation created by this node.
    async fn wrap(&self, payload: Value, kind: OperationKind, contexts: &ContextSet) -> Result<Value> {
        let creator = self.target_node().await?;
        Ok(wrap_operation(payload, kind, &creator, contexts))
    }
}

/// Creates a ledger client bound to one host.
pub trait LedgerConnector: Send + Sync {
    fn connect(&self, host: &str) -> Result<Arc<dyn LedgerAccess>>;
}
