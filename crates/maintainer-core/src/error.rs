//! Error types for the maintenance engine.

use std::time::Duration;
use thiserror::Error;

/// Result type for maintenance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while maintaining a witness pool.
#[derive(Debug, Error)]
pub enum Error {
    /// A node address explicitly asked for plain HTTP.
    #[error("insecure protocol: expected https:// got {address}")]
    InsecureProtocol { address: String },

    /// A node address could not be turned into a host.
    #[error("invalid node address: {0:?}")]
    InvalidAddress(String),

    /// Fetching a node's genesis block or identity failed.
    #[error("failed to resolve node {address}: {source}")]
    NodeResolution {
        address: String,
        #[source]
        source: Box<Error>,
    },

    /// A remote call did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Best-effort discovery resolved too few nodes.
    #[error("only {resolved} of {required} required nodes resolved")]
    QuorumNotMet { resolved: usize, required: usize },

    /// No primary node resolved, so there is no anchor for the run.
    #[error("at least one primary node is required")]
    NoPrimaryNodes,

    /// The anchor's genesis configuration has no witness selection method.
    #[error("expected genesis configuration to have a witnessSelectionMethod")]
    MissingWitnessSelectionConfig,

    /// The genesis block does not have the expected shape.
    #[error("malformed genesis block: {0}")]
    MalformedGenesis(String),

    /// The ledger has no record with this id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A create was requested for a pool that already exists.
    #[error("witness pool already exists: {0}")]
    AlreadyExists(String),

    /// A record read from the ledger does not have the expected shape.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A patch entry cannot be applied.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// The update would not change the document.
    #[error("empty json patch: ledger updates must contain changes")]
    EmptyPatch,

    /// The identity method is not one of `v1` or `key`.
    #[error("unknown did method {0:?}: expected \"v1\" or \"key\"")]
    UnknownDidMethod(String),

    /// The ledger answered with a non-success status.
    #[error("ledger rejected request with status {status}: {body}")]
    Ledger { status: u16, body: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key material could not be loaded or derived.
    #[error("key error: {0}")]
    Key(String),

    /// Producing a signature failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a per-node failure with the address it came from.
    pub fn node_resolution(address: impl Into<String>, source: Error) -> Self {
        Error::NodeResolution {
            address: address.into(),
            source: Box::new(source),
        }
    }

    /// True for the read-path error that means "document does not exist yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
