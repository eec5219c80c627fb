//! Maintainer configuration.
//!
//! Values come from `MAINTAINER_*` environment variables and are then
//! overridden by command line flags through the `with_*` builders.

use crate::contexts::ContextSet;
use crate::did::DidMethod;
use crate::error::{Error, Result};
use crate::keys::KeySource;
use crate::ledger::HttpOptions;
use crate::node::parse_node_list;
use crate::resolver::DiscoveryPolicy;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Count written into new pools when none is configured.
pub const DEFAULT_MAXIMUM_WITNESS_COUNT: u64 = 1;

/// Network mode used for `did:v1` identifiers when none is configured.
pub const DEFAULT_VERES_MODE: &str = "dev";

/// Everything a maintenance run needs.
#[derive(Debug, Clone)]
pub struct MaintainerConfig {
    /// Primary node addresses, in pool order.
    pub primary: Vec<String>,

    /// Secondary node addresses, in pool order.
    pub secondary: Vec<String>,

    pub did_method: DidMethod,

    pub key_source: KeySource,

    /// `live` selects `did:v1:nym:`, anything else `did:v1:test:nym:`.
    pub veres_mode: String,

    /// `None` keeps the ledger's count on update.
    pub maximum_witness_count: Option<u64>,

    pub http: HttpOptions,

    pub discovery: DiscoveryPolicy,

    pub contexts: ContextSet,

    /// Pre-issued ledger write proof stapled onto `v1` operations.
    pub ledger_proof: Option<Value>,
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self {
            primary: Vec::new(),
            secondary: Vec::new(),
            did_method: DidMethod::default(),
            key_source: KeySource::default(),
            veres_mode: DEFAULT_VERES_MODE.to_string(),
            maximum_witness_count: None,
            http: HttpOptions::default(),
            discovery: DiscoveryPolicy::default(),
            contexts: ContextSet::default(),
            ledger_proof: None,
        }
    }
}

impl MaintainerConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(primary) = var("MAINTAINER_PRIMARY") {
            config.primary = parse_node_list(&primary);
        }
        if let Some(secondary) = var("MAINTAINER_SECONDARY") {
            config.secondary = parse_node_list(&secondary);
        }
        if let Some(method) = var("MAINTAINER_DID_METHOD") {
            config.did_method = method.parse()?;
        }
        if let Some(key) = var("MAINTAINER_KEY") {
            config.key_source = key_source_from(&key);
        }
        if let Some(mode) = var("MAINTAINER_VERES_MODE") {
            config.veres_mode = mode.trim().to_string();
        }
        if let Some(count) = var("MAINTAINER_MAX_WITNESSES") {
            config.maximum_witness_count = Some(parse_number("MAINTAINER_MAX_WITNESSES", &count)?);
        }
        if let Some(flag) = var("MAINTAINER_REJECT_UNAUTHORIZED") {
            config.http.reject_unauthorized = parse_bool("MAINTAINER_REJECT_UNAUTHORIZED", &flag)?;
        }
        if let Some(flag) = var("MAINTAINER_KEEP_ALIVE") {
            config.http.keep_alive = parse_bool("MAINTAINER_KEEP_ALIVE", &flag)?;
        }
        if let Some(secs) = var("MAINTAINER_NODE_TIMEOUT_SECS") {
            let secs = parse_number("MAINTAINER_NODE_TIMEOUT_SECS", &secs)?;
            config.discovery = config.discovery.with_timeout(Duration::from_secs(secs));
        }
        if let Some(path) = var("MAINTAINER_LEDGER_PROOF") {
            config.ledger_proof = Some(load_ledger_proof(Path::new(path.trim()))?);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_primary(mut self, primary: Vec<String>) -> Self {
        self.primary = primary;
        self
    }

    #[must_use]
    pub fn with_secondary(mut self, secondary: Vec<String>) -> Self {
        self.secondary = secondary;
        self
    }

    #[must_use]
    pub fn with_did_method(mut self, method: DidMethod) -> Self {
        self.did_method = method;
        self
    }

    #[must_use]
    pub fn with_key_source(mut self, source: KeySource) -> Self {
        self.key_source = source;
        self
    }

    #[must_use]
    pub fn with_veres_mode(mut self, mode: impl Into<String>) -> Self {
        self.veres_mode = mode.into();
        self
    }

    #[must_use]
    pub fn with_maximum_witness_count(mut self, count: u64) -> Self {
        self.maximum_witness_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }

    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryPolicy) -> Self {
        self.discovery = discovery;
        self
    }

    #[must_use]
    pub fn with_contexts(mut self, contexts: ContextSet) -> Self {
        self.contexts = contexts;
        self
    }

    #[must_use]
    pub fn with_ledger_proof(mut self, proof: Value) -> Self {
        self.ledger_proof = Some(proof);
        self
    }
}

/// An existing file is a key file; anything else is a seed phrase.
pub fn key_source_from(value: &str) -> KeySource {
    let path = PathBuf::from(value.trim());
    if path.is_file() {
        KeySource::KeyFile(path)
    } else {
        KeySource::Seed(value.to_string())
    }
}

/// Read a JSON proof object from disk.
pub fn load_ledger_proof(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)?;
    let proof: Value = serde_json::from_str(&raw)?;
    if !proof.is_object() {
        return Err(Error::Config(format!(
            "ledger proof in {} is not a JSON object",
            path.display()
        )));
    }
    Ok(proof)
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got {:?}", name, other))),
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got {:?}", name, value)))
}
