//! Authorization chain per identity method.
//!
//! - `key`: both layers are signed locally with the generic suite. The
//!   ledger-write proof comes first, the pool-write proof second.
//! - `v1`: a pre-issued ledger-write proof from configuration is stapled on
//!   when present, then the pool-write proof is attached through the
//!   Veres One routine using the key's signer.
//!
//! Adding a method means adding an [`AuthorizationChain`] variant; every
//! `match` over it has to handle the newcomer.

use super::{
    add_proof, attach_invocation_proof, sign, CapabilityInvocation, CapabilityInvocationPurpose,
    Ed25519Signature2020,
};
use crate::did::DidMethod;
use crate::error::Result;
use crate::keys::Ed25519Key;
use serde_json::Value;
use tracing::debug;

/// Turns an unsigned operation into a submittable one.
pub trait Authorize {
    fn authorize(&self, operation: Value) -> Result<Value>;
}

/// Ids the proofs are invoked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationTargets {
    pub witness_pool_id: String,
    pub ledger_id: String,
}

impl AuthorizationTargets {
    pub fn new(witness_pool_id: impl Into<String>, ledger_id: impl Into<String>) -> Self {
        Self {
            witness_pool_id: witness_pool_id.into(),
            ledger_id: ledger_id.into(),
        }
    }

    pub fn ledger_write(&self) -> CapabilityInvocation {
        CapabilityInvocation::ledger_write(&self.ledger_id)
    }

    pub fn pool_write(&self) -> CapabilityInvocation {
        CapabilityInvocation::pool_write(&self.witness_pool_id)
    }
}

/// `did:key` signing: two locally produced proofs.
#[derive(Debug, Clone)]
pub struct KeyAuthorizer {
    key: Ed25519Key,
    targets: AuthorizationTargets,
}

impl KeyAuthorizer {
    pub fn new(key: Ed25519Key, targets: AuthorizationTargets) -> Self {
        Self { key, targets }
    }
}

impl Authorize for KeyAuthorizer {
    fn authorize(&self, operation: Value) -> Result<Value> {
        let suite = Ed25519Signature2020::new(&self.key);

        let ledger = CapabilityInvocationPurpose::new(self.targets.ledger_write());
        let operation = sign(operation, &suite, &ledger)?;
        debug!(target = %ledger.invocation.invocation_target, "Attached ledger write proof");

        let pool = CapabilityInvocationPurpose::new(self.targets.pool_write());
        let operation = sign(operation, &suite, &pool)?;
        debug!(target = %pool.invocation.invocation_target, "Attached pool write proof");

        Ok(operation)
    }
}

/// `did:v1` signing: optional stapled ledger proof plus a pool proof.
#[derive(Debug, Clone)]
pub struct V1Authorizer {
    key: Ed25519Key,
    targets: AuthorizationTargets,
    ledger_proof: Option<Value>,
}

impl V1Authorizer {
    pub fn new(key: Ed25519Key, targets: AuthorizationTargets) -> Self {
        Self {
            key,
            targets,
            ledger_proof: None,
        }
    }

    /// Staple a separately issued ledger-write proof onto every operation.
    #[must_use]
    pub fn with_ledger_proof(mut self, proof: Value) -> Self {
        self.ledger_proof = Some(proof);
        self
    }
}

impl Authorize for V1Authorizer {
    fn authorize(&self, operation: Value) -> Result<Value> {
        let operation = match &self.ledger_proof {
            Some(proof) => {
                debug!("Stapling configured ledger write proof");
                add_proof(operation, proof.clone())?
            }
            None => operation,
        };

        let signer = self.key.signer();
        let pool = self.targets.pool_write();
        let operation = attach_invocation_proof(operation, &pool, &signer)?;
        debug!(target = %pool.invocation_target, "Attached pool write proof");

        Ok(operation)
    }
}

/// Authorization for the supported identity methods.
#[derive(Debug, Clone)]
pub enum AuthorizationChain {
    V1(V1Authorizer),
    Key(KeyAuthorizer),
}

impl AuthorizationChain {
    /// Chain for `method`. `ledger_proof` is only used by `v1`.
    pub fn new(
        method: DidMethod,
        key: Ed25519Key,
        targets: AuthorizationTargets,
        ledger_proof: Option<Value>,
    ) -> Self {
        match method {
            DidMethod::V1 => {
                let authorizer = V1Authorizer::new(key, targets);
                Self::V1(match ledger_proof {
                    Some(proof) => authorizer.with_ledger_proof(proof),
                    None => authorizer,
                })
            }
            DidMethod::Key => Self::Key(KeyAuthorizer::new(key, targets)),
        }
    }

    /// Chain for a method given by name; unknown names fail before signing.
    pub fn for_method(
        method: &str,
        key: Ed25519Key,
        targets: AuthorizationTargets,
        ledger_proof: Option<Value>,
    ) -> Result<Self> {
        Ok(Self::new(method.parse()?, key, targets, ledger_proof))
    }

    pub fn method(&self) -> DidMethod {
        match self {
            Self::V1(_) => DidMethod::V1,
            Self::Key(_) => DidMethod::Key,
        }
    }
}

impl Authorize for AuthorizationChain {
    fn authorize(&self, operation: Value) -> Result<Value> {
        match self {
            Self::V1(v1) => v1.authorize(operation),
            Self::Key(key) => key.authorize(operation),
        }
    }
}

/// Sign an operation for the method named `did_method`.
///
/// Returns [`UnknownDidMethod`](crate::Error::UnknownDidMethod) without touching the operation when
/// the method is not supported.
pub fn sign_operation(
    operation: Value,
    key: &Ed25519Key,
    did_method: &str,
    targets: &AuthorizationTargets,
    ledger_proof: Option<&Value>,
) -> Result<Value> {
    AuthorizationChain::for_method(did_method, key.clone(), targets.clone(), ledger_proof.cloned())?
        .authorize(operation)
}
