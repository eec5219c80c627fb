//! Capability invocation proofs.
//!
//! A proof names a root capability, the `write` action and the concrete
//! target it is invoked against. Operations carry one proof per layer:
//!
//! - **ledger write**: root `urn:zcap:root:<ledger>`, target `<ledger>/records`
//! - **pool write**: root `urn:zcap:root:<pool>`, target `<pool>`
//!
//! Proofs are `Ed25519Signature2020` objects. Each one signs
//! `SHA-256(proof options) || SHA-256(document without proof)` over a
//! key-sorted compact JSON encoding, so stacking proofs never invalidates
//! earlier ones.

pub mod chain;

pub use chain::{
    sign_operation, AuthorizationChain, AuthorizationTargets, Authorize, KeyAuthorizer, V1Authorizer,
};

use crate::error::{Error, Result};
use crate::keys::Ed25519Key;
use crate::multibase;
use chrono::{SecondsFormat, Utc};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub const ED25519_SIGNATURE_2020: &str = "Ed25519Signature2020";
pub const CAPABILITY_INVOCATION: &str = "capabilityInvocation";
pub const WRITE_ACTION: &str = "write";

const ROOT_CAPABILITY_PREFIX: &str = "urn:zcap:root:";

/// Root capability URN for a resource id.
pub fn root_capability(id: &str) -> String {
    format!("{}{}", ROOT_CAPABILITY_PREFIX, encode_uri_component(id))
}

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// What a proof authorizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInvocation {
    pub capability: String,
    pub action: String,
    pub invocation_target: String,
}

impl CapabilityInvocation {
    /// Permission to write records to the ledger.
    pub fn ledger_write(ledger_id: &str) -> Self {
        Self {
            capability: root_capability(ledger_id),
            action: WRITE_ACTION.to_string(),
            invocation_target: format!("{}/records", ledger_id),
        }
    }

    /// Permission to write the witness pool document.
    pub fn pool_write(witness_pool_id: &str) -> Self {
        Self {
            capability: root_capability(witness_pool_id),
            action: WRITE_ACTION.to_string(),
            invocation_target: witness_pool_id.to_string(),
        }
    }
}

/// Produces raw signature bytes for a verification method.
pub trait InvocationSigner: Send + Sync {
    /// Verification method the signature can be checked against.
    fn verification_method(&self) -> &str;

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Ed25519 signer for one verification method.
#[derive(Clone)]
pub struct Ed25519Signer {
    id: String,
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(id: impl Into<String>, key: SigningKey) -> Self {
        Self { id: id.into(), key }
    }
}

impl InvocationSigner for Ed25519Signer {
    fn verification_method(&self) -> &str {
        &self.id
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .key
            .try_sign(data)
            .map_err(|e| Error::Signing(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// A capability invocation proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub kind: String,
    pub created: String,
    pub verification_method: String,
    pub proof_purpose: String,
    pub capability: String,
    pub capability_action: String,
    pub invocation_target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}

impl Proof {
    /// Unsigned proof options for an invocation.
    pub fn options(invocation: &CapabilityInvocation, verification_method: &str) -> Self {
        Self {
            kind: ED25519_SIGNATURE_2020.to_string(),
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            verification_method: verification_method.to_string(),
            proof_purpose: CAPABILITY_INVOCATION.to_string(),
            capability: invocation.capability.clone(),
            capability_action: invocation.action.clone(),
            invocation_target: invocation.invocation_target.clone(),
            proof_value: None,
        }
    }

    /// Whether this proof invokes `invocation`.
    pub fn invokes(&self, invocation: &CapabilityInvocation) -> bool {
        self.proof_purpose == CAPABILITY_INVOCATION
            && self.capability == invocation.capability
            && self.capability_action == invocation.action
            && self.invocation_target == invocation.invocation_target
    }
}

/// Key-sorted compact JSON.
pub fn canonicalize(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Bytes a proof signs over.
pub fn signing_input(document: &Value, options: &Proof) -> Result<Vec<u8>> {
    let mut unsigned = document.clone();
    if let Some(map) = unsigned.as_object_mut() {
        map.remove("proof");
    }
    let mut options = options.clone();
    options.proof_value = None;

    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(&Sha256::digest(canonicalize(&serde_json::to_value(&options)?)?.as_bytes()));
    input.extend_from_slice(&Sha256::digest(canonicalize(&unsigned)?.as_bytes()));
    Ok(input)
}

/// Sign `document` and return the completed proof.
pub fn create_proof(
    document: &Value,
    invocation: &CapabilityInvocation,
    signer: &dyn InvocationSigner,
) -> Result<Proof> {
    let mut proof = Proof::options(invocation, signer.verification_method());
    let signature = signer.sign(&signing_input(document, &proof)?)?;
    proof.proof_value = Some(multibase::encode(&signature));
    Ok(proof)
}

/// Append a proof, turning a single proof into an array.
pub fn add_proof(document: Value, proof: Value) -> Result<Value> {
    let mut map: Map<String, Value> = match document {
        Value::Object(map) => map,
        _ => return Err(Error::Signing("only JSON objects can carry proofs".into())),
    };

    let combined = match map.remove("proof") {
        None => proof,
        Some(Value::Array(mut proofs)) => {
            proofs.push(proof);
            Value::Array(proofs)
        }
        Some(existing) => Value::Array(vec![existing, proof]),
    };
    map.insert("proof".into(), combined);
    Ok(Value::Object(map))
}

/// Proofs attached to a document, in order.
pub fn proofs(document: &Value) -> Result<Vec<Proof>> {
    match document.get("proof") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|p| serde_json::from_value(p.clone()).map_err(Error::from))
            .collect(),
        Some(single) => Ok(vec![serde_json::from_value(single.clone())?]),
    }
}

/// Check a proof's signature against a public key.
pub fn verify_proof(document: &Value, proof: &Proof, key: &VerifyingKey) -> Result<bool> {
    let value = proof
        .proof_value
        .as_deref()
        .ok_or_else(|| Error::Signing("proof has no proofValue".into()))?;
    let bytes = multibase::decode(value)?;
    let signature = Signature::from_slice(&bytes).map_err(|e| Error::Signing(e.to_string()))?;
    Ok(key.verify(&signing_input(document, proof)?, &signature).is_ok())
}

/// Generic linked data signature suite driven by a key.
pub struct Ed25519Signature2020 {
    signer: Ed25519Signer,
}

impl Ed25519Signature2020 {
    pub fn new(key: &Ed25519Key) -> Self {
        Self { signer: key.signer() }
    }
}

/// Proof purpose for invoking one capability.
#[derive(Debug, Clone)]
pub struct CapabilityInvocationPurpose {
    pub invocation: CapabilityInvocation,
}

impl CapabilityInvocationPurpose {
    pub fn new(invocation: CapabilityInvocation) -> Self {
        Self { invocation }
    }
}

/// Sign a document with a suite and purpose, appending the proof.
pub fn sign(document: Value, suite: &Ed25519Signature2020, purpose: &CapabilityInvocationPurpose) -> Result<Value> {
    let proof = create_proof(&document, &purpose.invocation, &suite.signer)?;
    add_proof(document, serde_json::to_value(proof)?)
}

/// Veres One proof routine: signs with the given signer directly.
pub fn attach_invocation_proof(
    operation: Value,
    invocation: &CapabilityInvocation,
    signer: &dyn InvocationSigner,
) -> Result<Value> {
    let proof = create_proof(&operation, invocation, signer)?;
    add_proof(operation, serde_json::to_value(proof)?)
}
