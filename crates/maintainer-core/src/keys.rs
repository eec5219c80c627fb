//! Maintainer key material and the DID it is published under.
//!
//! Key material comes from a seed phrase (hashed with SHA-256 into an
//! Ed25519 seed), an `Ed25519VerificationKey2020` key file, or a fresh random
//! key. The identity method decides the DID built around it.

use crate::auth::Ed25519Signer;
use crate::did::DidMethod;
use crate::error::{Error, Result};
use crate::multibase;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Verification relationships a key can be selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    Authentication,
    AssertionMethod,
    CapabilityInvocation,
    CapabilityDelegation,
}

impl KeyPurpose {
    pub const ALL: [KeyPurpose; 4] = [
        Self::Authentication,
        Self::AssertionMethod,
        Self::CapabilityInvocation,
        Self::CapabilityDelegation,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::AssertionMethod => "assertionMethod",
            Self::CapabilityInvocation => "capabilityInvocation",
            Self::CapabilityDelegation => "capabilityDelegation",
        }
    }
}

/// Where the maintainer key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeySource {
    /// Secret phrase, hashed into a 32 byte seed.
    Seed(String),
    /// Path to an `Ed25519VerificationKey2020` JSON key file.
    KeyFile(PathBuf),
    /// Fresh random key for this run.
    #[default]
    Generate,
}

/// An Ed25519 verification method with its private half.
#[derive(Clone)]
pub struct Ed25519Key {
    id: String,
    controller: String,
    signing: SigningKey,
}

impl Ed25519Key {
    pub fn new(id: impl Into<String>, controller: impl Into<String>, signing: SigningKey) -> Self {
        Self {
            id: id.into(),
            controller: controller.into(),
            signing,
        }
    }

    /// Verification method id (`<did>#<fingerprint>`).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// `z6Mk...` multibase fingerprint of the public key.
    pub fn fingerprint(&self) -> String {
        multibase::ed25519_fingerprint(self.signing.verifying_key().as_bytes())
    }

    /// A signer bound to this key.
    pub fn signer(&self) -> Ed25519Signer {
        Ed25519Signer::new(self.id.clone(), self.signing.clone())
    }

    /// Public verification method description.
    pub fn to_verification_method(&self) -> Value {
        json!({
            "id": self.id,
            "type": "Ed25519VerificationKey2020",
            "controller": self.controller,
            "publicKeyMultibase": self.fingerprint(),
        })
    }
}

impl std::fmt::Debug for Ed25519Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Key")
            .field("id", &self.id)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

/// A DID document and the private keys behind it.
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    did: String,
    keys: HashMap<KeyPurpose, Ed25519Key>,
}

impl SigningIdentity {
    /// Identity that uses one key for every purpose.
    pub fn single_key(did: impl Into<String>, key: Ed25519Key) -> Self {
        let keys = KeyPurpose::ALL.iter().map(|p| (*p, key.clone())).collect();
        Self {
            did: did.into(),
            keys,
        }
    }

    /// The controller DID.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Key registered for `purpose`.
    pub fn method_for(&self, purpose: KeyPurpose) -> Result<&Ed25519Key> {
        self.keys
            .get(&purpose)
            .ok_or_else(|| Error::Key(format!("{} has no {} key", self.did, purpose.as_str())))
    }

    /// Public DID document.
    pub fn did_document(&self) -> Value {
        let mut doc = json!({ "id": self.did });
        for purpose in KeyPurpose::ALL {
            if let Some(key) = self.keys.get(&purpose) {
                doc[purpose.as_str()] = json!([key.to_verification_method()]);
            }
        }
        doc
    }
}

/// Resolve the maintainer's signing identity.
///
/// `veres_mode` only matters for `v1`: `live` yields `did:v1:nym:...`,
/// anything else the test network prefix `did:v1:test:nym:...`.
pub fn resolve_signing_key(source: &KeySource, method: DidMethod, veres_mode: &str) -> Result<SigningIdentity> {
    let signing = load_signing_key(source)?;
    let fingerprint = multibase::ed25519_fingerprint(signing.verifying_key().as_bytes());

    let did = match method {
        DidMethod::Key => format!("did:key:{}", fingerprint),
        DidMethod::V1 if veres_mode.eq_ignore_ascii_case("live") => format!("did:v1:nym:{}", fingerprint),
        DidMethod::V1 => format!("did:v1:test:nym:{}", fingerprint),
    };

    let key = Ed25519Key::new(format!("{}#{}", did, fingerprint), did.clone(), signing);
    Ok(SigningIdentity::single_key(did, key))
}

fn load_signing_key(source: &KeySource) -> Result<SigningKey> {
    match source {
        KeySource::Seed(phrase) => Ok(signing_key_from_seed(phrase)),
        KeySource::KeyFile(path) => load_key_file(path),
        KeySource::Generate => Ok(SigningKey::generate(&mut OsRng)),
    }
}

/// Derive a key from a secret phrase: `seed = SHA-256(phrase)`.
pub fn signing_key_from_seed(phrase: &str) -> SigningKey {
    let seed: [u8; 32] = Sha256::digest(phrase.as_bytes()).into();
    SigningKey::from_bytes(&seed)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyFile {
    #[serde(default)]
    public_key_multibase: Option<String>,
    private_key_multibase: String,
}

fn load_key_file(path: &Path) -> Result<SigningKey> {
    let raw = std::fs::read_to_string(path)?;
    let file: KeyFile = serde_json::from_str(&raw)?;

    let decoded = multibase::decode(&file.private_key_multibase)?;
    let material = decoded
        .strip_prefix(&multibase::ED25519_PRIV_HEADER[..])
        .unwrap_or(&decoded);
    // 32 byte seed, optionally followed by the public key
    if material.len() != 32 && material.len() != 64 {
        return Err(Error::Key(format!(
            "expected 32 or 64 bytes of private key material, got {}",
            material.len()
        )));
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&material[..32]);
    let signing = SigningKey::from_bytes(&seed);

    if let Some(public) = file.public_key_multibase {
        let expected = multibase::ed25519_fingerprint(signing.verifying_key().as_bytes());
        if public != expected {
            return Err(Error::Key("publicKeyMultibase does not match private key".into()));
        }
    }

    Ok(signing)
}
