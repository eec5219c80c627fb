//! JSON-LD context URLs used by records, patches and ledger operations.
//!
//! The set is an explicit value handed to the document builder and the
//! authorization chain, so tests and alternative ledgers can swap URLs
//! without touching any global state.

use crate::did::DidMethod;
use serde_json::{json, Value};

pub const DID_CONTEXT_URL: &str = "https://www.w3.org/ns/did/v1";
pub const VERES_ONE_CONTEXT_V1_URL: &str = "https://w3id.org/veres-one/v1";
pub const WEB_LEDGER_CONTEXT_V1_URL: &str = "https://w3id.org/webledger/v1";
pub const ED25519_2020_CONTEXT_V1_URL: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
pub const ZCAP_CONTEXT_V1_URL: &str = "https://w3id.org/zcap/v1";
pub const JSON_LD_PATCH_CONTEXT_V1_URL: &str = "https://w3id.org/json-ld-patch/v1";

/// Context URLs for every document shape the engine produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSet {
    pub did: String,
    pub veres_one: String,
    pub web_ledger: String,
    pub ed25519_2020: String,
    pub zcap: String,
    pub json_ld_patch: String,
}

impl Default for ContextSet {
    fn default() -> Self {
        Self {
            did: DID_CONTEXT_URL.to_string(),
            veres_one: VERES_ONE_CONTEXT_V1_URL.to_string(),
            web_ledger: WEB_LEDGER_CONTEXT_V1_URL.to_string(),
            ed25519_2020: ED25519_2020_CONTEXT_V1_URL.to_string(),
            zcap: ZCAP_CONTEXT_V1_URL.to_string(),
            json_ld_patch: JSON_LD_PATCH_CONTEXT_V1_URL.to_string(),
        }
    }
}

impl ContextSet {
    /// Contexts for the witness pool record itself.
    ///
    /// `v1` pools carry the Veres One vocabulary; `key` pools do not.
    pub fn record_contexts(&self, method: DidMethod) -> Vec<String> {
        match method {
            DidMethod::V1 => vec![
                self.did.clone(),
                self.veres_one.clone(),
                self.web_ledger.clone(),
                self.ed25519_2020.clone(),
            ],
            DidMethod::Key => vec![
                self.did.clone(),
                self.web_ledger.clone(),
                self.ed25519_2020.clone(),
            ],
        }
    }

    /// Context for a JSON-LD patch whose values are pool record fragments.
    pub fn patch_context(&self, method: DidMethod) -> Value {
        json!([
            self.json_ld_patch,
            {
                "value": {
                    "@id": "jldp:value",
                    "@context": self.record_contexts(method),
                }
            }
        ])
    }

    /// Contexts for the ledger operation envelope.
    pub fn operation_contexts(&self) -> Vec<String> {
        vec![
            self.web_ledger.clone(),
            self.zcap.clone(),
            self.ed25519_2020.clone(),
        ]
    }
}
