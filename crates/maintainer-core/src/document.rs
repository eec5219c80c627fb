//! Witness pool documents and the create/update decision.
//!
//! A pool is either absent, in which case a full record is built, or
//! present, in which case a JSON patch against the on-ledger copy is built.
//! Diffing is a pure function of two snapshots; the existing record is never
//! mutated.
//!
//! Candidate lists are replaced as whole fields. Adding one node rewrites the
//! entire list, which keeps the patch valid no matter how the ledger orders
//! array edits.

use crate::contexts::ContextSet;
use crate::did::DidMethod;
use crate::error::{Error, Result};
use crate::ledger::RecordEnvelope;
use crate::node::Topology;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type tag of witness pool records.
pub const WITNESS_POOL_TYPE: &str = "WitnessPool";

const MAXIMUM_WITNESS_COUNT: &str = "maximumWitnessCount";
const PRIMARY_WITNESS_CANDIDATE: &str = "primaryWitnessCandidate";
const SECONDARY_WITNESS_CANDIDATE: &str = "secondaryWitnessCandidate";

/// The on-ledger witness pool record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessPoolDocument {
    #[serde(rename = "@context", default, skip_serializing_if = "Value::is_null")]
    pub context: Value,

    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub controller: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_witness_count: Option<u64>,

    #[serde(default)]
    pub primary_witness_candidate: Vec<String>,

    #[serde(default)]
    pub secondary_witness_candidate: Vec<String>,
}

/// The state the pool should be in after this run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredPool {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    /// `None` leaves the current count alone on update.
    pub maximum_witness_count: Option<u64>,
}

impl DesiredPool {
    pub fn new(primary: Vec<String>, secondary: Vec<String>) -> Self {
        Self {
            primary,
            secondary,
            maximum_witness_count: None,
        }
    }

    #[must_use]
    pub fn with_maximum_witness_count(mut self, count: u64) -> Self {
        self.maximum_witness_count = Some(count);
        self
    }

    /// Candidate lists in topology order.
    pub fn from_topology(topology: &Topology, maximum_witness_count: Option<u64>) -> Self {
        Self {
            primary: topology.primary_candidates(),
            secondary: topology.secondary_candidates(),
            maximum_witness_count,
        }
    }
}

/// RFC 6902 operation kinds the builder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

/// One JSON patch entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn add(field: &str, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: pointer(field),
            value: Some(value),
        }
    }

    pub fn replace(field: &str, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: pointer(field),
            value: Some(value),
        }
    }

    pub fn remove(field: &str) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: pointer(field),
            value: None,
        }
    }

    /// Top-level field named by `path`.
    fn field(&self) -> Result<String> {
        let token = self
            .path
            .strip_prefix('/')
            .filter(|t| !t.is_empty() && !t.contains('/'))
            .ok_or_else(|| Error::InvalidPatch(format!("unsupported patch path {:?}", self.path)))?;
        Ok(token.replace("~1", "/").replace("~0", "~"))
    }
}

fn pointer(field: &str) -> String {
    format!("/{}", field.replace('~', "~0").replace('/', "~1"))
}

/// An update patch targeting a specific record sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPatch {
    #[serde(rename = "@context")]
    pub context: Value,
    pub target: String,
    pub sequence: u64,
    pub patch: Vec<PatchOp>,
}

/// Minimal patch taking `existing` to `desired`.
///
/// Only fields the maintainer owns are compared. A missing field is added,
/// a differing one replaced. The count is compared only when one was asked
/// for, so `None` never touches it and `Some(0)` sets it to zero.
pub fn diff(existing: &Value, desired: &DesiredPool) -> Vec<PatchOp> {
    let empty = Map::new();
    let current = existing.as_object().unwrap_or(&empty);
    let mut patch = Vec::new();

    let mut compare = |field: &str, wanted: Value| match current.get(field) {
        None => patch.push(PatchOp::add(field, wanted)),
        Some(have) if *have != wanted => patch.push(PatchOp::replace(field, wanted)),
        Some(_) => {}
    };

    if let Some(count) = desired.maximum_witness_count {
        match current.get(MAXIMUM_WITNESS_COUNT) {
            Some(have) if same_count(have, count) => {}
            _ => compare(MAXIMUM_WITNESS_COUNT, Value::from(count)),
        }
    }
    compare(PRIMARY_WITNESS_CANDIDATE, Value::from(desired.primary.clone()));
    compare(SECONDARY_WITNESS_CANDIDATE, Value::from(desired.secondary.clone()));

    patch
}

// Stored counts may come back as floats; 5.0 is still 5.
fn same_count(have: &Value, count: u64) -> bool {
    match have.as_u64() {
        Some(have) => have == count,
        None => have.is_f64() && have.as_f64() == Some(count as f64),
    }
}

/// Apply top-level patch entries to a copy of `document`.
pub fn apply_patch(document: &Value, patch: &[PatchOp]) -> Result<Value> {
    let mut object = document
        .as_object()
        .cloned()
        .ok_or_else(|| Error::InvalidPatch("patch target is not a JSON object".into()))?;

    for entry in patch {
        let field = entry.field()?;
        match entry.op {
            PatchOpKind::Add => {
                let value = entry.value.clone().unwrap_or(Value::Null);
                object.insert(field, value);
            }
            PatchOpKind::Replace => {
                if !object.contains_key(&field) {
                    return Err(Error::InvalidPatch(format!("cannot replace missing field {}", field)));
                }
                let value = entry.value.clone().unwrap_or(Value::Null);
                object.insert(field, value);
            }
            PatchOpKind::Remove => {
                if object.remove(&field).is_none() {
                    return Err(Error::InvalidPatch(format!("cannot remove missing field {}", field)));
                }
            }
        }
    }

    Ok(Value::Object(object))
}

/// Builds create records and update patches for one identity method.
#[derive(Debug, Clone)]
pub struct PoolDocumentBuilder {
    contexts: ContextSet,
    method: DidMethod,
}

impl PoolDocumentBuilder {
    pub fn new(contexts: ContextSet, method: DidMethod) -> Self {
        Self { contexts, method }
    }

    pub fn method(&self) -> DidMethod {
        self.method
    }

    /// Full record for a pool that does not exist yet.
    pub fn create(&self, pool_id: &str, controller: &str, desired: &DesiredPool) -> WitnessPoolDocument {
        WitnessPoolDocument {
            context: Value::from(self.contexts.record_contexts(self.method)),
            id: pool_id.to_string(),
            kind: WITNESS_POOL_TYPE.to_string(),
            controller: controller.to_string(),
            maximum_witness_count: desired.maximum_witness_count,
            primary_witness_candidate: desired.primary.clone(),
            secondary_witness_candidate: desired.secondary.clone(),
        }
    }

    /// Patch moving an existing record to the desired state.
    ///
    /// Fails with [`Error::EmptyPatch`] when nothing would change.
    pub fn update(&self, existing: &RecordEnvelope, desired: &DesiredPool) -> Result<PoolPatch> {
        let target = existing
            .record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedRecord("existing witness pool has no id".into()))?
            .to_string();

        let patch = diff(&existing.record, desired);
        if patch.is_empty() {
            return Err(Error::EmptyPatch);
        }

        Ok(PoolPatch {
            context: self.contexts.patch_context(self.method),
            target,
            sequence: existing.meta.sequence,
            patch,
        })
    }
}
