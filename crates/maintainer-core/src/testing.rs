//! In-memory ledger used by unit tests.

use crate::document::{apply_patch, PoolPatch};
use crate::error::{Error, Result};
use crate::ledger::{GenesisBlock, LedgerAccess, LedgerConnector, RecordEnvelope, RecordMeta};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LEDGER_ID: &str = "did:v1:test:ledger:fake";

pub fn genesis_for(pool_id: Option<&str>) -> GenesisBlock {
    let mut config = json!({ "ledger": LEDGER_ID, "consensusMethod": "Continuity2017" });
    if let Some(pool_id) = pool_id {
        config["witnessSelectionMethod"] = json!({
            "type": "WitnessPoolWitnessSelection",
            "witnessPool": pool_id,
        });
    }
    serde_json::from_value(json!({
        "type": "WebLedgerConfigurationEvent",
        "event": [{ "type": "WebLedgerConfigurationEvent", "ledgerConfiguration": config }]
    }))
    .expect("valid genesis")
}

/// Shared ledger state behind every fake node.
pub struct FakeLedger {
    genesis: GenesisBlock,
    records: Mutex<HashMap<String, RecordEnvelope>>,
    submitted: Mutex<Vec<Value>>,
    reject: Mutex<Option<(u16, String)>>,
    read_failure: Mutex<Option<u16>>,
}

impl FakeLedger {
    pub fn new(pool_id: &str) -> Self {
        Self::with_genesis(genesis_for(Some(pool_id)))
    }

    pub fn with_genesis(genesis: GenesisBlock) -> Self {
        Self {
            genesis,
            records: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            reject: Mutex::new(None),
            read_failure: Mutex::new(None),
        }
    }

    pub fn insert_record(&self, record: Value, sequence: u64) {
        let id = record["id"].as_str().expect("record id").to_string();
        self.records.lock().unwrap().insert(
            id,
            RecordEnvelope {
                record,
                meta: RecordMeta {
                    sequence,
                    extra: Map::new(),
                },
            },
        );
    }

    pub fn record(&self, id: &str) -> Option<RecordEnvelope> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn submitted(&self) -> Vec<Value> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn reject_submissions(&self, status: u16, body: &str) {
        *self.reject.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn fail_reads(&self, status: u16) {
        *self.read_failure.lock().unwrap() = Some(status);
    }

    fn apply(&self, operation: &Value) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        match operation["type"].as_str() {
            Some("CreateWebLedgerRecord") => {
                let record = operation["record"].clone();
                let id = record["id"].as_str().unwrap_or_default().to_string();
                if records.contains_key(&id) {
                    return Err(Error::Ledger {
                        status: 409,
                        body: "duplicate record".into(),
                    });
                }
                records.insert(
                    id,
                    RecordEnvelope {
                        record,
                        meta: RecordMeta {
                            sequence: 0,
                            extra: Map::new(),
                        },
                    },
                );
            }
            Some("UpdateWebLedgerRecord") => {
                let patch: PoolPatch = serde_json::from_value(operation["recordPatch"].clone())?;
                let current = records
                    .get_mut(&patch.target)
                    .ok_or_else(|| Error::NotFound(patch.target.clone()))?;
                if current.meta.sequence != patch.sequence {
                    return Err(Error::Ledger {
                        status: 409,
                        body: "sequence conflict".into(),
                    });
                }
                current.record = apply_patch(&current.record, &patch.patch)?;
                current.meta.sequence += 1;
            }
            other => {
                return Err(Error::Ledger {
                    status: 400,
                    body: format!("unknown operation type {:?}", other),
                })
            }
        }
        Ok(())
    }
}

struct FakeNodeClient {
    host: String,
    ledger: Arc<FakeLedger>,
    delay: Option<Duration>,
    fail: bool,
}

#[async_trait]
impl LedgerAccess for FakeNodeClient {
    async fn genesis_block(&self) -> Result<GenesisBlock> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Ledger {
                status: 503,
                body: format!("{} unavailable", self.host),
            });
        }
        Ok(self.ledger.genesis.clone())
    }

    async fn target_node(&self) -> Result<String> {
        Ok(format!("node:{}", self.host))
    }

    async fn get_record(&self, id: &str) -> Result<RecordEnvelope> {
        if let Some(status) = *self.ledger.read_failure.lock().unwrap() {
            return Err(Error::Ledger {
                status,
                body: "read failed".into(),
            });
        }
        self.ledger
            .record(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn send_operation(&self, operation: &Value) -> Result<()> {
        if let Some((status, body)) = self.ledger.reject.lock().unwrap().clone() {
            return Err(Error::Ledger { status, body });
        }
        self.ledger.apply(operation)?;
        self.ledger.submitted.lock().unwrap().push(operation.clone());
        Ok(())
    }
}

/// Connector handing out fake clients over one [`FakeLedger`].
pub struct FakeConnector {
    ledger: Arc<FakeLedger>,
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    connections: AtomicUsize,
}

impl FakeConnector {
    pub fn new(pool_id: &str) -> Self {
        Self::with_ledger(Arc::new(FakeLedger::new(pool_id)))
    }

    pub fn with_ledger(ledger: Arc<FakeLedger>) -> Self {
        Self {
            ledger,
            delays: HashMap::new(),
            failures: HashSet::new(),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(host.to_string(), delay);
        self
    }

    pub fn with_failure(mut self, host: &str) -> Self {
        self.failures.insert(host.to_string());
        self
    }

    /// Number of clients created so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl LedgerConnector for FakeConnector {
    fn connect(&self, host: &str) -> Result<Arc<dyn LedgerAccess>> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeNodeClient {
            host: host.to_string(),
            ledger: Arc::clone(&self.ledger),
            delay: self.delays.get(host).copied(),
            fail: self.failures.contains(host),
        }))
    }
}
