//! Drives the Web Ledger client and a full maintenance run against a local
//! HTTP node.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use maintainer_core::auth::proofs;
use maintainer_core::document::{apply_patch, PoolPatch};
use maintainer_core::ledger::HttpOptions;
use maintainer_core::{
    Error, KeySource, LedgerAccess, LedgerConnector, MaintainerConfig, MaintenanceOrchestrator,
    OperationKind, WebLedgerClient,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const POOL: &str = "urn:uuid:3f1e2c9a-witness-pool";
const LEDGER: &str = "did:v1:test:ledger:local";

/// A ledger whose nodes are served under `/<node>/...`.
struct FakeWebLedger {
    base: String,
    records: Mutex<HashMap<String, (Value, u64)>>,
    submitted: Mutex<Vec<Value>>,
    reject: Mutex<Option<(StatusCode, String)>>,
}

impl FakeWebLedger {
    fn node_url(&self, node: &str) -> String {
        format!("{}/{}", self.base, node)
    }

    fn submitted(&self) -> Vec<Value> {
        self.submitted.lock().unwrap().clone()
    }
}

async fn agents(State(ledger): State<Arc<FakeWebLedger>>, Path(node): Path<String>) -> Json<Value> {
    let url = ledger.node_url(&node);
    Json(json!({
        "ledgerAgent": [{
            "id": format!("urn:uuid:agent-{}", node),
            "targetNode": format!("z6Mk{}", node),
            "service": {
                "ledgerConfigService": format!("{}/config", url),
                "ledgerOperationService": format!("{}/operations", url),
                "ledgerQueryService": format!("{}/query", url),
                "ledgerBlockService": format!("{}/blocks", url),
            }
        }]
    }))
}

async fn genesis() -> Json<Value> {
    Json(json!({
        "id": "urn:uuid:genesis",
        "type": "WebLedgerConfigurationEvent",
        "event": [{
            "type": "WebLedgerConfigurationEvent",
            "ledgerConfiguration": {
                "type": "WebLedgerConfiguration",
                "ledger": LEDGER,
                "consensusMethod": "Continuity2017",
                "witnessSelectionMethod": {
                    "type": "WitnessPoolWitnessSelection",
                    "witnessPool": POOL
                }
            }
        }]
    }))
}

async fn query(
    State(ledger): State<Arc<FakeWebLedger>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let id = params.get("id").cloned().unwrap_or_default();
    match ledger.records.lock().unwrap().get(&id) {
        Some((record, sequence)) => Json(json!({
            "record": record,
            "meta": { "sequence": sequence, "created": 1_700_000_000 }
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, "NotFoundError").into_response(),
    }
}

async fn operations(State(ledger): State<Arc<FakeWebLedger>>, Json(operation): Json<Value>) -> Response {
    if let Some((status, body)) = ledger.reject.lock().unwrap().clone() {
        return (status, body).into_response();
    }

    let mut records = ledger.records.lock().unwrap();
    match operation["type"].as_str() {
        Some("CreateWebLedgerRecord") => {
            let record = operation["record"].clone();
            let id = record["id"].as_str().unwrap_or_default().to_string();
            records.insert(id, (record, 0));
        }
        Some("UpdateWebLedgerRecord") => {
            let patch: PoolPatch = match serde_json::from_value(operation["recordPatch"].clone()) {
                Ok(patch) => patch,
                Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            };
            let Some((record, sequence)) = records.get_mut(&patch.target) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            if *sequence != patch.sequence {
                return (StatusCode::CONFLICT, "sequence mismatch").into_response();
            }
            match apply_patch(record, &patch.patch) {
                Ok(patched) => *record = patched,
                Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            }
            *sequence += 1;
        }
        _ => return StatusCode::BAD_REQUEST.into_response(),
    }
    drop(records);

    ledger.submitted.lock().unwrap().push(operation);
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_ledger() -> Arc<FakeWebLedger> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let ledger = Arc::new(FakeWebLedger {
        base,
        records: Mutex::new(HashMap::new()),
        submitted: Mutex::new(Vec::new()),
        reject: Mutex::new(None),
    });

    let app = Router::new()
        .route("/:node/ledger-agents", get(agents))
        .route("/:node/blocks/genesis", get(genesis))
        .route("/:node/query", post(query))
        .route("/:node/operations", post(operations))
        .with_state(Arc::clone(&ledger));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ledger
}

/// Routes every host to its path on the local server.
struct LocalConnector {
    ledger: Arc<FakeWebLedger>,
    http: reqwest::Client,
}

impl LocalConnector {
    fn new(ledger: &Arc<FakeWebLedger>) -> Self {
        Self {
            ledger: Arc::clone(ledger),
            http: HttpOptions::default().build_client().unwrap(),
        }
    }
}

impl LedgerConnector for LocalConnector {
    fn connect(&self, host: &str) -> maintainer_core::Result<Arc<dyn LedgerAccess>> {
        Ok(Arc::new(WebLedgerClient::with_base_url(
            self.ledger.node_url(host),
            self.http.clone(),
        )))
    }
}

fn client(ledger: &Arc<FakeWebLedger>, node: &str) -> WebLedgerClient {
    WebLedgerClient::with_base_url(ledger.node_url(node), HttpOptions::default().build_client().unwrap())
}

#[tokio::test]
async fn reads_agent_and_genesis() {
    let ledger = spawn_ledger().await;
    let node = client(&ledger, "alpha");

    assert_eq!(node.target_node().await.unwrap(), "z6Mkalpha");
    let genesis = node.genesis_block().await.unwrap();
    assert_eq!(genesis.witness_pool_id().unwrap(), POOL);
    assert_eq!(genesis.ledger_id().unwrap(), LEDGER);
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let ledger = spawn_ledger().await;
    let err = client(&ledger, "alpha").get_record(POOL).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(ref id) if id == POOL));
}

#[tokio::test]
async fn rejected_operation_keeps_status_and_body() {
    let ledger = spawn_ledger().await;
    *ledger.reject.lock().unwrap() = Some((StatusCode::BAD_REQUEST, "ValidationError".into()));

    let err = client(&ledger, "alpha")
        .send_operation(&json!({ "type": "CreateWebLedgerRecord", "record": { "id": POOL } }))
        .await
        .unwrap_err();
    match err {
        Error::Ledger { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "ValidationError");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_agent_reports_status() {
    let ledger = spawn_ledger().await;
    let node = WebLedgerClient::with_base_url(
        format!("{}/alpha/nowhere", ledger.base),
        HttpOptions::default().build_client().unwrap(),
    );
    let err = node.genesis_block().await.unwrap_err();
    assert!(matches!(err, Error::Ledger { status: 404, .. }));
}

#[tokio::test]
async fn sync_creates_then_updates_over_http() {
    let ledger = spawn_ledger().await;
    let connector: Arc<dyn LedgerConnector> = Arc::new(LocalConnector::new(&ledger));

    let config = MaintainerConfig::default()
        .with_primary(vec!["alpha".into(), "beta".into(), "gamma".into(), "delta".into()])
        .with_key_source(KeySource::Seed("integration".into()));
    let first = MaintenanceOrchestrator::new(config.clone(), Arc::clone(&connector)).unwrap();

    let report = first.sync().await.unwrap();
    assert_eq!(report.kind, OperationKind::Create);
    assert_eq!(report.summary.budget.max_faults, 1);

    let created = &ledger.submitted()[0];
    assert_eq!(created["creator"], "z6Mkalpha");
    assert_eq!(
        created["record"]["primaryWitnessCandidate"],
        json!(["z6Mkalpha", "z6Mkbeta", "z6Mkgamma", "z6Mkdelta"])
    );
    assert_eq!(proofs(created).unwrap().len(), 2);

    let second = MaintenanceOrchestrator::new(
        config.with_secondary(vec!["epsilon".into()]),
        Arc::clone(&connector),
    )
    .unwrap();
    let report = second.sync().await.unwrap();
    assert_eq!(report.kind, OperationKind::Update);

    let updated = &ledger.submitted()[1];
    assert_eq!(updated["recordPatch"]["sequence"], 0);
    assert_eq!(
        updated["recordPatch"]["patch"],
        json!([{ "op": "replace", "path": "/secondaryWitnessCandidate", "value": ["z6Mkepsilon"] }])
    );

    let (record, sequence) = ledger.records.lock().unwrap().get(POOL).cloned().unwrap();
    assert_eq!(sequence, 1);
    assert_eq!(record["secondaryWitnessCandidate"], json!(["z6Mkepsilon"]));

    let err = second.sync().await.unwrap_err();
    assert!(matches!(err, Error::EmptyPatch));
}
