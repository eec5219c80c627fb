//! HTTPS client for Web Ledger nodes.
//!
//! Every node publishes its ledger agent under `/ledger-agents`; the agent
//! names the service endpoints used for genesis lookup, record queries and
//! operation submission. The agent is fetched once per client and cached.

use super::{GenesisBlock, LedgerAccess, LedgerConnector, RecordEnvelope};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

const LD_JSON: &str = "application/ld+json, application/json";

/// HTTPS agent options shared by every node client.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Keep idle connections open between requests.
    pub keep_alive: bool,

    /// Refuse nodes presenting invalid TLS certificates.
    pub reject_unauthorized: bool,

    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            reject_unauthorized: false,
            request_timeout: None,
        }
    }
}

impl HttpOptions {
    /// Build a reqwest client with these options.
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(!self.reject_unauthorized)
            .user_agent(concat!("witness-maintainer/", env!("CARGO_PKG_VERSION")));

        if self.keep_alive {
            builder = builder.tcp_keepalive(Some(Duration::from_secs(60)));
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }

        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder.build()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerAgentList {
    ledger_agent: Vec<LedgerAgent>,
}

/// A ledger agent as published by a node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAgent {
    #[serde(default)]
    pub id: Option<String>,
    pub target_node: String,
    pub service: LedgerAgentServices,
}

/// Service endpoints of a ledger agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAgentServices {
    pub ledger_block_service: String,
    pub ledger_operation_service: String,
    pub ledger_query_service: String,
    #[serde(default)]
    pub ledger_config_service: Option<String>,
}

/// Client bound to a single ledger node.
pub struct WebLedgerClient {
    base: String,
    http: Client,
    agent: OnceCell<LedgerAgent>,
}

impl WebLedgerClient {
    /// Client for `https://<host>`.
    pub fn new(host: &str, http: Client) -> Self {
        Self::with_base_url(format!("https://{}", host), http)
    }

    /// Client for an explicit base URL.
    pub fn with_base_url(base: impl Into<String>, http: Client) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            http,
            agent: OnceCell::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// The node's first ledger agent.
    pub async fn ledger_agent(&self) -> Result<&LedgerAgent> {
        self.agent
            .get_or_try_init(|| async {
                let url = format!("{}/ledger-agents", self.base);
                debug!(url = %url, "Fetching ledger agents");
                let resp = self
                    .http
                    .get(&url)
                    .header(header::ACCEPT, LD_JSON)
                    .send()
                    .await?;
                let list: LedgerAgentList = check(resp).await?.json().await?;
                list.ledger_agent
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::NotFound(format!("ledger agent at {}", url)))
            })
            .await
    }
}

/// Map non-success statuses to [`Error::Ledger`].
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Ledger {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl LedgerAccess for WebLedgerClient {
    async fn genesis_block(&self) -> Result<GenesisBlock> {
        let agent = self.ledger_agent().await?;
        let url = format!(
            "{}/genesis",
            agent.service.ledger_block_service.trim_end_matches('/')
        );
        debug!(url = %url, "Fetching genesis block");
        let resp = self
            .http
            .get(&url)
            .header(header::ACCEPT, LD_JSON)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn target_node(&self) -> Result<String> {
        Ok(self.ledger_agent().await?.target_node.clone())
    }

    async fn get_record(&self, id: &str) -> Result<RecordEnvelope> {
        let agent = self.ledger_agent().await?;
        debug!(id = %id, "Querying record");
        let resp = self
            .http
            .post(&agent.service.ledger_query_service)
            .query(&[("id", id)])
            .header(header::ACCEPT, LD_JSON)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(check(resp).await?.json().await?)
    }

    async fn send_operation(&self, operation: &Value) -> Result<()> {
        let agent = self.ledger_agent().await?;
        debug!(url = %agent.service.ledger_operation_service, "Submitting operation");
        let resp = self
            .http
            .post(&agent.service.ledger_operation_service)
            .json(operation)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Connector producing [`WebLedgerClient`]s that share one HTTPS agent.
#[derive(Clone)]
pub struct WebConnector {
    http: Client,
}

impl WebConnector {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        Ok(Self {
            http: options.build_client()?,
        })
    }
}

impl LedgerConnector for WebConnector {
    fn connect(&self, host: &str) -> Result<Arc<dyn LedgerAccess>> {
        Ok(Arc::new(WebLedgerClient::new(host, self.http.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_https_and_trimmed() {
        let http = HttpOptions::default().build_client().unwrap();
        let client = WebLedgerClient::new("node.example:8443", http.clone());
        assert_eq!(client.base_url(), "https://node.example:8443");

        let client = WebLedgerClient::with_base_url("https://node.example/", http);
        assert_eq!(client.base_url(), "https://node.example");
    }

    #[test]
    fn agent_list_parses() {
        let list: LedgerAgentList = serde_json::from_value(serde_json::json!({
            "ledgerAgent": [{
                "id": "urn:uuid:agent",
                "targetNode": "z6MkNode",
                "service": {
                    "ledgerBlockService": "https://n/blocks",
                    "ledgerOperationService": "https://n/operations",
                    "ledgerQueryService": "https://n/query"
                }
            }]
        }))
        .unwrap();
        assert_eq!(list.ledger_agent[0].target_node, "z6MkNode");
        assert!(list.ledger_agent[0].service.ledger_config_service.is_none());
    }
}
