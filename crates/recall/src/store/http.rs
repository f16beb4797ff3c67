//! HTTP-backed memory store clients
//!
//! Talks JSON to an external similarity-search/rule service. Each tier gets
//! its own client with an independently configured endpoint, optional API
//! key, and per-call timeout. Wire shapes:
//!
//! - `POST {endpoint}/query {"query", "limit"}` -> `{"records": [...]}`
//! - `POST {endpoint}/records {record}` -> `{"id": "..."}`
//! - `DELETE {endpoint}/records` -> `{"removed": n}`
//! - `GET {endpoint}/rules` -> `{"rules": [...]}`
//! - `PUT {endpoint}/rules {rule}` -> `{"id": "..."}`
//! - `DELETE {endpoint}/rules` -> `{"removed": n}`

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::TierConfig;
use crate::error::{RecallError, Result};
use crate::memory::types::{MemoryRecord, MemoryTier, Rule};
use crate::store::{MemoryStore, RuleStore};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<MemoryRecord>,
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ClearResponse {
    removed: u64,
}

#[derive(Debug, Deserialize)]
struct RulesResponse {
    rules: Vec<Rule>,
}

/// Shared HTTP transport for one tier endpoint
#[derive(Debug, Clone)]
struct TierTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    tier: MemoryTier,
}

impl TierTransport {
    fn new(tier: MemoryTier, config: &TierConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(env::var(var).map_err(|_| {
                RecallError::Config(format!(
                    "API key env var '{var}' for {tier} tier not set"
                ))
            })?),
            None => None,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Store(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            tier,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {key}")),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RecallError::Store(format!("{} tier: {e}", self.tier)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RecallError::Store(format!(
                "{} tier returned {status}: {body}",
                self.tier
            )));
        }

        Ok(response)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(&self, response: Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| RecallError::Store(format!("{} tier reply: {e}", self.tier)))
    }
}

/// HTTP client for a similarity-search memory tier
#[derive(Debug, Clone)]
pub struct HttpMemoryStore {
    transport: TierTransport,
}

impl HttpMemoryStore {
    /// Create a client for `tier` from its configuration
    pub fn new(tier: MemoryTier, config: &TierConfig) -> Result<Self> {
        Ok(Self {
            transport: TierTransport::new(tier, config)?,
        })
    }
}

#[async_trait]
impl MemoryStore for HttpMemoryStore {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let request = self
            .transport
            .client
            .post(self.transport.url("query"))
            .json(&QueryRequest { query, limit });

        let response = self.transport.send(request).await?;
        let reply: QueryResponse = self.transport.decode(response).await?;
        debug!(
            tier = %self.transport.tier,
            count = reply.records.len(),
            "retrieved records"
        );
        Ok(reply.records)
    }

    async fn store(&self, record: &MemoryRecord) -> Result<Uuid> {
        let request = self
            .transport
            .client
            .post(self.transport.url("records"))
            .json(record);

        let response = self.transport.send(request).await?;
        let reply: StoreResponse = self.transport.decode(response).await?;
        debug!(tier = %self.transport.tier, id = %reply.id, "stored record");
        Ok(reply.id)
    }

    async fn clear(&self) -> Result<u64> {
        let request = self.transport.client.delete(self.transport.url("records"));
        let response = self.transport.send(request).await?;
        let reply: ClearResponse = self.transport.decode(response).await?;
        Ok(reply.removed)
    }

    fn tier(&self) -> MemoryTier {
        self.transport.tier
    }
}

/// HTTP client for the procedural rule store
#[derive(Debug, Clone)]
pub struct HttpRuleStore {
    transport: TierTransport,
}

impl HttpRuleStore {
    /// Create a rule store client from its configuration
    pub fn new(config: &TierConfig) -> Result<Self> {
        Ok(Self {
            transport: TierTransport::new(MemoryTier::Procedural, config)?,
        })
    }
}

#[async_trait]
impl RuleStore for HttpRuleStore {
    async fn active_rules(&self) -> Result<Vec<Rule>> {
        let request = self.transport.client.get(self.transport.url("rules"));
        let response = self.transport.send(request).await?;
        let reply: RulesResponse = self.transport.decode(response).await?;
        Ok(reply.rules.into_iter().filter(|r| r.active).collect())
    }

    async fn upsert_rule(&self, rule: &Rule) -> Result<Uuid> {
        let request = self
            .transport
            .client
            .put(self.transport.url("rules"))
            .json(rule);

        let response = self.transport.send(request).await?;
        let reply: StoreResponse = self.transport.decode(response).await?;
        debug!(id = %reply.id, "upserted rule");
        Ok(reply.id)
    }

    async fn clear(&self) -> Result<u64> {
        let request = self.transport.client.delete(self.transport.url("rules"));
        let response = self.transport.send(request).await?;
        let reply: ClearResponse = self.transport.decode(response).await?;
        Ok(reply.removed)
    }
}
