// Memorai Engine: Qdrant Vector Store
//
// REST client for a Qdrant collection. Implements the `VectorStore` port:
//   GET  /collections/{c}                      → existence probe
//   PUT  /collections/{c}                      → create (size, Cosine)
//   PUT  /collections/{c}/index                → keyword payload indices
//   PUT  /collections/{c}/points               → upsert
//   POST /collections/{c}/points/search        → similarity search
//   POST /collections/{c}/points               → retrieve by id
//   POST /collections/{c}/points/payload       → set payload
//   POST /collections/{c}/points/delete        → delete by filter
//   POST /collections/{c}/points/count         → exact count
//   GET  /collections                          → health
//
// Every filter carries `tenant_id`. Transient failures (429 / 5xx,
// connect errors, timeouts) are retried here with exponential backoff;
// callers only ever see the final `EngineError::Store`.

use crate::atoms::constants::{
    INDEXED_PAYLOAD_FIELDS, PAYLOAD_AGENT_ID, PAYLOAD_TENANT_ID, PAYLOAD_TYPE,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::VectorStore;
use crate::atoms::types::{PointPayload, SearchQuery, SearchResult, VectorPoint};
use crate::engine::config::VectorStoreConfig;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;

const INITIAL_RETRY_DELAY_MS: u64 = 200;
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Check if an HTTP status code should be retried.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503)
}

/// Exponential backoff for `attempt`, capped at 30s.
fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 2u64
        .checked_pow(attempt)
        .and_then(|factor| INITIAL_RETRY_DELAY_MS.checked_mul(factor))
        .unwrap_or(MAX_RETRY_DELAY_MS);
    Duration::from_millis(base_ms.min(MAX_RETRY_DELAY_MS))
}

/// Sleep with exponential backoff. Returns delay used.
async fn retry_delay(attempt: u32) -> Duration {
    let delay = backoff_delay(attempt);
    tokio::time::sleep(delay).await;
    delay
}

pub struct QdrantVectorStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    dimension: usize,
    timeout: Duration,
    max_retries: u32,
}

impl QdrantVectorStore {
    pub fn new(config: &VectorStoreConfig) -> Self {
        QdrantVectorStore {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            dimension: config.dimension,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_path(&self, suffix: &str) -> String {
        format!("/collections/{}{}", self.collection, suffix)
    }

    /// Send a request, retrying transient failures. Returns the final status and body.
    async fn send_raw(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> EngineResult<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            let mut req = self.client.request(method.clone(), &url).timeout(self.timeout);
            if let Some(ref key) = self.api_key {
                req = req.header("api-key", key);
            }
            if let Some(b) = body {
                req = req.json(b);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if is_retryable_status(status.as_u16()) && attempt < self.max_retries {
                        let delay = retry_delay(attempt).await;
                        warn!(
                            "[vector] {} {} → {} (attempt {}), retried after {:?}",
                            method, path, status, attempt + 1, delay
                        );
                        attempt += 1;
                        continue;
                    }
                    let text = resp.text().await.map_err(|e| EngineError::store(operation, e))?;
                    return Ok((status, text));
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let delay = retry_delay(attempt).await;
                    warn!(
                        "[vector] {} {} failed: {} (attempt {}), retried after {:?}",
                        method, path, e, attempt + 1, delay
                    );
                    attempt += 1;
                }
                Err(e) => return Err(EngineError::store(operation, e)),
            }
        }
    }

    /// Send a request and return the parsed JSON body of a 2xx response.
    async fn send_json(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> EngineResult<Value> {
        let (status, text) = self.send_raw(operation, method, path, body).await?;
        if !status.is_success() {
            return Err(error_from_response(operation, status, &text));
        }
        serde_json::from_str(&text).map_err(|e| EngineError::store(operation, e))
    }

    async fn collection_exists(&self) -> EngineResult<bool> {
        let (status, text) = self
            .send_raw("initialize", Method::GET, &self.collection_path(""), None)
            .await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(error_from_response("initialize", s, &text)),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn initialize(&self) -> EngineResult<()> {
        if self.collection_exists().await? {
            debug!("[vector] Collection '{}' already present", self.collection);
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": self.dimension, "distance": "Cosine" }
        });
        let (status, text) = self
            .send_raw("initialize", Method::PUT, &self.collection_path(""), Some(&body))
            .await?;
        // 409: another process created it between our probe and our PUT.
        if !status.is_success() && status != StatusCode::CONFLICT {
            return Err(error_from_response("initialize", status, &text));
        }

        for field in INDEXED_PAYLOAD_FIELDS {
            let index = json!({ "field_name": field, "field_schema": "keyword" });
            self.send_json(
                "initialize",
                Method::PUT,
                &self.collection_path("/index?wait=true"),
                Some(&index),
            )
            .await?;
        }

        info!(
            "[vector] ✓ Created collection '{}' (dim={}, cosine, {} payload indices)",
            self.collection,
            self.dimension,
            INDEXED_PAYLOAD_FIELDS.len()
        );
        Ok(())
    }

    async fn upsert(&self, points: &[VectorPoint]) -> EngineResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body = json!({
            "points": points.iter().map(|p| json!({
                "id": p.id,
                "vector": p.vector,
                "payload": p.payload,
            })).collect::<Vec<_>>()
        });
        self.send_json("upsert", Method::PUT, &self.collection_path("/points?wait=true"), Some(&body))
            .await?;
        debug!("[vector] Upserted {} points into '{}'", points.len(), self.collection);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], query: &SearchQuery) -> EngineResult<Vec<SearchResult>> {
        let mut body = json!({
            "vector": embedding,
            "limit": query.limit,
            "with_payload": true,
            "filter": search_filter(query),
        });
        if let Some(threshold) = query.score_threshold {
            body["score_threshold"] = json!(threshold);
        }

        let v = self
            .send_json("search", Method::POST, &self.collection_path("/points/search"), Some(&body))
            .await?;
        let mut results = parse_points("search", &v)?;
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn retrieve(&self, tenant_id: &str, ids: &[String]) -> EngineResult<Vec<SearchResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "ids": ids, "with_payload": true, "with_vector": false });
        let v = self
            .send_json("retrieve", Method::POST, &self.collection_path("/points"), Some(&body))
            .await?;
        Ok(parse_points("retrieve", &v)?
            .into_iter()
            .filter(|r| r.payload.tenant_id == tenant_id)
            .collect())
    }

    async fn set_payload(&self, tenant_id: &str, id: &str, patch: Map<String, Value>) -> EngineResult<()> {
        let body = json!({
            "payload": patch,
            "filter": { "must": [ { "has_id": [id] }, tenant_condition(tenant_id) ] },
        });
        self.send_json(
            "set_payload",
            Method::POST,
            &self.collection_path("/points/payload?wait=true"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, ids: &[String]) -> EngineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({
            "filter": { "must": [ { "has_id": ids }, tenant_condition(tenant_id) ] },
        });
        self.send_json(
            "delete",
            Method::POST,
            &self.collection_path("/points/delete?wait=true"),
            Some(&body),
        )
        .await?;
        debug!("[vector] Deleted up to {} points for tenant {}", ids.len(), tenant_id);
        Ok(())
    }

    async fn count(&self, tenant_id: &str) -> EngineResult<usize> {
        let body = json!({
            "filter": { "must": [ tenant_condition(tenant_id) ] },
            "exact": true,
        });
        let v = self
            .send_json("count", Method::POST, &self.collection_path("/points/count"), Some(&body))
            .await?;
        v["result"]["count"]
            .as_u64()
            .map(|c| c as usize)
            .ok_or_else(|| EngineError::store("count", "No 'result.count' in Qdrant response"))
    }

    async fn health_check(&self) -> bool {
        let v = match self.send_json("health", Method::GET, "/collections", None).await {
            Ok(v) => v,
            Err(e) => {
                warn!("[vector] Health check failed: {}", e);
                return false;
            }
        };
        v["result"]["collections"]
            .as_array()
            .map(|cols| cols.iter().any(|c| c["name"].as_str() == Some(self.collection.as_str())))
            .unwrap_or(false)
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn match_condition(key: &str, value: &str) -> Value {
    json!({ "key": key, "match": { "value": value } })
}

fn tenant_condition(tenant_id: &str) -> Value {
    match_condition(PAYLOAD_TENANT_ID, tenant_id)
}

/// Qdrant filter: tenant always, type / agent when requested.
fn search_filter(query: &SearchQuery) -> Value {
    let mut must = vec![tenant_condition(&query.tenant_id)];
    if let Some(ref t) = query.memory_type {
        must.push(match_condition(PAYLOAD_TYPE, t));
    }
    if let Some(ref a) = query.agent_id {
        must.push(match_condition(PAYLOAD_AGENT_ID, a));
    }
    json!({ "must": must })
}

/// Map a non-2xx response to a store error. Qdrant reports failures as
/// `{"status": {"error": "..."}}`; anything else is unstructured.
fn error_from_response(operation: &str, status: StatusCode, body: &str) -> EngineError {
    let structured = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["status"]["error"].as_str().map(str::to_string));
    match structured {
        Some(msg) => EngineError::store(operation, format!("{} ({})", msg, status)),
        None => {
            debug!("[vector] Unstructured {} response to {}: {:?}", status, operation, body);
            EngineError::store_unknown(operation)
        }
    }
}

/// Parse the `result` array of a search / retrieve response.
fn parse_points(operation: &str, v: &Value) -> EngineResult<Vec<SearchResult>> {
    let items = v["result"]
        .as_array()
        .ok_or_else(|| EngineError::store(operation, "No 'result' array in Qdrant response"))?;

    items
        .iter()
        .map(|item| {
            let id = match &item["id"] {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(EngineError::store(operation, format!("Unexpected point id {}", other)))
                }
            };
            let score = item["score"].as_f64().unwrap_or(0.0) as f32;
            let payload = match &item["payload"] {
                Value::Null => PointPayload::default(),
                p => serde_json::from_value(p.clone()).map_err(|e| EngineError::store(operation, e))?,
            };
            Ok(SearchResult { id, score, payload })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(200));
        assert_eq!(backoff_delay(3), Duration::from_millis(1_600));
        assert_eq!(backoff_delay(10), Duration::from_millis(MAX_RETRY_DELAY_MS));
        assert_eq!(backoff_delay(200), Duration::from_millis(MAX_RETRY_DELAY_MS));
    }

    #[test]
    fn test_search_filter_includes_optional_conditions() {
        let mut q = SearchQuery::new("acme", 5);
        let f = search_filter(&q);
        assert_eq!(f["must"].as_array().unwrap().len(), 1);
        assert_eq!(f["must"][0]["key"], "tenant_id");
        assert_eq!(f["must"][0]["match"]["value"], "acme");

        q.memory_type = Some("fact".into());
        q.agent_id = Some("bot".into());
        let f = search_filter(&q);
        let keys: Vec<&str> = f["must"].as_array().unwrap().iter().map(|c| c["key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["tenant_id", "type", "agent_id"]);
    }

    #[test]
    fn test_parse_points_normalizes_null_payload() {
        let v = json!({
            "result": [
                { "id": "b", "score": 0.5, "payload": null },
                { "id": 7, "score": 0.9, "payload": { "tenant_id": "t", "type": "fact", "content": "x" } }
            ]
        });
        let points = parse_points("search", &v).unwrap();
        assert_eq!(points[0].payload, PointPayload::default());
        assert_eq!(points[1].id, "7");
        assert_eq!(points[1].payload.memory_type.as_deref(), Some("fact"));
        assert_eq!(points[1].payload.extra["content"], "x");
    }

    #[test]
    fn test_parse_points_missing_result_is_store_error() {
        let err = parse_points("search", &json!({ "status": "ok" })).unwrap_err();
        assert!(matches!(err, EngineError::Store { .. }));
    }

    #[test]
    fn test_error_from_response_structured_and_unknown() {
        let structured = error_from_response(
            "search",
            StatusCode::BAD_REQUEST,
            r#"{"status":{"error":"Wrong input: Vector dimension error"},"time":0.001}"#,
        );
        assert!(structured.to_string().contains("Vector dimension error"));

        let unknown = error_from_response("search", StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        match unknown {
            EngineError::Store { operation, message } => {
                assert_eq!(operation, "search");
                assert_eq!(message, "Unknown error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }

    #[tokio::test]
    async fn test_health_check_unreachable_is_false() {
        let store = QdrantVectorStore::new(&VectorStoreConfig {
            url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            max_retries: 0,
            ..Default::default()
        });
        assert!(!store.health_check().await);
    }
}
