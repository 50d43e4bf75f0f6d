// Memorai Engine: Memory Vector Store
//
// Domain adapter between `Memory` records and vector points. Owns the
// one-time collection bootstrap: every public method goes through
// `ensure_initialized()`, which runs the port's `initialize()` exactly once
// even when many callers race on first use.
//
// Payload layout:
//   typed fields  → tenant_id, type, agent_id, created_at (indexed subset)
//   extension bag → content, confidence, importance, timestamps, tags, …
// Reads tolerate missing extension fields so older points still load.

use crate::atoms::constants::{RELEVANCE_HIGH, RELEVANCE_MODERATE, RELEVANCE_STRONG};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::VectorStore;
use crate::atoms::types::{
    HealthReport, Memory, MemoryQuery, MemoryResult, MemoryType, PointPayload, SearchResult,
    VectorPoint,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MemoryVectorStore {
    store: Arc<dyn VectorStore>,
    initialized: Mutex<bool>,
}

impl MemoryVectorStore {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store, initialized: Mutex::new(false) }
    }

    /// Run the port's `initialize()` once. The lock is held across the call,
    /// so concurrent first callers wait instead of initializing again. A
    /// failure leaves the flag unset and the next call retries.
    async fn ensure_initialized(&self) -> EngineResult<()> {
        let mut ready = self.initialized.lock().await;
        if !*ready {
            self.store.initialize().await?;
            *ready = true;
            info!("[memory] Vector collection ready");
        }
        Ok(())
    }

    pub async fn store_memory(&self, memory: &Memory, embedding: Vec<f32>) -> EngineResult<()> {
        self.ensure_initialized().await?;
        self.store.upsert(&[memory_to_point(memory, embedding)]).await?;
        debug!("[memory] Stored {} ({}) for tenant {}", memory.id, memory.memory_type, memory.tenant_id);
        Ok(())
    }

    /// Batch write. Shape is checked before initialization or any write.
    pub async fn store_memories(&self, memories: &[Memory], embeddings: Vec<Vec<f32>>) -> EngineResult<()> {
        if memories.len() != embeddings.len() {
            return Err(EngineError::validation(format!(
                "Memories and embeddings arrays must have the same length ({} vs {})",
                memories.len(),
                embeddings.len()
            )));
        }
        if memories.is_empty() {
            return Ok(());
        }
        self.ensure_initialized().await?;

        let points: Vec<VectorPoint> = memories
            .iter()
            .zip(embeddings)
            .map(|(m, e)| memory_to_point(m, e))
            .collect();
        self.store.upsert(&points).await?;
        debug!("[memory] Stored batch of {}", points.len());
        Ok(())
    }

    pub async fn search_memories(&self, embedding: &[f32], query: &MemoryQuery) -> EngineResult<Vec<MemoryResult>> {
        if query.tenant_id.trim().is_empty() {
            return Err(EngineError::validation("tenant_id is required"));
        }
        self.ensure_initialized().await?;

        let hits = self.store.search(embedding, &query.to_search_query()).await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let score = hit.score;
                MemoryResult {
                    memory: memory_from_result(hit),
                    score,
                    relevance_reason: relevance_reason(score, &query.query),
                }
            })
            .collect())
    }

    /// Fetch memories by id. Ids owned by another tenant are silently absent.
    pub async fn get_memories(&self, tenant_id: &str, ids: &[String]) -> EngineResult<Vec<Memory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_initialized().await?;
        Ok(self
            .store
            .retrieve(tenant_id, ids)
            .await?
            .into_iter()
            .map(memory_from_result)
            .collect())
    }

    /// Bump the access counter and stamp `last_accessed_at`. Returns the updated record.
    pub async fn record_access(&self, memory: &Memory) -> EngineResult<Memory> {
        self.record_access_at(memory, Utc::now()).await
    }

    pub async fn record_access_at(&self, memory: &Memory, now: DateTime<Utc>) -> EngineResult<Memory> {
        self.ensure_initialized().await?;
        let mut updated = memory.clone();
        updated.access_count = updated.access_count.saturating_add(1);
        updated.last_accessed_at = now;

        let mut patch = Map::new();
        patch.insert("access_count".into(), json!(updated.access_count));
        patch.insert("last_accessed_at".into(), json!(now.to_rfc3339()));
        self.store.set_payload(&memory.tenant_id, &memory.id, patch).await?;
        Ok(updated)
    }

    pub async fn delete_memories(&self, tenant_id: &str, ids: &[String]) -> EngineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.ensure_initialized().await?;
        self.store.delete(tenant_id, ids).await?;
        debug!("[memory] Deleted {} ids for tenant {}", ids.len(), tenant_id);
        Ok(())
    }

    pub async fn get_memory_count(&self, tenant_id: &str) -> EngineResult<usize> {
        self.ensure_initialized().await?;
        self.store.count(tenant_id).await
    }

    /// Never fails: initialization errors are reported in the health record.
    pub async fn get_health(&self) -> HealthReport {
        if let Err(e) = self.ensure_initialized().await {
            warn!("[memory] Health: initialization failed: {}", e);
            return HealthReport::unhealthy(Some(e.to_string()));
        }
        if self.store.health_check().await {
            HealthReport::healthy()
        } else {
            HealthReport::unhealthy(Some("Vector store health check failed".into()))
        }
    }

    /// Release the port. The next call initializes again.
    pub async fn close(&self) -> EngineResult<()> {
        let mut ready = self.initialized.lock().await;
        self.store.close().await?;
        *ready = false;
        info!("[memory] Vector store closed");
        Ok(())
    }
}

// ── Relevance explanations ─────────────────────────────────────────────────

pub fn relevance_reason(score: f32, query: &str) -> String {
    if score >= RELEVANCE_HIGH {
        format!("Highly relevant to '{}' - excellent semantic match", query)
    } else if score >= RELEVANCE_STRONG {
        format!("Strong relevance to '{}' - good semantic similarity", query)
    } else if score >= RELEVANCE_MODERATE {
        format!("Moderately relevant to '{}' - decent semantic overlap", query)
    } else {
        format!("Some relevance to '{}' - weaker semantic connection", query)
    }
}

// ── Payload mapping ────────────────────────────────────────────────────────

pub(crate) fn memory_to_point(memory: &Memory, embedding: Vec<f32>) -> VectorPoint {
    let mut extra = Map::new();
    extra.insert("content".into(), json!(memory.content));
    extra.insert("confidence".into(), json!(memory.confidence));
    extra.insert("importance".into(), json!(memory.importance));
    extra.insert("updated_at".into(), json!(memory.updated_at.to_rfc3339()));
    extra.insert("last_accessed_at".into(), json!(memory.last_accessed_at.to_rfc3339()));
    extra.insert("access_count".into(), json!(memory.access_count));
    extra.insert("tags".into(), json!(memory.tags));
    if let Some(w) = memory.emotional_weight {
        extra.insert("emotional_weight".into(), json!(w));
    }
    if let Some(ttl) = memory.ttl {
        extra.insert("ttl".into(), json!(ttl.to_rfc3339()));
    }

    VectorPoint {
        id: memory.id.clone(),
        vector: embedding,
        payload: PointPayload {
            tenant_id: memory.tenant_id.clone(),
            memory_type: Some(memory.memory_type.as_str().to_string()),
            agent_id: memory.agent_id.clone(),
            created_at: Some(memory.created_at.to_rfc3339()),
            extra,
        },
    }
}

fn memory_from_result(result: SearchResult) -> Memory {
    memory_from_payload(result.id, result.payload)
}

/// Rebuild a `Memory` from a point payload. Missing numeric fields take
/// defaults; missing timestamps fall back to `created_at`, then to now.
pub(crate) fn memory_from_payload(id: String, payload: PointPayload) -> Memory {
    let extra = &payload.extra;
    let created_at = payload.created_at.as_deref().and_then(parse_time).unwrap_or_else(Utc::now);
    let time_field = |key: &str| extra.get(key).and_then(Value::as_str).and_then(parse_time);
    let f32_field = |key: &str| extra.get(key).and_then(Value::as_f64).map(|v| v as f32);

    let memory_type = payload
        .memory_type
        .as_deref()
        .and_then(|t| t.parse::<MemoryType>().ok())
        .unwrap_or(MemoryType::Note);

    let tags: BTreeSet<String> = extra
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Memory {
        id,
        content: extra.get("content").and_then(Value::as_str).unwrap_or_default().to_string(),
        memory_type,
        confidence: f32_field("confidence").unwrap_or(1.0),
        importance: f32_field("importance").unwrap_or(0.5),
        created_at,
        updated_at: time_field("updated_at").unwrap_or(created_at),
        last_accessed_at: time_field("last_accessed_at").unwrap_or(created_at),
        access_count: extra.get("access_count").and_then(Value::as_u64).unwrap_or(0),
        tags,
        tenant_id: payload.tenant_id,
        agent_id: payload.agent_id,
        emotional_weight: f32_field("emotional_weight"),
        ttl: time_field("ttl"),
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}
