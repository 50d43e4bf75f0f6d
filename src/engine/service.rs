// Memorai Engine: Memory Service
//
// Business logic of the four caller-facing operations, wired over the
// core components:
//
//   remember → classify (if untyped) → embed → store → optional parent link
//   recall   → embed → tenant-filtered search → drop expired
//              → optional relationship expansion → record access
//   forget   → tenant/agent-checked lookup → delete → relationship cascade
//   context  → search → diversity filter → agent context + summary
//              → record access on the selection
//
// Transport and serialization belong to the caller (see memorai-cli).

use crate::atoms::constants::EXPANSION_HOP_DECAY;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::relationship_types::{MemoryGraphQuery, MemoryRelationship};
use crate::atoms::service_types::{ContextResponse, RecallOptions, RememberOptions, ServiceHealth};
use crate::atoms::traits::{EmbeddingProvider, RelationshipRepository, VectorStore};
use crate::atoms::types::{Memory, MemoryQuery, MemoryResult, MemoryType};
use crate::engine::config::{ContextConfig, MemoraiConfig, RecallConfig};
use crate::engine::context::ContextEngine;
use crate::engine::embedding::EmbeddingClient;
use crate::engine::memory_store::MemoryVectorStore;
use crate::engine::relationships::{MemoryRelationshipManager, SqliteRelationshipRepository};
use crate::engine::vector_store::QdrantVectorStore;
use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Query embedded by `context` when the caller supplies none.
const DEFAULT_CONTEXT_QUERY: &str = "recent conversation context";
/// `context` searches this many candidates per requested memory before filtering.
const CONTEXT_CANDIDATE_FACTOR: usize = 2;

pub struct MemoryService {
    memories: MemoryVectorStore,
    relationships: MemoryRelationshipManager,
    embedder: Arc<dyn EmbeddingProvider>,
    context: ContextEngine,
    recall_defaults: RecallConfig,
    context_defaults: ContextConfig,
}

fn require(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Same rule as the search filter: an agent sees only memories it owns.
fn agent_matches(memory: &Memory, agent_id: Option<&str>) -> bool {
    agent_id.map_or(true, |wanted| memory.agent_id.as_deref() == Some(wanted))
}

impl MemoryService {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        relationships: Arc<dyn RelationshipRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &MemoraiConfig,
    ) -> Self {
        Self {
            memories: MemoryVectorStore::new(vector_store),
            relationships: MemoryRelationshipManager::new(relationships),
            embedder,
            context: ContextEngine::new(),
            recall_defaults: config.recall.clone(),
            context_defaults: config.context.clone(),
        }
    }

    /// Qdrant + HTTP embeddings + SQLite relationships, all from config.
    pub fn from_config(config: &MemoraiConfig) -> EngineResult<Self> {
        config.validate()?;
        let db_path = config.storage.resolved_database_path();
        info!(
            "[service] Qdrant {} / collection '{}', embeddings {} ({}), db {:?}",
            config.vector.url, config.vector.collection, config.embedding.base_url, config.embedding.model, db_path
        );
        Ok(Self::new(
            Arc::new(QdrantVectorStore::new(&config.vector)),
            Arc::new(SqliteRelationshipRepository::open(&db_path)?),
            Arc::new(EmbeddingClient::new(&config.embedding)),
            config,
        ))
    }

    pub fn memories(&self) -> &MemoryVectorStore {
        &self.memories
    }

    pub fn relationships(&self) -> &MemoryRelationshipManager {
        &self.relationships
    }

    pub fn context_engine(&self) -> &ContextEngine {
        &self.context
    }

    // ── remember ───────────────────────────────────────────────────────

    pub async fn remember(
        &self,
        content: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RememberOptions,
    ) -> EngineResult<String> {
        require("content", content)?;
        require("tenant_id", tenant_id)?;
        if let Some(parent) = options.parent_id.as_deref() {
            require("parent_id", parent)?;
        }

        let (memory_type, classified_tags) = match options.memory_type {
            Some(t) => (t, Vec::new()),
            None => {
                let c = self.embedder.classify_text(content).await?;
                let t = c.category.parse::<MemoryType>().unwrap_or(MemoryType::Note);
                debug!("[service] Classified as {} ({:.2})", t, c.confidence);
                (t, c.tags)
            }
        };

        let mut memory = Memory::new(content.trim(), memory_type, tenant_id);
        if let Some(agent) = agent_id {
            memory = memory.with_agent(agent);
        }
        if let Some(i) = options.importance {
            memory = memory.with_importance(i);
        }
        if let Some(c) = options.confidence {
            memory = memory.with_confidence(c);
        }
        if let Some(w) = options.emotional_weight {
            memory = memory.with_emotional_weight(w);
        }
        if let Some(ttl) = options.ttl {
            memory = memory.with_ttl(ttl);
        }
        memory = if options.tags.is_empty() {
            memory.with_tags(classified_tags)
        } else {
            memory.with_tags(options.tags)
        };

        if let Some(parent) = options.parent_id.as_deref() {
            if self.memories.get_memories(tenant_id, &[parent.to_string()]).await?.is_empty() {
                return Err(EngineError::not_found(format!("Parent memory {} in tenant {}", parent, tenant_id)));
            }
        }

        let embedding = self.embedder.generate_embedding(&memory.content).await?;
        self.memories.store_memory(&memory, embedding).await?;
        if let Some(parent) = options.parent_id.as_deref() {
            self.relationships.create_parent_child_relationship(parent, &memory.id, tenant_id)?;
        }

        info!("[service] Remembered {} ({}) for tenant {}", memory.id, memory.memory_type, tenant_id);
        Ok(memory.id)
    }

    // ── recall ─────────────────────────────────────────────────────────

    pub async fn recall(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RecallOptions,
    ) -> EngineResult<Vec<MemoryResult>> {
        let mut results = self.search(query, tenant_id, agent_id, options).await?;
        self.record_access(&mut results).await;
        debug!("[service] Recall '{}' → {} results for tenant {}", query, results.len(), tenant_id);
        Ok(results)
    }

    /// Validated search plus expansion, without touching access counters.
    async fn search(
        &self,
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        options: RecallOptions,
    ) -> EngineResult<Vec<MemoryResult>> {
        require("query", query)?;
        require("tenant_id", tenant_id)?;
        let limit = options.limit.unwrap_or(self.recall_defaults.limit);
        if limit == 0 {
            return Err(EngineError::validation("limit must be greater than 0"));
        }
        let threshold = options.threshold.unwrap_or(self.recall_defaults.threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::validation(format!("threshold must be within 0.0–1.0 (got {})", threshold)));
        }

        let embedding = self.embedder.generate_embedding(query).await?;
        let mut q = MemoryQuery::new(query, tenant_id, limit);
        q.agent_id = agent_id.map(str::to_string);
        q.memory_type = options.memory_type;
        q.threshold = Some(threshold);

        let now = Utc::now();
        let mut results: Vec<MemoryResult> = self
            .memories
            .search_memories(&embedding, &q)
            .await?
            .into_iter()
            .filter(|r| !r.memory.is_expired(now))
            .collect();

        if options.expand_relationships.unwrap_or(self.recall_defaults.expand_relationships) {
            let depth = options.expansion_depth.unwrap_or(self.recall_defaults.expansion_depth);
            let extra = self.expand(&results, query, tenant_id, agent_id, options.memory_type, depth).await?;
            results.extend(extra);
            results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            results.truncate(limit);
        }
        Ok(results)
    }

    /// Pull in memories reachable over active relationships from each hit.
    /// Score = seed score × strength along the path × 0.9 per hop.
    async fn expand(
        &self,
        seeds: &[MemoryResult],
        query: &str,
        tenant_id: &str,
        agent_id: Option<&str>,
        memory_type: Option<MemoryType>,
        depth: usize,
    ) -> EngineResult<Vec<MemoryResult>> {
        if depth == 0 || seeds.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<&str> = seeds.iter().map(|s| s.memory.id.as_str()).collect();
        // id → (score, relationship type of the final hop)
        let mut best: HashMap<String, (f32, String)> = HashMap::new();

        for seed in seeds {
            let graph = self
                .relationships
                .build_memory_graph(&MemoryGraphQuery::new(&seed.memory.id, tenant_id, depth))?;
            let edges: HashMap<(&str, &str), &MemoryRelationship> = graph
                .edges
                .iter()
                .map(|e| ((e.source_memory_id.as_str(), e.target_memory_id.as_str()), e))
                .collect();

            for path in &graph.paths {
                let Some(target) = path.last() else { continue };
                if known.contains(target.as_str()) {
                    continue;
                }
                let mut score = seed.score;
                let mut last_type = None;
                for hop in path.windows(2) {
                    if let Some(edge) = edges.get(&(hop[0].as_str(), hop[1].as_str())) {
                        score *= edge.strength * EXPANSION_HOP_DECAY;
                        last_type = Some(edge.relationship_type);
                    }
                }
                let Some(kind) = last_type else { continue };
                let entry = best.entry(target.clone()).or_insert((f32::MIN, String::new()));
                if score > entry.0 {
                    *entry = (score, kind.as_str().to_string());
                }
            }
        }
        if best.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = best.keys().cloned().collect();
        let now = Utc::now();
        let expanded: Vec<MemoryResult> = self
            .memories
            .get_memories(tenant_id, &ids)
            .await?
            .into_iter()
            .filter(|m| !m.is_expired(now))
            .filter(|m| agent_matches(m, agent_id))
            .filter(|m| memory_type.map_or(true, |t| m.memory_type == t))
            .filter_map(|m| {
                let (score, kind) = best.get(&m.id)?.clone();
                Some(MemoryResult {
                    memory: m,
                    score,
                    relevance_reason: format!("Connected via '{}' relationship to a match for '{}'", kind, query),
                })
            })
            .collect();
        debug!("[service] Expansion added {} related memories", expanded.len());
        Ok(expanded)
    }

    /// Best effort: failures are logged and the result keeps its old counters.
    async fn record_access(&self, results: &mut [MemoryResult]) {
        let updates = join_all(results.iter().map(|r| self.memories.record_access(&r.memory))).await;
        for (result, update) in results.iter_mut().zip(updates) {
            match update {
                Ok(updated) => result.memory = updated,
                Err(e) => warn!("[service] Failed to record access for {}: {}", result.memory.id, e),
            }
        }
    }

    // ── forget ─────────────────────────────────────────────────────────

    /// Returns the number of memories removed (0 or 1).
    pub async fn forget(&self, memory_id: &str, tenant_id: &str, agent_id: Option<&str>) -> EngineResult<usize> {
        require("memory_id", memory_id)?;
        require("tenant_id", tenant_id)?;

        let ids = [memory_id.to_string()];
        let Some(memory) = self.memories.get_memories(tenant_id, &ids).await?.into_iter().next() else {
            debug!("[service] Forget: {} not found in tenant {}", memory_id, tenant_id);
            return Ok(0);
        };
        if !agent_matches(&memory, agent_id) {
            warn!("[service] Forget: {} is owned by another agent", memory_id);
            return Ok(0);
        }

        self.memories.delete_memories(tenant_id, &ids).await?;
        let dropped = self.relationships.remove_relationships_for_memory(memory_id, tenant_id)?;
        info!("[service] Forgot {} (and {} relationships) for tenant {}", memory_id, dropped, tenant_id);
        Ok(1)
    }

    // ── context ────────────────────────────────────────────────────────

    pub async fn context(
        &self,
        tenant_id: &str,
        agent_id: Option<&str>,
        max_memories: Option<usize>,
        query: Option<&str>,
    ) -> EngineResult<ContextResponse> {
        require("tenant_id", tenant_id)?;
        let max = max_memories.unwrap_or(self.context_defaults.max_memories).max(1);
        let query = query.map(str::trim).filter(|q| !q.is_empty()).unwrap_or(DEFAULT_CONTEXT_QUERY);

        // Rank on the stored access times; only the selection is stamped.
        let candidates = self
            .search(
                query,
                tenant_id,
                agent_id,
                RecallOptions {
                    limit: Some(max * CONTEXT_CANDIDATE_FACTOR),
                    threshold: Some(0.0),
                    ..Default::default()
                },
            )
            .await?;

        let mut selected = self.context.filter_contextual_memories(
            &candidates,
            max,
            self.context_defaults.importance_threshold,
        );
        let agent = self.context.generate_agent_context(&selected);
        let summary =
            self.context
                .generate_context_summary(&selected, self.context_defaults.summary_max_length, true, false);
        self.record_access(&mut selected).await;

        Ok(ContextResponse {
            context: agent.context,
            memories: selected,
            summary,
            confidence: agent.confidence,
        })
    }

    // ── health ─────────────────────────────────────────────────────────

    pub async fn health(&self) -> ServiceHealth {
        let vector_store = self.memories.get_health().await;
        ServiceHealth {
            status: vector_store.status,
            vector_store,
            embedding_model: self.embedder.model_name().to_string(),
        }
    }
}
