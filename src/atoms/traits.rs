// ── Memorai Atoms: Port Traits ─────────────────────────────────────────────
//
// Every external collaborator sits behind one of these traits so business
// logic never talks to Qdrant, SQLite, or an HTTP embedding service directly:
//
//   VectorStore:            embedding index (async, out-of-process I/O)
//   EmbeddingProvider:      text → vector, text → category
//   GraphRepository:        entity / relation tables for KnowledgeGraph
//   RelationshipRepository: relationship table for MemoryRelationshipManager
//
// Repositories are synchronous: graph and relationship work is CPU-only and
// must not suspend. Implementations must be internally synchronized.

use crate::atoms::error::EngineResult;
use crate::atoms::graph_types::{GraphEntity, GraphRelation, GraphStats};
use crate::atoms::relationship_types::MemoryRelationship;
use crate::atoms::types::{SearchQuery, SearchResult, TextClassification, VectorPoint};
use async_trait::async_trait;
use serde_json::{Map, Value};

// ── Vector index ───────────────────────────────────────────────────────────

/// Tenant-filtered contract over an external embedding index.
///
/// Every fallible method wraps backend failures in `EngineError::Store`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection and payload indices if absent. Idempotent.
    async fn initialize(&self) -> EngineResult<()>;

    /// Bulk write. Empty input is a no-op.
    async fn upsert(&self, points: &[VectorPoint]) -> EngineResult<()>;

    /// Similarity search, highest score first, always filtered by tenant.
    async fn search(&self, embedding: &[f32], query: &SearchQuery) -> EngineResult<Vec<SearchResult>>;

    /// Fetch points by id; points owned by another tenant are dropped.
    /// Returned scores are 0.0.
    async fn retrieve(&self, tenant_id: &str, ids: &[String]) -> EngineResult<Vec<SearchResult>>;

    /// Merge `patch` into the extension fields of one tenant-owned point.
    async fn set_payload(&self, tenant_id: &str, id: &str, patch: Map<String, Value>) -> EngineResult<()>;

    /// Delete tenant-owned points by id. Empty input is a no-op.
    async fn delete(&self, tenant_id: &str, ids: &[String]) -> EngineResult<()>;

    async fn count(&self, tenant_id: &str) -> EngineResult<usize>;

    /// Never fails: `false` on any error, `true` only if the collection exists.
    async fn health_check(&self) -> bool;

    /// Release any held connection. Default: nothing to release.
    async fn close(&self) -> EngineResult<()> {
        Ok(())
    }
}

// ── Embedding provider ─────────────────────────────────────────────────────

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> EngineResult<Vec<f32>>;

    async fn classify_text(&self, text: &str) -> EngineResult<TextClassification>;

    fn model_name(&self) -> &str;
}

// ── Graph storage ──────────────────────────────────────────────────────────

pub trait GraphRepository: Send + Sync {
    fn insert_entity(&self, entity: &GraphEntity) -> EngineResult<()>;
    fn get_entity(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphEntity>>;
    fn list_entities(&self, tenant_id: &str) -> EngineResult<Vec<GraphEntity>>;
    /// Returns false when the entity did not exist. Does not touch relations.
    fn delete_entity(&self, tenant_id: &str, id: &str) -> EngineResult<bool>;

    fn insert_relation(&self, relation: &GraphRelation) -> EngineResult<()>;
    fn get_relation(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphRelation>>;
    fn delete_relation(&self, tenant_id: &str, id: &str) -> EngineResult<bool>;
    fn relations_from(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>>;
    fn relations_to(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>>;
    /// Remove every relation with `entity_id` at either end. Returns the count.
    fn delete_relations_touching(&self, tenant_id: &str, entity_id: &str) -> EngineResult<usize>;

    fn stats(&self, tenant_id: &str) -> EngineResult<GraphStats>;
}

// ── Relationship storage ───────────────────────────────────────────────────

pub trait RelationshipRepository: Send + Sync {
    fn insert(&self, relationship: &MemoryRelationship) -> EngineResult<()>;
    /// Write both records of a bidirectional link as one unit.
    fn insert_pair(&self, first: &MemoryRelationship, second: &MemoryRelationship) -> EngineResult<()>;
    fn get(&self, tenant_id: &str, id: &str) -> EngineResult<Option<MemoryRelationship>>;
    /// Replace an existing record. Returns false when it did not exist.
    fn update(&self, relationship: &MemoryRelationship) -> EngineResult<bool>;
    fn delete(&self, tenant_id: &str, id: &str) -> EngineResult<bool>;
    fn delete_many(&self, tenant_id: &str, ids: &[String]) -> EngineResult<usize>;
    /// Relationships whose source is `memory_id`, active or not.
    fn outgoing(&self, tenant_id: &str, memory_id: &str) -> EngineResult<Vec<MemoryRelationship>>;
    /// Relationships whose target is `memory_id`, active or not.
    fn incoming(&self, tenant_id: &str, memory_id: &str) -> EngineResult<Vec<MemoryRelationship>>;
    fn list_for_tenant(&self, tenant_id: &str) -> EngineResult<Vec<MemoryRelationship>>;
}
