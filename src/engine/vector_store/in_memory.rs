// Memorai Engine: In-Memory Vector Store
//
// Brute-force cosine index held in process memory. Behaves like a real
// backend at the port boundary: operations before `initialize()` fail with
// a store error (no collection yet), vectors of the wrong dimension are
// rejected, and every read is tenant-filtered.

use super::{cosine_similarity, payload_matches};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::VectorStore;
use crate::atoms::types::{SearchQuery, SearchResult, VectorPoint};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct InMemoryVectorStore {
    dimension: usize,
    points: RwLock<HashMap<String, VectorPoint>>,
    collection_ready: AtomicBool,
    /// Number of `initialize()` calls that actually created the collection.
    collections_created: AtomicUsize,
    initialize_calls: AtomicUsize,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            points: RwLock::new(HashMap::new()),
            collection_ready: AtomicBool::new(false),
            collections_created: AtomicUsize::new(0),
            initialize_calls: AtomicUsize::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn collections_created(&self) -> usize {
        self.collections_created.load(Ordering::SeqCst)
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    /// Total points across every tenant.
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    fn require_collection(&self, operation: &str) -> EngineResult<()> {
        if self.collection_ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::store(operation, "Collection not found"))
        }
    }

    fn check_dimension(&self, operation: &str, vector: &[f32]) -> EngineResult<()> {
        if vector.len() != self.dimension {
            return Err(EngineError::store(
                operation,
                format!(
                    "Vector dimension error: expected dim: {}, got {}",
                    self.dimension,
                    vector.len()
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn initialize(&self) -> EngineResult<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if !self.collection_ready.swap(true, Ordering::SeqCst) {
            self.collections_created.fetch_add(1, Ordering::SeqCst);
            debug!("[vector] In-memory collection created (dim={})", self.dimension);
        }
        Ok(())
    }

    async fn upsert(&self, points: &[VectorPoint]) -> EngineResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.require_collection("upsert")?;
        for p in points {
            self.check_dimension("upsert", &p.vector)?;
        }
        let mut map = self.points.write();
        for p in points {
            map.insert(p.id.clone(), p.clone());
        }
        Ok(())
    }

    async fn search(&self, embedding: &[f32], query: &SearchQuery) -> EngineResult<Vec<SearchResult>> {
        self.require_collection("search")?;
        self.check_dimension("search", embedding)?;

        let map = self.points.read();
        let mut results: Vec<SearchResult> = map
            .values()
            .filter(|p| payload_matches(&p.payload, query))
            .map(|p| SearchResult {
                id: p.id.clone(),
                score: cosine_similarity(embedding, &p.vector) as f32,
                payload: p.payload.clone(),
            })
            .filter(|r| query.score_threshold.map_or(true, |t| r.score >= t))
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(query.limit);
        Ok(results)
    }

    async fn retrieve(&self, tenant_id: &str, ids: &[String]) -> EngineResult<Vec<SearchResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.require_collection("retrieve")?;
        let map = self.points.read();
        Ok(ids
            .iter()
            .filter_map(|id| map.get(id))
            .filter(|p| p.payload.tenant_id == tenant_id)
            .map(|p| SearchResult { id: p.id.clone(), score: 0.0, payload: p.payload.clone() })
            .collect())
    }

    async fn set_payload(&self, tenant_id: &str, id: &str, patch: Map<String, Value>) -> EngineResult<()> {
        self.require_collection("set_payload")?;
        let mut map = self.points.write();
        if let Some(point) = map.get_mut(id).filter(|p| p.payload.tenant_id == tenant_id) {
            point.payload.extra.extend(patch);
        }
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, ids: &[String]) -> EngineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.require_collection("delete")?;
        let mut map = self.points.write();
        for id in ids {
            if map.get(id).is_some_and(|p| p.payload.tenant_id == tenant_id) {
                map.remove(id);
            }
        }
        Ok(())
    }

    async fn count(&self, tenant_id: &str) -> EngineResult<usize> {
        self.require_collection("count")?;
        Ok(self.points.read().values().filter(|p| p.payload.tenant_id == tenant_id).count())
    }

    async fn health_check(&self) -> bool {
        self.collection_ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::PointPayload;

    fn point(id: &str, tenant: &str, vector: Vec<f32>) -> VectorPoint {
        VectorPoint { id: id.into(), vector, payload: PointPayload::for_tenant(tenant) }
    }

    #[tokio::test]
    async fn test_requires_initialize() {
        let store = InMemoryVectorStore::new(2);
        let err = store.count("t").await.unwrap_err();
        assert!(matches!(err, EngineError::Store { .. }));
        assert!(!store.health_check().await);

        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.collections_created(), 1);
        assert_eq!(store.initialize_calls(), 2);
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_search_sorted_and_tenant_filtered() {
        let store = InMemoryVectorStore::new(2);
        store.initialize().await.unwrap();
        store
            .upsert(&[
                point("a", "t1", vec![1.0, 0.0]),
                point("b", "t1", vec![0.7, 0.7]),
                point("c", "t2", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], &SearchQuery::new("t1", 10)).await.unwrap();
        assert_eq!(results.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(results[0].score >= results[1].score);

        let mut q = SearchQuery::new("t1", 10);
        q.score_threshold = Some(0.9);
        assert_eq!(store.search(&[1.0, 0.0], &q).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_store_error() {
        let store = InMemoryVectorStore::new(3);
        store.initialize().await.unwrap();
        let err = store.upsert(&[point("a", "t", vec![1.0])]).await.unwrap_err();
        match err {
            EngineError::Store { operation, .. } => assert_eq!(operation, "upsert"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_respects_tenant() {
        let store = InMemoryVectorStore::new(2);
        store.initialize().await.unwrap();
        store.upsert(&[point("a", "t1", vec![1.0, 0.0])]).await.unwrap();

        store.delete("t2", &["a".to_string()]).await.unwrap();
        assert_eq!(store.count("t1").await.unwrap(), 1);

        store.delete("t1", &["a".to_string()]).await.unwrap();
        assert_eq!(store.count("t1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_noops_even_before_init() {
        let store = InMemoryVectorStore::new(2);
        store.upsert(&[]).await.unwrap();
        store.delete("t", &[]).await.unwrap();
        assert!(store.retrieve("t", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_payload_merges_extension_fields() {
        let store = InMemoryVectorStore::new(2);
        store.initialize().await.unwrap();
        store.upsert(&[point("a", "t1", vec![1.0, 0.0])]).await.unwrap();

        let mut patch = Map::new();
        patch.insert("access_count".into(), Value::from(3));
        store.set_payload("t2", "a", patch.clone()).await.unwrap();
        let got = store.retrieve("t1", &["a".to_string()]).await.unwrap();
        assert!(got[0].payload.extra.get("access_count").is_none());

        store.set_payload("t1", "a", patch).await.unwrap();
        let got = store.retrieve("t1", &["a".to_string()]).await.unwrap();
        assert_eq!(got[0].payload.extra["access_count"], 3);
        assert!(store.retrieve("t2", &["a".to_string()]).await.unwrap().is_empty());
    }
}
