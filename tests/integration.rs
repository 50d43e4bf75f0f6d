// Memorai integration tests
//
// Exercise the public API end to end over both in-memory and SQLite
// repositories, with a deterministic word-hashing embedder standing in for
// the HTTP embedding service.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use memorai::atoms::constants::NO_CONTEXT_SENTINEL;
use memorai::atoms::graph_types::{NewRelation, Properties};
use memorai::atoms::traits::{EmbeddingProvider, GraphRepository, RelationshipRepository};
use memorai::atoms::types::TextClassification;
use memorai::engine::classifier;
use memorai::engine::graph::{InMemoryGraphRepository, SqliteGraphRepository};
use memorai::engine::memory_store::relevance_reason;
use memorai::engine::relationships::{InMemoryRelationshipRepository, SqliteRelationshipRepository};
use memorai::engine::vector_store::InMemoryVectorStore;
use memorai::{
    ContextEngine, EngineError, EngineResult, KnowledgeGraph, MemoraiConfig, Memory, MemoryRelationshipManager,
    MemoryResult, MemoryService, MemoryType, MemoryVectorStore, NewRelationship, RecallOptions, RelationshipType,
    RememberOptions,
};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const DIM: usize = 128;

struct HashingEmbedder;

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn generate_embedding(&self, text: &str) -> EngineResult<Vec<f32>> {
        let mut v = vec![0.0f32; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut h = DefaultHasher::new();
            word.to_lowercase().hash(&mut h);
            v[(h.finish() % DIM as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    async fn classify_text(&self, text: &str) -> EngineResult<TextClassification> {
        Ok(classifier::classify(text))
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }
}

fn graph_backends() -> Vec<(&'static str, KnowledgeGraph)> {
    let sqlite: Arc<dyn GraphRepository> = Arc::new(SqliteGraphRepository::open_in_memory().unwrap());
    vec![
        ("memory", KnowledgeGraph::new(Arc::new(InMemoryGraphRepository::new()))),
        ("sqlite", KnowledgeGraph::new(sqlite)),
    ]
}

fn relationship_backends() -> Vec<(&'static str, MemoryRelationshipManager)> {
    let sqlite: Arc<dyn RelationshipRepository> = Arc::new(SqliteRelationshipRepository::open_in_memory().unwrap());
    vec![
        ("memory", MemoryRelationshipManager::new(Arc::new(InMemoryRelationshipRepository::new()))),
        ("sqlite", MemoryRelationshipManager::new(sqlite)),
    ]
}

fn entity(graph: &KnowledgeGraph, name: &str, tenant: &str) -> String {
    graph.add_entity(name, "concept", Properties::default(), tenant).unwrap()
}

fn link(graph: &KnowledgeGraph, a: &str, b: &str, tenant: &str) -> String {
    graph.add_relation(NewRelation::new(a, b, "leads_to", tenant)).unwrap()
}

fn result(content: &str, t: MemoryType, score: f32, importance: f32) -> MemoryResult {
    MemoryResult {
        memory: Memory::new(content, t, "acme").with_importance(importance),
        score,
        relevance_reason: String::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Knowledge graph
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_chain_scenario_depth_bound() {
    for (name, graph) in graph_backends() {
        let ids: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|n| entity(&graph, n, "t1")).collect();
        for pair in ids.windows(2) {
            link(&graph, &pair[0], &pair[1], "t1");
        }

        assert!(graph.find_paths("t1", &ids[0], &ids[4], 2).unwrap().is_empty(), "{name}");
        assert!(graph.find_paths("t1", &ids[0], &ids[4], 3).unwrap().is_empty(), "{name}");
        let paths = graph.find_paths("t1", &ids[0], &ids[4], 4).unwrap();
        assert_eq!(paths.len(), 1, "{name}");
        assert_eq!(paths[0].entity_ids, ids, "{name}");
        assert_eq!(paths[0].len(), 4, "{name}");

        let report = graph.find_paths_report("t1", &ids[0], &ids[4], 2).unwrap();
        assert!(report.paths.is_empty() && report.truncated, "{name}");
    }
}

#[test]
fn test_paths_found_iff_shortest_within_bound() {
    for (name, graph) in graph_backends() {
        // A→B→D, A→C→E→D, A→D is absent
        let [a, b, c, d, e] = ["A", "B", "C", "D", "E"].map(|n| entity(&graph, n, "t1"));
        link(&graph, &a, &b, "t1");
        link(&graph, &b, &d, "t1");
        link(&graph, &a, &c, "t1");
        link(&graph, &c, &e, "t1");
        link(&graph, &e, &d, "t1");

        assert!(graph.find_paths("t1", &a, &d, 1).unwrap().is_empty(), "{name}");
        let two = graph.find_paths("t1", &a, &d, 2).unwrap();
        assert_eq!(two.len(), 1, "{name}");
        let three = graph.find_paths("t1", &a, &d, 3).unwrap();
        assert_eq!(three.len(), 2, "{name}");
        assert!(three[0].len() <= three[1].len(), "{name}");
    }
}

#[test]
fn test_connected_entities_exclude_self() {
    for (name, graph) in graph_backends() {
        let a = entity(&graph, "A", "t1");
        let b = entity(&graph, "B", "t1");
        link(&graph, &a, &a, "t1");
        link(&graph, &a, &b, "t1");
        link(&graph, &b, &a, "t1");

        let connected = graph.get_connected_entities("t1", &a).unwrap();
        assert_eq!(connected.len(), 1, "{name}");
        assert_eq!(connected[0].id, b, "{name}");
    }
}

#[test]
fn test_relation_to_missing_entity_is_rejected() {
    for (name, graph) in graph_backends() {
        let a = entity(&graph, "A", "t1");
        let err = graph.add_relation(NewRelation::new(&a, "missing", "knows", "t1")).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)), "{name}");
        assert!(graph.find_paths("t1", &a, "missing", 5).unwrap().is_empty(), "{name}");
        assert!(graph.find_paths("t1", "missing", &a, 5).unwrap().is_empty(), "{name}");
        assert_eq!(graph.stats("t1").unwrap().relations, 0, "{name}");
    }
}

#[test]
fn test_graph_tenant_isolation() {
    for (name, graph) in graph_backends() {
        let a = entity(&graph, "Alice", "tenant-a");
        let b = entity(&graph, "Bob", "tenant-a");
        link(&graph, &a, &b, "tenant-a");

        assert!(graph.get_entity("tenant-b", &a).unwrap().is_none(), "{name}");
        assert!(graph.find_entities("tenant-b", Some("alice"), None).unwrap().is_empty(), "{name}");
        assert!(graph.get_relations("tenant-b", &a).unwrap().is_empty(), "{name}");
        assert!(graph.get_connected_entities("tenant-b", &a).unwrap().is_empty(), "{name}");
        assert!(graph.find_paths("tenant-b", &a, &b, 3).unwrap().is_empty(), "{name}");
        assert!(graph.add_relation(NewRelation::new(&a, &b, "knows", "tenant-b")).is_err(), "{name}");
        assert!(!graph.remove_entity("tenant-b", &a).unwrap(), "{name}");

        assert_eq!(graph.find_paths("tenant-a", &a, &b, 1).unwrap().len(), 1, "{name}");
        let stats = graph.stats("tenant-b").unwrap();
        assert_eq!((stats.entities, stats.relations), (0, 0), "{name}");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Memory relationships
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_parent_child_pair_scenario() {
    for (name, mgr) in relationship_backends() {
        mgr.create_parent_child_relationship("P", "C", "t1").unwrap();

        let all: Vec<_> = ["P", "C"]
            .iter()
            .flat_map(|id| mgr.get_relationships(id, "t1").unwrap())
            .collect();
        assert_eq!(all.len(), 2, "{name}");
        assert!(all.iter().any(|r| r.source_memory_id == "P"
            && r.target_memory_id == "C"
            && r.relationship_type == RelationshipType::Parent));
        assert!(all.iter().any(|r| r.source_memory_id == "C"
            && r.target_memory_id == "P"
            && r.relationship_type == RelationshipType::Child));
        assert_eq!(mgr.relationship_stats("t1").unwrap().total, 2, "{name}");

        let h = mgr.get_memory_hierarchy("C", "t1").unwrap();
        assert_eq!(h.parents, vec!["P".to_string()], "{name}");
    }
}

#[test]
fn test_orphan_cleanup_is_tenant_scoped() {
    for (name, mgr) in relationship_backends() {
        mgr.create_relationship(NewRelationship::new("m1", "m2", RelationshipType::References, "t1")).unwrap();
        mgr.create_relationship(NewRelationship::new("m1", "gone", RelationshipType::Related, "t1")).unwrap();
        mgr.create_relationship(NewRelationship::new("gone", "m2", RelationshipType::Complements, "t1")).unwrap();
        mgr.create_relationship(NewRelationship::new("m1", "gone", RelationshipType::Related, "t2")).unwrap();

        let valid = vec!["m1".to_string(), "m2".to_string()];
        assert_eq!(mgr.cleanup_orphaned_relationships(&valid, "t1").unwrap(), 2, "{name}");
        assert_eq!(mgr.relationship_stats("t1").unwrap().total, 1, "{name}");
        assert_eq!(mgr.relationship_stats("t2").unwrap().total, 1, "{name}");
    }
}

#[test]
fn test_relationship_tenant_isolation() {
    for (name, mgr) in relationship_backends() {
        let rel = mgr
            .create_relationship(NewRelationship::new("m1", "m2", RelationshipType::Supersedes, "t1"))
            .unwrap();
        assert!(mgr.get_relationship(&rel.id, "t2").unwrap().is_none(), "{name}");
        assert!(mgr.get_relationships("m1", "t2").unwrap().is_empty(), "{name}");
        assert!(mgr.find_related_memories("m1", &[], "t2").unwrap().is_empty(), "{name}");
        assert!(!mgr.delete_relationship(&rel.id, "t2").unwrap(), "{name}");
        assert!(mgr.get_relationship(&rel.id, "t1").unwrap().is_some(), "{name}");
    }
}

#[test]
fn test_sqlite_relationships_survive_reopen() {
    let path = std::env::temp_dir().join(format!("memorai-it-{}.db", uuid::Uuid::new_v4()));
    {
        let repo = SqliteRelationshipRepository::open(&path).unwrap();
        let mgr = MemoryRelationshipManager::new(Arc::new(repo));
        mgr.create_sibling_relationship("a", "b", "t1").unwrap();
    }
    let mgr = MemoryRelationshipManager::new(Arc::new(SqliteRelationshipRepository::open(&path).unwrap()));
    assert_eq!(mgr.get_memory_hierarchy("a", "t1").unwrap().siblings, vec!["b".to_string()]);
    let _ = std::fs::remove_file(&path);
}

// ═══════════════════════════════════════════════════════════════════════════
// Vector store & ranking
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_store_memories_mismatch_fails_before_write() {
    let backend = Arc::new(InMemoryVectorStore::new(DIM));
    let store = MemoryVectorStore::new(backend.clone());
    let memories = vec![
        Memory::new("one", MemoryType::Note, "t1"),
        Memory::new("two", MemoryType::Note, "t1"),
    ];
    let err = store.store_memories(&memories, vec![vec![0.1; DIM]]).await.unwrap_err();
    assert!(err.is_validation());
    assert!(backend.is_empty());
    assert_eq!(backend.initialize_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_first_use_creates_collection_once() {
    let backend = Arc::new(InMemoryVectorStore::new(DIM));
    let store = Arc::new(MemoryVectorStore::new(backend.clone()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.get_memory_count(&format!("t{}", i % 3)).await })
        })
        .collect();
    for h in futures::future::join_all(handles).await {
        assert_eq!(h.unwrap().unwrap(), 0);
    }
    assert_eq!(backend.collections_created(), 1);
    assert_eq!(backend.initialize_calls(), 1);

    store.close().await.unwrap();
    store.get_memory_count("t1").await.unwrap();
    assert_eq!(backend.initialize_calls(), 2);
}

#[test]
fn test_relevance_wording() {
    let high = relevance_reason(0.95, "rust");
    assert!(high.contains("Highly relevant") && high.contains("excellent"));
    assert!(relevance_reason(0.6, "rust").contains("weaker"));
}

#[test]
fn test_context_summary_sentinel() {
    assert_eq!(ContextEngine::new().generate_context_summary(&[], 500, true, true), NO_CONTEXT_SENTINEL);
}

#[test]
fn test_composite_score_decreases_with_age() {
    let engine = ContextEngine::new();
    let now = Utc::now();
    let mut r = result("x", MemoryType::Fact, 0.8, 0.5);
    let mut last = f64::INFINITY;
    for days in [0, 1, 7, 30, 365] {
        r.memory.last_accessed_at = now - Duration::days(days);
        let score = engine.calculate_composite_score_at(&r, now);
        assert!(score < last, "age {} days did not lower the score", days);
        last = score;
    }
}

#[test]
fn test_filter_caps_and_diversifies() {
    let engine = ContextEngine::new();
    let types = [
        MemoryType::Fact,
        MemoryType::Task,
        MemoryType::Note,
        MemoryType::Preference,
        MemoryType::Procedure,
    ];
    let mut candidates = Vec::new();
    for (i, t) in types.iter().enumerate() {
        for j in 0..4 {
            // Facts dominate on score; diversity must still admit the rest.
            let score = if *t == MemoryType::Fact { 0.99 } else { 0.4 - 0.05 * i as f32 };
            candidates.push(result(&format!("{} {}", t, j), *t, score, 0.5));
        }
    }

    for max in [5, 7, 10] {
        let picked = engine.filter_contextual_memories(&candidates, max, 0.0);
        assert_eq!(picked.len(), max);
        let seen: HashSet<MemoryType> = picked.iter().map(|m| m.memory.memory_type).collect();
        assert_eq!(seen.len(), types.len(), "max={max}");
    }
    assert!(engine.filter_contextual_memories(&candidates, 0, 0.0).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════

fn sqlite_service() -> MemoryService {
    MemoryService::new(
        Arc::new(InMemoryVectorStore::new(DIM)),
        Arc::new(SqliteRelationshipRepository::open_in_memory().unwrap()),
        Arc::new(HashingEmbedder),
        &MemoraiConfig::default(),
    )
}

#[tokio::test]
async fn test_forget_from_other_tenant_deletes_nothing() {
    let svc = sqlite_service();
    let id = svc
        .remember("The staging database lives in eu-west-1", "acme", None, RememberOptions::default())
        .await
        .unwrap();

    assert_eq!(svc.forget(&id, "globex", None).await.unwrap(), 0);
    assert_eq!(svc.memories().get_memory_count("acme").await.unwrap(), 1);

    let hits = svc.recall("staging database", "acme", None, RecallOptions::default()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.id, id);
}

#[tokio::test]
async fn test_service_round_trip_with_hierarchy() {
    let svc = sqlite_service();
    let opts = |t: MemoryType| RememberOptions { memory_type: Some(t), ..Default::default() };

    let plan = svc.remember("Migration plan for billing service", "acme", Some("ops"), opts(MemoryType::Document)).await.unwrap();
    let step = svc
        .remember(
            "Freeze writes before cutover",
            "acme",
            Some("ops"),
            RememberOptions { parent_id: Some(plan.clone()), ..opts(MemoryType::Procedure) },
        )
        .await
        .unwrap();

    let h = svc.relationships().get_memory_hierarchy(&plan, "acme").unwrap();
    assert_eq!(h.children, vec![step.clone()]);

    let expanded = svc
        .recall(
            "billing migration plan",
            "acme",
            Some("ops"),
            RecallOptions { expand_relationships: Some(true), ..Default::default() },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = expanded.iter().map(|r| r.memory.id.as_str()).collect();
    assert_eq!(ids, vec![plan.as_str(), step.as_str()]);

    let ctx = svc.context("acme", Some("ops"), Some(5), Some("billing migration")).await.unwrap();
    assert!(!ctx.memories.is_empty());
    assert!(ctx.summary.contains("Document memories:"));

    assert_eq!(svc.forget(&plan, "acme", Some("ops")).await.unwrap(), 1);
    assert!(svc.relationships().get_memory_hierarchy(&step, "acme").unwrap().parents.is_empty());
}
