// Memorai Engine: Knowledge Graph
//
// Generic, tenant-scoped entity/relation graph. Storage sits behind the
// `GraphRepository` port:
//   repository.rs: InMemoryGraphRepository (per-tenant arena)
//   sqlite.rs: SqliteGraphRepository (durable, same semantics)
//
// Path finding enumerates simple directed paths with an iterative DFS and
// hard-stops at `max_depth` hops, at `max_paths` results, and after
// `max_expansions` pushed frames. Hitting any bound is never an error;
// `find_paths_report` exposes it as a flag.

pub mod repository;
pub mod sqlite;

pub use repository::InMemoryGraphRepository;
pub use sqlite::SqliteGraphRepository;

use crate::atoms::constants::{DEFAULT_MAX_PATHS, DEFAULT_MAX_PATH_EXPANSIONS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::graph_types::{
    GraphEntity, GraphPath, GraphRelation, GraphStats, NewRelation, PathSearch, Properties,
};
use crate::atoms::traits::GraphRepository;
use chrono::Utc;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct KnowledgeGraph {
    repo: Arc<dyn GraphRepository>,
    max_paths: usize,
    max_expansions: usize,
}

/// Clamp into [0, 1]; NaN collapses to 0.
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn require(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{} is required", field)));
    }
    Ok(())
}

impl KnowledgeGraph {
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self { repo, max_paths: DEFAULT_MAX_PATHS, max_expansions: DEFAULT_MAX_PATH_EXPANSIONS }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryGraphRepository::new()))
    }

    /// Cap on the number of paths a single search may return (minimum 1).
    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths.max(1);
        self
    }

    pub fn max_paths(&self) -> usize {
        self.max_paths
    }

    /// Cap on partial paths a single search may explore (minimum 1).
    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions.max(1);
        self
    }

    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    // ── Writes ─────────────────────────────────────────────────────────

    pub fn add_entity(
        &self,
        name: &str,
        entity_type: &str,
        properties: Properties,
        tenant_id: &str,
    ) -> EngineResult<String> {
        require("name", name)?;
        require("entity type", entity_type)?;
        require("tenant_id", tenant_id)?;

        let entity = GraphEntity {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            properties,
            tenant_id: tenant_id.to_string(),
            created_at: Utc::now(),
        };
        self.repo.insert_entity(&entity)?;
        debug!("[graph] + entity {} '{}' ({}) tenant={}", entity.id, name, entity_type, tenant_id);
        Ok(entity.id)
    }

    /// Both endpoints must exist in the relation's tenant.
    pub fn add_relation(&self, new: NewRelation) -> EngineResult<String> {
        require("tenant_id", &new.tenant_id)?;
        require("relation type", &new.relation_type)?;

        for endpoint in [&new.source_id, &new.target_id] {
            if self.repo.get_entity(&new.tenant_id, endpoint)?.is_none() {
                return Err(EngineError::not_found(format!(
                    "Entity {} does not exist in tenant {}",
                    endpoint, new.tenant_id
                )));
            }
        }

        let relation = GraphRelation {
            id: uuid::Uuid::new_v4().to_string(),
            source_entity_id: new.source_id,
            target_entity_id: new.target_id,
            relation_type: new.relation_type,
            properties: new.properties,
            weight: clamp_unit(new.weight),
            confidence: clamp_unit(new.confidence),
            tenant_id: new.tenant_id,
            created_at: Utc::now(),
        };
        self.repo.insert_relation(&relation)?;
        debug!(
            "[graph] + relation {} {} -[{}]-> {}",
            relation.id, relation.source_entity_id, relation.relation_type, relation.target_entity_id
        );
        Ok(relation.id)
    }

    pub fn remove_relation(&self, tenant_id: &str, relation_id: &str) -> EngineResult<bool> {
        self.repo.delete_relation(tenant_id, relation_id)
    }

    /// Delete an entity and every relation touching it.
    pub fn remove_entity(&self, tenant_id: &str, entity_id: &str) -> EngineResult<bool> {
        if !self.repo.delete_entity(tenant_id, entity_id)? {
            return Ok(false);
        }
        let dropped = self.repo.delete_relations_touching(tenant_id, entity_id)?;
        info!("[graph] Removed entity {} and {} relations", entity_id, dropped);
        Ok(true)
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn get_entity(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphEntity>> {
        self.repo.get_entity(tenant_id, id)
    }

    pub fn get_relation(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphRelation>> {
        self.repo.get_relation(tenant_id, id)
    }

    /// Filter a tenant's entities by exact type and/or case-insensitive name substring.
    pub fn find_entities(
        &self,
        tenant_id: &str,
        entity_type: Option<&str>,
        name_contains: Option<&str>,
    ) -> EngineResult<Vec<GraphEntity>> {
        let needle = name_contains.map(str::to_lowercase);
        Ok(self
            .repo
            .list_entities(tenant_id)?
            .into_iter()
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .filter(|e| needle.as_ref().map_or(true, |n| e.name.to_lowercase().contains(n.as_str())))
            .collect())
    }

    /// Relations touching the entity, outgoing first.
    pub fn get_relations(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>> {
        let mut rels = self.repo.relations_from(tenant_id, entity_id)?;
        let seen: HashSet<String> = rels.iter().map(|r| r.id.clone()).collect();
        rels.extend(
            self.repo
                .relations_to(tenant_id, entity_id)?
                .into_iter()
                .filter(|r| !seen.contains(&r.id)),
        );
        Ok(rels)
    }

    /// One-hop neighbours in either direction, deduplicated, never the entity itself.
    pub fn get_connected_entities(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphEntity>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for rel in self.get_relations(tenant_id, entity_id)? {
            let other = if rel.source_entity_id == entity_id {
                &rel.target_entity_id
            } else {
                &rel.source_entity_id
            };
            if other == entity_id || !seen.insert(other.clone()) {
                continue;
            }
            if let Some(entity) = self.repo.get_entity(tenant_id, other)? {
                out.push(entity);
            }
        }
        Ok(out)
    }

    pub fn stats(&self, tenant_id: &str) -> EngineResult<GraphStats> {
        self.repo.stats(tenant_id)
    }

    // ── Path finding ───────────────────────────────────────────────────

    /// Simple directed paths from `source_id` to `target_id` of at most
    /// `max_depth` hops, shortest first.
    pub fn find_paths(
        &self,
        tenant_id: &str,
        source_id: &str,
        target_id: &str,
        max_depth: usize,
    ) -> EngineResult<Vec<GraphPath>> {
        Ok(self.find_paths_report(tenant_id, source_id, target_id, max_depth)?.paths)
    }

    /// `find_paths` plus whether the depth bound, path cap or expansion
    /// budget pruned anything.
    pub fn find_paths_report(
        &self,
        tenant_id: &str,
        source_id: &str,
        target_id: &str,
        max_depth: usize,
    ) -> EngineResult<PathSearch> {
        let mut report = PathSearch::default();
        if source_id == target_id || max_depth == 0 {
            return Ok(report);
        }
        if self.repo.get_entity(tenant_id, source_id)?.is_none()
            || self.repo.get_entity(tenant_id, target_id)?.is_none()
        {
            return Ok(report);
        }

        // Adjacency is loaded lazily; entity existence is cached alongside.
        let mut adjacency: HashMap<String, Vec<GraphRelation>> = HashMap::new();
        let mut exists: HashMap<String, bool> = HashMap::new();

        struct Frame {
            node: String,
            entities: Vec<String>,
            relations: Vec<String>,
            weight: f32,
        }

        let mut stack = vec![Frame {
            node: source_id.to_string(),
            entities: vec![source_id.to_string()],
            relations: Vec::new(),
            weight: 1.0,
        }];

        'search: while let Some(frame) = stack.pop() {
            if !adjacency.contains_key(&frame.node) {
                let rels = self.repo.relations_from(tenant_id, &frame.node)?;
                adjacency.insert(frame.node.clone(), rels);
            }
            let edges = adjacency.get(&frame.node).cloned().unwrap_or_default();

            // Push in reverse so the first stored relation is explored first.
            for rel in edges.iter().rev() {
                let next = &rel.target_entity_id;
                if frame.entities.contains(next) {
                    continue;
                }
                let present = match exists.get(next) {
                    Some(p) => *p,
                    None => {
                        let p = self.repo.get_entity(tenant_id, next)?.is_some();
                        exists.insert(next.clone(), p);
                        p
                    }
                };
                if !present {
                    continue;
                }

                let mut entities = frame.entities.clone();
                entities.push(next.clone());
                let mut relations = frame.relations.clone();
                relations.push(rel.id.clone());
                let weight = frame.weight * rel.weight;

                if next == target_id {
                    if report.paths.len() >= self.max_paths {
                        report.truncated = true;
                        break 'search;
                    }
                    report.paths.push(GraphPath { entity_ids: entities, relation_ids: relations, weight });
                } else if relations.len() >= max_depth {
                    report.truncated = true;
                } else if report.expansions >= self.max_expansions {
                    report.truncated = true;
                    break 'search;
                } else {
                    report.expansions += 1;
                    stack.push(Frame { node: next.clone(), entities, relations, weight });
                }
            }
        }

        report.paths.sort_by_key(GraphPath::len);
        if report.truncated {
            debug!(
                "[graph] Path search {}→{} pruned at depth {} / cap {} / {} expansions ({} paths kept)",
                source_id, target_id, max_depth, self.max_paths, report.expansions, report.paths.len()
            );
        }
        Ok(report)
    }
}
