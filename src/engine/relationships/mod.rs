// Memorai Engine: Memory Relationship Manager
//
// Typed, directed links between memory ids. Storage sits behind the
// `RelationshipRepository` port:
//   repository.rs: InMemoryRelationshipRepository
//   sqlite.rs: SqliteRelationshipRepository
//
// Bidirectional concepts are two records written in one repository call:
//   parent→child "parent"  +  child→parent "child"
//   a→b "sibling"          +  b→a "sibling"
// Hierarchy queries read both directions, so a lone record from older
// data still answers correctly.

pub mod repository;
pub mod sqlite;

pub use repository::InMemoryRelationshipRepository;
pub use sqlite::SqliteRelationshipRepository;

use crate::atoms::constants::DEFAULT_RELATIONSHIP_STRENGTH;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::relationship_types::{
    MemoryGraph, MemoryGraphQuery, MemoryHierarchy, MemoryRelationship, NewRelationship,
    RelationshipStats, RelationshipType, RelationshipUpdate,
};
use crate::atoms::traits::RelationshipRepository;
use chrono::Utc;
use log::{debug, info};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub struct MemoryRelationshipManager {
    repo: Arc<dyn RelationshipRepository>,
}

fn require(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn check_strength(strength: f32) -> EngineResult<()> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(EngineError::validation(format!(
            "Relationship strength must be within 0.0–1.0 (got {})",
            strength
        )));
    }
    Ok(())
}

/// Append `id` unless already present; keeps first-seen order.
fn push_unique(list: &mut Vec<String>, seen: &mut HashSet<String>, id: &str) {
    if seen.insert(id.to_string()) {
        list.push(id.to_string());
    }
}

impl MemoryRelationshipManager {
    pub fn new(repo: Arc<dyn RelationshipRepository>) -> Self {
        Self { repo }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRelationshipRepository::new()))
    }

    /// Validate and materialize a record without writing it.
    fn build(&self, new: NewRelationship) -> EngineResult<MemoryRelationship> {
        require("source_memory_id", &new.source_memory_id)?;
        require("target_memory_id", &new.target_memory_id)?;
        require("tenant_id", &new.tenant_id)?;
        let strength = new.strength.unwrap_or(DEFAULT_RELATIONSHIP_STRENGTH);
        check_strength(strength)?;

        let now = Utc::now();
        Ok(MemoryRelationship {
            id: uuid::Uuid::new_v4().to_string(),
            source_memory_id: new.source_memory_id,
            target_memory_id: new.target_memory_id,
            relationship_type: new.relationship_type,
            strength,
            is_active: new.is_active.unwrap_or(true),
            tenant_id: new.tenant_id,
            note: new.note,
            created_at: now,
            updated_at: now,
        })
    }

    // ── Writes ─────────────────────────────────────────────────────────

    pub fn create_relationship(&self, new: NewRelationship) -> EngineResult<MemoryRelationship> {
        let rel = self.build(new)?;
        self.repo.insert(&rel)?;
        debug!(
            "[relations] + {} {} -[{}]-> {}",
            rel.id, rel.source_memory_id, rel.relationship_type, rel.target_memory_id
        );
        Ok(rel)
    }

    fn create_pair(&self, first: NewRelationship, second: NewRelationship) -> EngineResult<(MemoryRelationship, MemoryRelationship)> {
        let a = self.build(first)?;
        let b = self.build(second)?;
        self.repo.insert_pair(&a, &b)?;
        debug!(
            "[relations] + pair {} <-[{}/{}]-> {}",
            a.source_memory_id, a.relationship_type, b.relationship_type, a.target_memory_id
        );
        Ok((a, b))
    }

    /// Writes `parent→child "parent"` and `child→parent "child"` together.
    pub fn create_parent_child_relationship(
        &self,
        parent_id: &str,
        child_id: &str,
        tenant_id: &str,
    ) -> EngineResult<(MemoryRelationship, MemoryRelationship)> {
        self.create_pair(
            NewRelationship::new(parent_id, child_id, RelationshipType::Parent, tenant_id),
            NewRelationship::new(child_id, parent_id, RelationshipType::Child, tenant_id),
        )
    }

    pub fn create_sibling_relationship(
        &self,
        a: &str,
        b: &str,
        tenant_id: &str,
    ) -> EngineResult<(MemoryRelationship, MemoryRelationship)> {
        self.create_pair(
            NewRelationship::new(a, b, RelationshipType::Sibling, tenant_id),
            NewRelationship::new(b, a, RelationshipType::Sibling, tenant_id),
        )
    }

    /// Apply a partial update. Returns the new record, or `None` when absent.
    pub fn update_relationship(
        &self,
        id: &str,
        tenant_id: &str,
        update: RelationshipUpdate,
    ) -> EngineResult<Option<MemoryRelationship>> {
        if let Some(s) = update.strength {
            check_strength(s)?;
        }
        let Some(mut rel) = self.repo.get(tenant_id, id)? else {
            return Ok(None);
        };
        if let Some(s) = update.strength {
            rel.strength = s;
        }
        if let Some(active) = update.is_active {
            rel.is_active = active;
        }
        if update.note.is_some() {
            rel.note = update.note;
        }
        rel.updated_at = Utc::now();
        Ok(self.repo.update(&rel)?.then_some(rel))
    }

    pub fn delete_relationship(&self, id: &str, tenant_id: &str) -> EngineResult<bool> {
        self.repo.delete(tenant_id, id)
    }

    /// Drop every record with `memory_id` at either end.
    pub fn remove_relationships_for_memory(&self, memory_id: &str, tenant_id: &str) -> EngineResult<usize> {
        let mut ids: Vec<String> = self.repo.outgoing(tenant_id, memory_id)?.into_iter().map(|r| r.id).collect();
        ids.extend(self.repo.incoming(tenant_id, memory_id)?.into_iter().map(|r| r.id));
        ids.sort();
        ids.dedup();
        let removed = self.repo.delete_many(tenant_id, &ids)?;
        if removed > 0 {
            debug!("[relations] Removed {} relationships of {}", removed, memory_id);
        }
        Ok(removed)
    }

    /// Remove records whose source or target is not in `valid_ids`. Other tenants are untouched.
    pub fn cleanup_orphaned_relationships(&self, valid_ids: &[String], tenant_id: &str) -> EngineResult<usize> {
        let valid: HashSet<&str> = valid_ids.iter().map(String::as_str).collect();
        let orphans: Vec<String> = self
            .repo
            .list_for_tenant(tenant_id)?
            .into_iter()
            .filter(|r| !valid.contains(r.source_memory_id.as_str()) || !valid.contains(r.target_memory_id.as_str()))
            .map(|r| r.id)
            .collect();
        let removed = self.repo.delete_many(tenant_id, &orphans)?;
        if removed > 0 {
            info!("[relations] Cleaned up {} orphaned relationships for tenant {}", removed, tenant_id);
        }
        Ok(removed)
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn get_relationship(&self, id: &str, tenant_id: &str) -> EngineResult<Option<MemoryRelationship>> {
        self.repo.get(tenant_id, id)
    }

    /// Outgoing relationships, active or not.
    pub fn get_relationships(&self, memory_id: &str, tenant_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        self.repo.outgoing(tenant_id, memory_id)
    }

    pub fn get_incoming_relationships(&self, memory_id: &str, tenant_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        self.repo.incoming(tenant_id, memory_id)
    }

    /// Distinct targets of active outgoing links. An empty `types` slice matches any type.
    pub fn find_related_memories(
        &self,
        memory_id: &str,
        types: &[RelationshipType],
        tenant_id: &str,
    ) -> EngineResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for rel in self.repo.outgoing(tenant_id, memory_id)? {
            if rel.is_active && (types.is_empty() || types.contains(&rel.relationship_type)) {
                push_unique(&mut out, &mut seen, &rel.target_memory_id);
            }
        }
        Ok(out)
    }

    /// Breadth-first expansion over active links from `start_memory_id`.
    pub fn build_memory_graph(&self, query: &MemoryGraphQuery) -> EngineResult<MemoryGraph> {
        let mut graph = MemoryGraph::default();
        let mut parent: HashMap<String, String> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut edge_ids: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::new();

        graph.depths.insert(query.start_memory_id.clone(), 0);
        queue.push_back(query.start_memory_id.clone());

        while let Some(node) = queue.pop_front() {
            let depth = graph.depths.get(&node).copied().unwrap_or(0);
            if depth >= query.max_depth {
                continue;
            }
            for rel in self.repo.outgoing(&query.tenant_id, &node)? {
                if !rel.is_active {
                    continue;
                }
                if let Some(ref allowed) = query.relationship_types {
                    if !allowed.contains(&rel.relationship_type) {
                        continue;
                    }
                }
                let next = rel.target_memory_id.clone();
                if edge_ids.insert(rel.id.clone()) {
                    graph.edges.push(rel);
                }
                if !graph.depths.contains_key(&next) {
                    graph.depths.insert(next.clone(), depth + 1);
                    parent.insert(next.clone(), node.clone());
                    order.push(next.clone());
                    queue.push_back(next);
                }
            }
        }

        for reached in &order {
            let mut path = vec![reached.clone()];
            let mut cursor = reached;
            while let Some(p) = parent.get(cursor) {
                path.push(p.clone());
                cursor = p;
            }
            path.reverse();
            graph.paths.push(path);
        }

        graph.statistics.total_edges = graph.edges.len();
        graph.statistics.total_nodes = graph.depths.len();
        graph.statistics.max_depth_reached = graph.depths.values().copied().max().unwrap_or(0);
        Ok(graph)
    }

    /// Parents, children and siblings from active links in either direction.
    pub fn get_memory_hierarchy(&self, memory_id: &str, tenant_id: &str) -> EngineResult<MemoryHierarchy> {
        let mut h = MemoryHierarchy::default();
        let (mut sp, mut sc, mut ss) = (HashSet::new(), HashSet::new(), HashSet::new());

        // An incoming link reads as its inverse from this memory's side.
        let outgoing = self.repo.outgoing(tenant_id, memory_id)?.into_iter().filter(|r| r.is_active);
        let incoming = self.repo.incoming(tenant_id, memory_id)?.into_iter().filter(|r| r.is_active);
        let links = outgoing
            .map(|r| (r.relationship_type, r.target_memory_id))
            .chain(incoming.map(|r| (r.relationship_type.inverse(), r.source_memory_id)));

        for (kind, other) in links {
            match kind {
                RelationshipType::Parent => push_unique(&mut h.children, &mut sc, &other),
                RelationshipType::Child => push_unique(&mut h.parents, &mut sp, &other),
                RelationshipType::Sibling => push_unique(&mut h.siblings, &mut ss, &other),
                _ => {}
            }
        }
        Ok(h)
    }

    pub fn find_memory_conflicts(&self, tenant_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        Ok(self
            .repo
            .list_for_tenant(tenant_id)?
            .into_iter()
            .filter(|r| r.is_active && r.relationship_type == RelationshipType::Conflicts)
            .collect())
    }

    pub fn relationship_stats(&self, tenant_id: &str) -> EngineResult<RelationshipStats> {
        let mut stats = RelationshipStats::default();
        for rel in self.repo.list_for_tenant(tenant_id)? {
            stats.total += 1;
            if rel.is_active {
                stats.active += 1;
            }
            *stats.by_type.entry(rel.relationship_type.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn managers() -> Vec<MemoryRelationshipManager> {
        vec![
            MemoryRelationshipManager::in_memory(),
            MemoryRelationshipManager::new(Arc::new(SqliteRelationshipRepository::open_in_memory().unwrap())),
        ]
    }

    fn rel(m: &MemoryRelationshipManager, a: &str, b: &str, t: RelationshipType, tenant: &str) -> MemoryRelationship {
        m.create_relationship(NewRelationship::new(a, b, t, tenant)).unwrap()
    }

    #[test]
    fn test_create_defaults_and_validation() {
        for m in managers() {
            let r = rel(&m, "a", "b", RelationshipType::References, "t");
            assert_eq!(r.strength, 1.0);
            assert!(r.is_active);

            let err = m
                .create_relationship(NewRelationship::new("a", "b", RelationshipType::Related, "t").with_strength(1.5))
                .unwrap_err();
            assert!(err.is_validation());
            assert!(m.create_relationship(NewRelationship::new("", "b", RelationshipType::Related, "t")).is_err());

            // Self-loops are allowed.
            rel(&m, "a", "a", RelationshipType::Related, "t");
            assert_eq!(m.get_relationships("a", "t").unwrap().len(), 2);

            let noted = m
                .create_relationship(
                    NewRelationship::new("b", "c", RelationshipType::Supersedes, "t").with_note("v2 replaces v1"),
                )
                .unwrap();
            let stored = m.get_relationship(&noted.id, "t").unwrap().unwrap();
            assert_eq!(stored.note.as_deref(), Some("v2 replaces v1"));
        }
    }

    #[test]
    fn test_parent_child_pair() {
        for m in managers() {
            m.create_parent_child_relationship("P", "C", "t").unwrap();

            let out_p = m.get_relationships("P", "t").unwrap();
            assert_eq!(out_p.len(), 1);
            assert_eq!(out_p[0].relationship_type, RelationshipType::Parent);
            assert_eq!(out_p[0].target_memory_id, "C");

            let out_c = m.get_relationships("C", "t").unwrap();
            assert_eq!(out_c[0].relationship_type, RelationshipType::Child);
            assert_eq!(out_c[0].target_memory_id, "P");

            let h = m.get_memory_hierarchy("C", "t").unwrap();
            assert_eq!(h.parents, vec!["P"]);
            assert!(h.children.is_empty());
            assert_eq!(m.get_memory_hierarchy("P", "t").unwrap().children, vec!["C"]);
        }
    }

    #[test]
    fn test_hierarchy_reads_single_record_both_ways() {
        let m = MemoryRelationshipManager::in_memory();
        rel(&m, "P", "C", RelationshipType::Parent, "t");
        rel(&m, "S", "C", RelationshipType::Sibling, "t");
        let h = m.get_memory_hierarchy("C", "t").unwrap();
        assert_eq!(h.parents, vec!["P"]);
        assert_eq!(h.siblings, vec!["S"]);
    }

    #[test]
    fn test_find_related_active_only_and_type_filtered() {
        for m in managers() {
            rel(&m, "a", "b", RelationshipType::References, "t");
            rel(&m, "a", "b", RelationshipType::Complements, "t");
            rel(&m, "a", "c", RelationshipType::Conflicts, "t");
            m.create_relationship(NewRelationship::new("a", "d", RelationshipType::References, "t").inactive())
                .unwrap();

            assert_eq!(m.find_related_memories("a", &[], "t").unwrap(), vec!["b", "c"]);
            assert_eq!(
                m.find_related_memories("a", &[RelationshipType::Conflicts], "t").unwrap(),
                vec!["c"]
            );
            assert!(m.find_related_memories("a", &[], "other").unwrap().is_empty());
        }
    }

    #[test]
    fn test_build_memory_graph_bounded() {
        for m in managers() {
            rel(&m, "a", "b", RelationshipType::References, "t");
            rel(&m, "b", "c", RelationshipType::References, "t");
            rel(&m, "c", "d", RelationshipType::References, "t");
            rel(&m, "c", "a", RelationshipType::References, "t");
            rel(&m, "a", "x", RelationshipType::Conflicts, "t");

            let g = m.build_memory_graph(&MemoryGraphQuery::new("a", "t", 2)).unwrap();
            assert_eq!(g.statistics.max_depth_reached, 2);
            assert!(g.depths.values().all(|d| *d <= 2));
            assert!(!g.depths.contains_key("d"));
            assert!(g.paths.contains(&vec!["a".to_string(), "b".to_string(), "c".to_string()]));
            assert_eq!(g.statistics.total_nodes, 4);

            let typed = m
                .build_memory_graph(
                    &MemoryGraphQuery::new("a", "t", 5).with_types(vec![RelationshipType::References]),
                )
                .unwrap();
            assert!(!typed.depths.contains_key("x"));
            assert_eq!(typed.depths["d"], 3);
            assert_eq!(typed.statistics.total_edges, 4);
        }
    }

    #[test]
    fn test_cleanup_orphans_is_tenant_scoped() {
        for m in managers() {
            rel(&m, "a", "b", RelationshipType::Related, "t1");
            rel(&m, "a", "ghost", RelationshipType::Related, "t1");
            rel(&m, "a", "ghost", RelationshipType::Related, "t2");

            let removed = m
                .cleanup_orphaned_relationships(&["a".to_string(), "b".to_string()], "t1")
                .unwrap();
            assert_eq!(removed, 1);
            assert_eq!(m.get_relationships("a", "t1").unwrap().len(), 1);
            assert_eq!(m.get_relationships("a", "t2").unwrap().len(), 1);
        }
    }

    #[test]
    fn test_conflicts_update_and_delete() {
        for m in managers() {
            let c = rel(&m, "a", "b", RelationshipType::Conflicts, "t");
            assert_eq!(m.find_memory_conflicts("t").unwrap().len(), 1);

            let updated = m
                .update_relationship(&c.id, "t", RelationshipUpdate { is_active: Some(false), ..Default::default() })
                .unwrap()
                .unwrap();
            assert!(!updated.is_active);
            assert!(m.find_memory_conflicts("t").unwrap().is_empty());
            assert!(m.update_relationship(&c.id, "other", RelationshipUpdate::default()).unwrap().is_none());

            assert!(!m.delete_relationship(&c.id, "other").unwrap());
            assert!(m.delete_relationship(&c.id, "t").unwrap());
            assert!(!m.delete_relationship(&c.id, "t").unwrap());
        }
    }

    #[test]
    fn test_remove_for_memory_and_stats() {
        for m in managers() {
            m.create_sibling_relationship("a", "b", "t").unwrap();
            rel(&m, "c", "a", RelationshipType::References, "t");
            rel(&m, "c", "d", RelationshipType::References, "t");

            let stats = m.relationship_stats("t").unwrap();
            assert_eq!(stats.total, 4);
            assert_eq!(stats.by_type["sibling"], 2);

            assert_eq!(m.remove_relationships_for_memory("a", "t").unwrap(), 3);
            assert_eq!(m.relationship_stats("t").unwrap().total, 1);
        }
    }
}
