// Memorai Engine: In-Memory Graph Repository
//
// Per-tenant arena: entities and relations keyed by UUID string, with
// adjacency lists of relation ids in insertion order. Nothing holds a
// reference to another record, so deleting an entity never leaves a
// dangling pointer, only a dangling id that traversal skips.

use crate::atoms::error::EngineResult;
use crate::atoms::graph_types::{GraphEntity, GraphRelation, GraphStats};
use crate::atoms::traits::GraphRepository;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct TenantGraph {
    entities: HashMap<String, GraphEntity>,
    relations: HashMap<String, GraphRelation>,
    outgoing: HashMap<String, Vec<String>>,
    incoming: HashMap<String, Vec<String>>,
}

impl TenantGraph {
    fn collect(&self, ids: Option<&Vec<String>>) -> Vec<GraphRelation> {
        ids.map(|ids| ids.iter().filter_map(|id| self.relations.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn unlink(&mut self, relation: &GraphRelation) {
        if let Some(out) = self.outgoing.get_mut(&relation.source_entity_id) {
            out.retain(|id| id != &relation.id);
        }
        if let Some(inc) = self.incoming.get_mut(&relation.target_entity_id) {
            inc.retain(|id| id != &relation.id);
        }
    }
}

#[derive(Default)]
pub struct InMemoryGraphRepository {
    tenants: RwLock<HashMap<String, TenantGraph>>,
}

impl InMemoryGraphRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphRepository for InMemoryGraphRepository {
    fn insert_entity(&self, entity: &GraphEntity) -> EngineResult<()> {
        let mut tenants = self.tenants.write();
        tenants
            .entry(entity.tenant_id.clone())
            .or_default()
            .entities
            .insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    fn get_entity(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphEntity>> {
        Ok(self.tenants.read().get(tenant_id).and_then(|g| g.entities.get(id).cloned()))
    }

    fn list_entities(&self, tenant_id: &str) -> EngineResult<Vec<GraphEntity>> {
        let mut list: Vec<GraphEntity> = self
            .tenants
            .read()
            .get(tenant_id)
            .map(|g| g.entities.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    fn delete_entity(&self, tenant_id: &str, id: &str) -> EngineResult<bool> {
        Ok(self
            .tenants
            .write()
            .get_mut(tenant_id)
            .and_then(|g| g.entities.remove(id))
            .is_some())
    }

    fn insert_relation(&self, relation: &GraphRelation) -> EngineResult<()> {
        let mut tenants = self.tenants.write();
        let graph = tenants.entry(relation.tenant_id.clone()).or_default();
        if let Some(previous) = graph.relations.insert(relation.id.clone(), relation.clone()) {
            graph.unlink(&previous);
        }
        graph
            .outgoing
            .entry(relation.source_entity_id.clone())
            .or_default()
            .push(relation.id.clone());
        graph
            .incoming
            .entry(relation.target_entity_id.clone())
            .or_default()
            .push(relation.id.clone());
        Ok(())
    }

    fn get_relation(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphRelation>> {
        Ok(self.tenants.read().get(tenant_id).and_then(|g| g.relations.get(id).cloned()))
    }

    fn delete_relation(&self, tenant_id: &str, id: &str) -> EngineResult<bool> {
        let mut tenants = self.tenants.write();
        let Some(graph) = tenants.get_mut(tenant_id) else {
            return Ok(false);
        };
        match graph.relations.remove(id) {
            Some(rel) => {
                graph.unlink(&rel);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn relations_from(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>> {
        Ok(self
            .tenants
            .read()
            .get(tenant_id)
            .map(|g| g.collect(g.outgoing.get(entity_id)))
            .unwrap_or_default())
    }

    fn relations_to(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>> {
        Ok(self
            .tenants
            .read()
            .get(tenant_id)
            .map(|g| g.collect(g.incoming.get(entity_id)))
            .unwrap_or_default())
    }

    fn delete_relations_touching(&self, tenant_id: &str, entity_id: &str) -> EngineResult<usize> {
        let mut tenants = self.tenants.write();
        let Some(graph) = tenants.get_mut(tenant_id) else {
            return Ok(0);
        };
        let mut ids: Vec<String> = graph.outgoing.remove(entity_id).unwrap_or_default();
        ids.extend(graph.incoming.remove(entity_id).unwrap_or_default());
        ids.sort();
        ids.dedup();

        let mut removed = 0;
        for id in ids {
            if let Some(rel) = graph.relations.remove(&id) {
                graph.unlink(&rel);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn stats(&self, tenant_id: &str) -> EngineResult<GraphStats> {
        Ok(self
            .tenants
            .read()
            .get(tenant_id)
            .map(|g| GraphStats { entities: g.entities.len(), relations: g.relations.len() })
            .unwrap_or_default())
    }
}
