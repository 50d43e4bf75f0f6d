// Memorai Engine: In-Memory Relationship Repository
//
// Records are partitioned by tenant and kept in insertion order, so
// listings are deterministic without a sort key.

use crate::atoms::error::EngineResult;
use crate::atoms::relationship_types::MemoryRelationship;
use crate::atoms::traits::RelationshipRepository;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct InMemoryRelationshipRepository {
    tenants: RwLock<HashMap<String, Vec<MemoryRelationship>>>,
}

impl InMemoryRelationshipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered<F>(&self, tenant_id: &str, pred: F) -> Vec<MemoryRelationship>
    where
        F: Fn(&MemoryRelationship) -> bool,
    {
        self.tenants
            .read()
            .get(tenant_id)
            .map(|rels| rels.iter().filter(|r| pred(r)).cloned().collect())
            .unwrap_or_default()
    }
}

fn upsert(list: &mut Vec<MemoryRelationship>, rel: &MemoryRelationship) {
    match list.iter_mut().find(|r| r.id == rel.id) {
        Some(existing) => *existing = rel.clone(),
        None => list.push(rel.clone()),
    }
}

impl RelationshipRepository for InMemoryRelationshipRepository {
    fn insert(&self, relationship: &MemoryRelationship) -> EngineResult<()> {
        let mut tenants = self.tenants.write();
        upsert(tenants.entry(relationship.tenant_id.clone()).or_default(), relationship);
        Ok(())
    }

    fn insert_pair(&self, first: &MemoryRelationship, second: &MemoryRelationship) -> EngineResult<()> {
        // Single write guard: readers see both records or neither.
        let mut tenants = self.tenants.write();
        upsert(tenants.entry(first.tenant_id.clone()).or_default(), first);
        upsert(tenants.entry(second.tenant_id.clone()).or_default(), second);
        Ok(())
    }

    fn get(&self, tenant_id: &str, id: &str) -> EngineResult<Option<MemoryRelationship>> {
        Ok(self.filtered(tenant_id, |r| r.id == id).into_iter().next())
    }

    fn update(&self, relationship: &MemoryRelationship) -> EngineResult<bool> {
        let mut tenants = self.tenants.write();
        let slot = tenants
            .get_mut(&relationship.tenant_id)
            .and_then(|rels| rels.iter_mut().find(|r| r.id == relationship.id));
        match slot {
            Some(existing) => {
                *existing = relationship.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, tenant_id: &str, id: &str) -> EngineResult<bool> {
        Ok(self.delete_many(tenant_id, &[id.to_string()])? > 0)
    }

    fn delete_many(&self, tenant_id: &str, ids: &[String]) -> EngineResult<usize> {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut tenants = self.tenants.write();
        let Some(rels) = tenants.get_mut(tenant_id) else {
            return Ok(0);
        };
        let before = rels.len();
        rels.retain(|r| !doomed.contains(r.id.as_str()));
        Ok(before - rels.len())
    }

    fn outgoing(&self, tenant_id: &str, memory_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        Ok(self.filtered(tenant_id, |r| r.source_memory_id == memory_id))
    }

    fn incoming(&self, tenant_id: &str, memory_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        Ok(self.filtered(tenant_id, |r| r.target_memory_id == memory_id))
    }

    fn list_for_tenant(&self, tenant_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        Ok(self.filtered(tenant_id, |_| true))
    }
}
