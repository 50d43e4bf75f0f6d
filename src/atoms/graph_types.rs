// ── Memorai Atoms: Knowledge Graph Types ───────────────────────────────────
//
// Entities and relations for the generic, tenant-scoped knowledge graph.
// Ids are UUID strings indexing into repository tables; nothing here holds
// references to other records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open property map: well-known optional fields plus an extension bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Where the fact came from (memory id, document URL, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Properties {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub properties: Properties,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelation {
    pub id: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Properties,
    pub weight: f32,
    pub confidence: f32,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
}

/// Input for `KnowledgeGraph::add_relation`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRelation {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    pub properties: Properties,
    pub weight: f32,
    pub confidence: f32,
    pub tenant_id: String,
}

impl NewRelation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            properties: Properties::default(),
            weight: 1.0,
            confidence: 1.0,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}

/// A simple path: `entity_ids.len() == relation_ids.len() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub entity_ids: Vec<String>,
    pub relation_ids: Vec<String>,
    /// Product of relation weights along the path.
    pub weight: f32,
}

impl GraphPath {
    /// Number of hops (relations) in the path.
    pub fn len(&self) -> usize {
        self.relation_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relation_ids.is_empty()
    }
}

/// Paths plus an out-of-band signal that pruning happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSearch {
    pub paths: Vec<GraphPath>,
    /// True when a branch was abandoned at the depth bound, or the path cap
    /// or expansion budget was hit.
    pub truncated: bool,
    /// Partial paths pushed onto the search stack.
    pub expansions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub entities: usize,
    pub relations: usize,
}
