// ── Memorai Atoms: Memory Relationship Types ───────────────────────────────
//
// Typed, directed links between memory ids. Bidirectional concepts
// (parent/child, sibling) are stored as two directed records written
// together by the repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Parent,
    Child,
    Sibling,
    References,
    Complements,
    Conflicts,
    Supersedes,
    Related,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 8] = [
        RelationshipType::Parent,
        RelationshipType::Child,
        RelationshipType::Sibling,
        RelationshipType::References,
        RelationshipType::Complements,
        RelationshipType::Conflicts,
        RelationshipType::Supersedes,
        RelationshipType::Related,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Parent => "parent",
            RelationshipType::Child => "child",
            RelationshipType::Sibling => "sibling",
            RelationshipType::References => "references",
            RelationshipType::Complements => "complements",
            RelationshipType::Conflicts => "conflicts",
            RelationshipType::Supersedes => "supersedes",
            RelationshipType::Related => "related",
        }
    }

    /// Record type that describes the same link seen from the other end.
    pub fn inverse(&self) -> RelationshipType {
        match self {
            RelationshipType::Parent => RelationshipType::Child,
            RelationshipType::Child => RelationshipType::Parent,
            other => *other,
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        RelationshipType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown relationship type '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRelationship {
    pub id: String,
    pub source_memory_id: String,
    pub target_memory_id: String,
    pub relationship_type: RelationshipType,
    /// 0.0–1.0, defaults to 1.0.
    pub strength: f32,
    /// Inactive links are kept for history but never traversed.
    pub is_active: bool,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `MemoryRelationshipManager::create_relationship`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRelationship {
    pub source_memory_id: String,
    pub target_memory_id: String,
    pub relationship_type: RelationshipType,
    pub strength: Option<f32>,
    pub is_active: Option<bool>,
    pub tenant_id: String,
    pub note: Option<String>,
}

impl NewRelationship {
    pub fn new(
        source_memory_id: impl Into<String>,
        target_memory_id: impl Into<String>,
        relationship_type: RelationshipType,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            source_memory_id: source_memory_id.into(),
            target_memory_id: target_memory_id.into(),
            relationship_type,
            strength: None,
            is_active: None,
            tenant_id: tenant_id.into(),
            note: None,
        }
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = Some(false);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipUpdate {
    pub strength: Option<f32>,
    pub is_active: Option<bool>,
    pub note: Option<String>,
}

/// Parameters for `build_memory_graph`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryGraphQuery {
    pub start_memory_id: String,
    /// `None` follows every type.
    pub relationship_types: Option<Vec<RelationshipType>>,
    pub max_depth: usize,
    pub tenant_id: String,
}

impl MemoryGraphQuery {
    pub fn new(start_memory_id: impl Into<String>, tenant_id: impl Into<String>, max_depth: usize) -> Self {
        Self {
            start_memory_id: start_memory_id.into(),
            relationship_types: None,
            max_depth,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn with_types(mut self, types: Vec<RelationshipType>) -> Self {
        self.relationship_types = Some(types);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryGraphStats {
    pub total_edges: usize,
    pub total_nodes: usize,
    pub max_depth_reached: usize,
}

/// Result of a breadth-first relationship expansion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryGraph {
    /// Every traversed edge, in discovery order.
    pub edges: Vec<MemoryRelationship>,
    /// One path per reached memory: start id first, reached id last.
    pub paths: Vec<Vec<String>>,
    /// Hop distance of each reached memory (start is 0).
    pub depths: HashMap<String, usize>,
    pub statistics: MemoryGraphStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryHierarchy {
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub siblings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipStats {
    pub total: usize,
    pub active: usize,
    pub by_type: HashMap<String, usize>,
}
