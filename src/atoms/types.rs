// ── Memorai Atoms: Memory & Vector Types ───────────────────────────────────
//
// Pure data types for memories, vector points, and recall results.
// No logic beyond constructors, parsing, and small invariant helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 1: Memory
// ═══════════════════════════════════════════════════════════════════════════

/// Kind of knowledge a memory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Conversation,
    Document,
    Note,
    Thread,
    Task,
    Personality,
    Emotion,
    Fact,
    Procedure,
    Preference,
}

impl MemoryType {
    pub const ALL: [MemoryType; 10] = [
        MemoryType::Conversation,
        MemoryType::Document,
        MemoryType::Note,
        MemoryType::Thread,
        MemoryType::Task,
        MemoryType::Personality,
        MemoryType::Emotion,
        MemoryType::Fact,
        MemoryType::Procedure,
        MemoryType::Preference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Conversation => "conversation",
            MemoryType::Document => "document",
            MemoryType::Note => "note",
            MemoryType::Thread => "thread",
            MemoryType::Task => "task",
            MemoryType::Personality => "personality",
            MemoryType::Emotion => "emotion",
            MemoryType::Fact => "fact",
            MemoryType::Procedure => "procedure",
            MemoryType::Preference => "preference",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        MemoryType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown memory type '{}'", s))
    }
}

/// A stored unit of agent knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// How sure the writer was about the content (0.0–1.0).
    pub confidence: f32,
    /// How much the memory matters for future recall (0.0–1.0).
    pub importance: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Affective charge (−1.0 negative … 1.0 positive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_weight: Option<f32>,
    /// Absolute expiry instant; `None` means the memory never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<DateTime<Utc>>,
}

impl Memory {
    /// Create a fresh memory with a random id and neutral scores.
    pub fn new(content: impl Into<String>, memory_type: MemoryType, tenant_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            memory_type,
            confidence: 1.0,
            importance: 0.5,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            access_count: 0,
            tags: BTreeSet::new(),
            tenant_id: tenant_id.into(),
            agent_id: None,
            emotional_weight: None,
            ttl: None,
        }
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_emotional_weight(mut self, weight: f32) -> Self {
        self.emotional_weight = Some(weight.clamp(-1.0, 1.0));
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_ttl(mut self, expires_at: DateTime<Utc>) -> Self {
        self.ttl = Some(expires_at);
        self
    }

    /// True once the expiry instant has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl.is_some_and(|t| t <= now)
    }
}

/// The unit the context engine consumes: a memory plus why it was returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryResult {
    pub memory: Memory,
    /// Similarity score from the vector backend (cosine, 0.0–1.0).
    pub score: f32,
    pub relevance_reason: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 2: Vector Points
// ═══════════════════════════════════════════════════════════════════════════

/// Point payload: the indexed well-known fields plus an extension bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// RFC 3339 creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PointPayload {
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self { tenant_id: tenant_id.into(), ..Default::default() }
    }
}

/// A point written to the vector backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A point returned by the vector backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub payload: PointPayload,
}

/// Backend-level search parameters. `tenant_id` is always enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub tenant_id: String,
    pub memory_type: Option<String>,
    pub agent_id: Option<String>,
    pub limit: usize,
    pub score_threshold: Option<f32>,
}

impl SearchQuery {
    pub fn new(tenant_id: impl Into<String>, limit: usize) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            memory_type: None,
            agent_id: None,
            limit,
            score_threshold: None,
        }
    }
}

/// Domain-level recall query handed to `MemoryVectorStore::search_memories`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryQuery {
    /// Original query text, echoed in relevance explanations.
    pub query: String,
    pub tenant_id: String,
    pub agent_id: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub limit: usize,
    pub threshold: Option<f32>,
}

impl MemoryQuery {
    pub fn new(query: impl Into<String>, tenant_id: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            tenant_id: tenant_id.into(),
            agent_id: None,
            memory_type: None,
            limit,
            threshold: None,
        }
    }

    pub(crate) fn to_search_query(&self) -> SearchQuery {
        SearchQuery {
            tenant_id: self.tenant_id.clone(),
            memory_type: self.memory_type.map(|t| t.as_str().to_string()),
            agent_id: self.agent_id.clone(),
            limit: self.limit,
            score_threshold: self.threshold,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 3: Health & Classification
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self { status: HealthStatus::Healthy, error: None }
    }

    pub fn unhealthy(error: Option<String>) -> Self {
        Self { status: HealthStatus::Unhealthy, error }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Output of the provider's text classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClassification {
    pub category: String,
    pub confidence: f32,
    #[serde(default)]
    pub tags: Vec<String>,
}
