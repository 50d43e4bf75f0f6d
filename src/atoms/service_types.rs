// ── Memorai Atoms: Service Request / Response Types ────────────────────────
//
// Inputs and outputs of the four caller-facing operations
// (remember, recall, forget, context) plus the health probe.

use crate::atoms::types::{HealthReport, HealthStatus, MemoryResult, MemoryType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional metadata for `MemoryService::remember`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RememberOptions {
    /// Classified from the content when absent.
    pub memory_type: Option<MemoryType>,
    pub importance: Option<f32>,
    pub confidence: Option<f32>,
    pub tags: Vec<String>,
    pub emotional_weight: Option<f32>,
    pub ttl: Option<DateTime<Utc>>,
    /// Existing memory to link as this memory's parent.
    pub parent_id: Option<String>,
}

/// Optional knobs for `MemoryService::recall`; `None` falls back to config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallOptions {
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    pub memory_type: Option<MemoryType>,
    pub expand_relationships: Option<bool>,
    pub expansion_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResponse {
    pub context: String,
    pub memories: Vec<MemoryResult>,
    pub summary: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub vector_store: HealthReport,
    pub embedding_model: String,
}
