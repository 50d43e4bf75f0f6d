// ── Memorai Atoms: Constants ───────────────────────────────────────────────
// All named constants for the crate live here.
// Collecting them in one place keeps ranking weights, band boundaries and
// backend identifiers auditable without reading the algorithms.

// ── Vector backend ────────────────────────────────────────────────────────
// Payload keys that the backend indexes. Filters in `search`, `delete` and
// `count` only ever reference these keys.
pub const PAYLOAD_TENANT_ID: &str = "tenant_id";
pub const PAYLOAD_TYPE: &str = "type";
pub const PAYLOAD_AGENT_ID: &str = "agent_id";

/// Fields that receive a keyword payload index at collection creation.
pub const INDEXED_PAYLOAD_FIELDS: &[&str] = &[PAYLOAD_TENANT_ID, PAYLOAD_TYPE, PAYLOAD_AGENT_ID];

pub const DEFAULT_COLLECTION: &str = "memorai_memories";
/// all-MiniLM-L6-v2 output size.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

// ── Relevance bands ───────────────────────────────────────────────────────
// Used by MemoryVectorStore to explain a similarity score in words.
pub const RELEVANCE_HIGH: f32 = 0.90;
pub const RELEVANCE_STRONG: f32 = 0.80;
pub const RELEVANCE_MODERATE: f32 = 0.70;

// ── Composite score ───────────────────────────────────────────────────────
// composite = 0.5·similarity + 0.3·importance + 0.2·e^(−age_days / 30)
pub const COMPOSITE_SIMILARITY_WEIGHT: f64 = 0.5;
pub const COMPOSITE_IMPORTANCE_WEIGHT: f64 = 0.3;
pub const COMPOSITE_RECENCY_WEIGHT: f64 = 0.2;
pub const RECENCY_DECAY_DAYS: f64 = 30.0;

// ── Context assembly ──────────────────────────────────────────────────────
pub const NO_CONTEXT_SENTINEL: &str = "No relevant context available.";
pub const TRUNCATION_MARKER: &str = "...";
/// Bullets rendered per memory type in a summary.
pub const SUMMARY_ITEMS_PER_TYPE: usize = 5;
/// Memories rendered into an agent context block.
pub const AGENT_CONTEXT_MAX_MEMORIES: usize = 15;
pub const AGENT_CONTEXT_SUMMARY_LENGTH: usize = 2000;
/// Type diversity: each type may claim at most max_memories / N slots in the first pass.
pub const DIVERSITY_DIVISOR: usize = 5;
pub const MAX_THEMES: usize = 10;
pub const MIN_THEME_TOKEN_LEN: usize = 4;

// ── Emotional analysis ────────────────────────────────────────────────────
pub const SENTIMENT_POSITIVE_THRESHOLD: f32 = 0.2;
pub const SENTIMENT_NEGATIVE_THRESHOLD: f32 = -0.2;

// ── Temporal buckets (upper bounds, in minutes) ───────────────────────────
pub const BUCKET_LAST_HOUR_MINS: i64 = 60;
pub const BUCKET_TODAY_MINS: i64 = 24 * 60;
pub const BUCKET_THIS_WEEK_MINS: i64 = 7 * 24 * 60;
pub const BUCKET_THIS_MONTH_MINS: i64 = 4 * 7 * 24 * 60;
pub const BUCKET_THIS_YEAR_MINS: i64 = 365 * 24 * 60;

// ── Graph traversal ───────────────────────────────────────────────────────
/// Upper bound on enumerated paths per `find_paths` call (dense-graph guard).
pub const DEFAULT_MAX_PATHS: usize = 100;
/// Upper bound on DFS frames pushed per `find_paths` call.
pub const DEFAULT_MAX_PATH_EXPANSIONS: usize = 10_000;

// ── Relationship defaults ─────────────────────────────────────────────────
pub const DEFAULT_RELATIONSHIP_STRENGTH: f32 = 1.0;
/// Score multiplier applied per hop when recall pulls in related memories.
pub const EXPANSION_HOP_DECAY: f32 = 0.9;

/// Words ignored by theme extraction.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "was", "are", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could",
    "should", "may", "might", "shall", "can", "it", "its", "this", "that",
    "these", "those", "i", "we", "you", "he", "she", "they", "my", "our",
    "your", "his", "her", "their", "what", "which", "who", "whom", "how",
    "when", "where", "why", "if", "for", "but", "and", "or", "not", "no",
    "so", "than", "too", "very", "just", "about", "with", "from", "into",
    "to", "of", "in", "on", "at", "by", "up", "out", "off", "them", "then",
    "there", "here", "also", "some", "such", "only", "other", "more",
    "most", "much", "many", "each", "every", "over", "under", "after",
    "before", "while", "because", "until", "again", "once", "both", "same",
    "like", "want", "need", "make", "made",
];
