// Memorai Engine: Configuration
//
// One TOML file, every section optional:
//
//   [vector]     Qdrant endpoint, collection, dimension, timeouts
//   [embedding]  Ollama / OpenAI-compatible embedding endpoint
//   [graph]      traversal guards
//   [recall]     default recall limits and relationship expansion
//   [context]    agent-context assembly defaults
//   [storage]    SQLite path for graph + relationship tables
//
// Resolution order: built-in defaults → TOML file → MEMORAI_* env vars.

use crate::atoms::constants::{
    AGENT_CONTEXT_MAX_MEMORIES, AGENT_CONTEXT_SUMMARY_LENGTH, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_MAX_PATHS, DEFAULT_MAX_PATH_EXPANSIONS,
};
use crate::atoms::error::{EngineError, EngineResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MAX_VECTOR_RETRIES: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoraiConfig {
    pub vector: VectorStoreConfig,
    pub embedding: EmbeddingConfig,
    pub graph: GraphConfig,
    pub recall: RecallConfig,
    pub context: ContextConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Qdrant REST base URL (e.g. http://localhost:6333)
    pub url: String,
    /// Sent as the `api-key` header when set
    pub api_key: Option<String>,
    pub collection: String,
    /// Must match the embedding model's output size
    pub dimension: usize,
    pub timeout_secs: u64,
    /// Retries on 429 / 5xx before surfacing a store error
    pub max_retries: u32,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        VectorStoreConfig {
            url: "http://localhost:6333".into(),
            api_key: None,
            collection: DEFAULT_COLLECTION.into(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL for embedding API (Ollama: http://localhost:11434)
    pub base_url: String,
    /// Embedding model name (e.g., "all-minilm", "nomic-embed-text")
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            base_url: "http://localhost:11434".into(),
            model: "all-minilm".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Cap on paths enumerated per `find_paths` call
    pub max_paths: usize,
    /// Cap on partial paths explored per `find_paths` call
    pub max_expansions: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig { max_paths: DEFAULT_MAX_PATHS, max_expansions: DEFAULT_MAX_PATH_EXPANSIONS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub limit: usize,
    /// Minimum similarity score (0.0–1.0)
    pub threshold: f32,
    /// Follow active relationships from each hit
    pub expand_relationships: bool,
    pub expansion_depth: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        RecallConfig {
            limit: 10,
            threshold: 0.3,
            expand_relationships: false,
            expansion_depth: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_memories: usize,
    pub summary_max_length: usize,
    pub importance_threshold: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            max_memories: AGENT_CONTEXT_MAX_MEMORIES,
            summary_max_length: AGENT_CONTEXT_SUMMARY_LENGTH,
            importance_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file for graph + relationship tables; defaults under the data dir
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(default_database_path)
    }
}

/// `<config dir>/memorai/config.toml`, or `./memorai.toml` when no config dir exists.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("memorai").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("memorai.toml"))
}

/// `<data dir>/memorai/memorai.db`, or `./memorai.db` when no data dir exists.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("memorai").join("memorai.db"))
        .unwrap_or_else(|| PathBuf::from("memorai.db"))
}

impl MemoraiConfig {
    /// Load from `path` (or the default location), apply env overrides, validate.
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let mut config = if path.exists() {
            info!("[config] Loading {:?}", path);
            let text = std::fs::read_to_string(&path)?;
            Self::from_toml(&text)?
        } else {
            info!("[config] No config at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `MEMORAI_*` overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MEMORAI_QDRANT_URL") {
            self.vector.url = v;
        }
        if let Some(v) = lookup("MEMORAI_QDRANT_API_KEY") {
            self.vector.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = lookup("MEMORAI_COLLECTION") {
            self.vector.collection = v;
        }
        if let Some(v) = lookup("MEMORAI_EMBEDDING_URL") {
            self.embedding.base_url = v;
        }
        if let Some(v) = lookup("MEMORAI_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = lookup("MEMORAI_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MEMORAI_DIMENSION") {
            match v.parse::<usize>() {
                Ok(dim) => self.vector.dimension = dim,
                Err(_) => warn!("[config] Ignoring MEMORAI_DIMENSION={:?} (not a number)", v),
            }
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.vector.max_retries > MAX_VECTOR_RETRIES {
            return Err(EngineError::Config(format!(
                "vector.max_retries must be at most {} (got {})",
                MAX_VECTOR_RETRIES, self.vector.max_retries
            )));
        }
        if self.vector.dimension == 0 {
            return Err(EngineError::Config("vector.dimension must be > 0".into()));
        }
        if self.vector.collection.trim().is_empty() {
            return Err(EngineError::Config("vector.collection must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.recall.threshold) {
            return Err(EngineError::Config(format!(
                "recall.threshold must be within 0.0–1.0 (got {})",
                self.recall.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.context.importance_threshold) {
            return Err(EngineError::Config(format!(
                "context.importance_threshold must be within 0.0–1.0 (got {})",
                self.context.importance_threshold
            )));
        }
        if self.graph.max_paths == 0 {
            return Err(EngineError::Config("graph.max_paths must be > 0".into()));
        }
        if self.graph.max_expansions == 0 {
            return Err(EngineError::Config("graph.max_expansions must be > 0".into()));
        }
        Ok(())
    }
}
