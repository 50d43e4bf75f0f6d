// Memorai: memory engine library
//
//   atoms/   pure types, errors, constants and port traits
//   engine/  components and the MemoryService that wires them together

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::relationship_types::{MemoryRelationship, NewRelationship, RelationshipType};
pub use atoms::service_types::{ContextResponse, RecallOptions, RememberOptions, ServiceHealth};
pub use atoms::types::{Memory, MemoryQuery, MemoryResult, MemoryType};
pub use engine::config::MemoraiConfig;
pub use engine::context::ContextEngine;
pub use engine::graph::KnowledgeGraph;
pub use engine::memory_store::MemoryVectorStore;
pub use engine::relationships::MemoryRelationshipManager;
pub use engine::service::MemoryService;
