// Memorai Engine: multi-tenant memory for AI agents
// Vector recall over a pluggable index, a tenant-scoped knowledge graph,
// typed memory relationships, and ranked context assembly.

pub mod classifier;
pub mod config;
pub mod context;
pub mod embedding;
pub mod graph;
pub mod memory_store;
pub mod relationships;
pub mod schema;
pub mod service;
pub mod vector_store;
