// ── Memorai Atoms Layer ────────────────────────────────────────────────────
// Pure constants, data types, port traits and error types, no I/O.
// Dependency rule: atoms may only depend on std and external pure crates.
// Nothing here may import from engine/.

pub mod constants;
pub mod context_types;
pub mod error;
pub mod graph_types;
pub mod relationship_types;
pub mod service_types;
pub mod traits;
pub mod types;
