// Memorai Engine: Vector Store Adapters
//
// Implementations of the `VectorStore` port (atoms/traits.rs).
//
// Module layout:
//   qdrant.rs: QdrantVectorStore (REST over reqwest, retry/backoff lives here)
//   in_memory.rs: InMemoryVectorStore (in-process cosine index for tests / embedding)
//   mod.rs: shared filter matching and vector math

pub mod in_memory;
pub mod qdrant;

pub use in_memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;

use crate::atoms::types::{PointPayload, SearchQuery};

/// True when `payload` passes the tenant / type / agent filter of `query`.
pub(crate) fn payload_matches(payload: &PointPayload, query: &SearchQuery) -> bool {
    if payload.tenant_id != query.tenant_id {
        return false;
    }
    if let Some(ref t) = query.memory_type {
        if payload.memory_type.as_deref() != Some(t.as_str()) {
            return false;
        }
    }
    if let Some(ref a) = query.agent_id {
        if payload.agent_id.as_deref() != Some(a.as_str()) {
            return false;
        }
    }
    true
}

/// Cosine similarity between two vectors. Returns 0.0 on length mismatch or zero norm.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_payload_matches_filters() {
        let mut payload = PointPayload::for_tenant("a");
        payload.memory_type = Some("fact".into());
        payload.agent_id = Some("bot".into());

        let mut q = SearchQuery::new("a", 10);
        assert!(payload_matches(&payload, &q));

        q.memory_type = Some("note".into());
        assert!(!payload_matches(&payload, &q));

        q.memory_type = Some("fact".into());
        q.agent_id = Some("other".into());
        assert!(!payload_matches(&payload, &q));

        assert!(!payload_matches(&payload, &SearchQuery::new("b", 10)));
    }
}
