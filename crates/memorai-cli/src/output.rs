//! Text and JSON rendering for CLI results.

use memorai::atoms::graph_types::{GraphEntity, GraphStats, PathSearch};
use memorai::atoms::relationship_types::MemoryHierarchy;
use memorai::{ContextResponse, EngineResult, MemoryRelationship, MemoryResult, ServiceHealth};
use serde::Serialize;
use serde_json::json;

fn print_json<T: Serialize + ?Sized>(value: &T) -> EngineResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn id(label: &str, id: &str, json: bool) -> EngineResult<()> {
    if json {
        return print_json(&json!({ "id": id }));
    }
    println!("{} {}", label, id);
    Ok(())
}

pub fn results(results: &[MemoryResult], json: bool) -> EngineResult<()> {
    if json {
        return print_json(results);
    }
    if results.is_empty() {
        println!("No memories found.");
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.2}] ({}) {}",
            i + 1,
            r.score,
            r.memory.memory_type,
            r.memory.content
        );
        println!("   id: {}  {}", r.memory.id, r.relevance_reason);
    }
    Ok(())
}

pub fn forgot(memory_id: &str, removed: usize, json: bool) -> EngineResult<()> {
    if json {
        return print_json(&json!({ "id": memory_id, "deleted": removed }));
    }
    if removed == 0 {
        println!("Nothing to forget for {}", memory_id);
    } else {
        println!("Forgot {}", memory_id);
    }
    Ok(())
}

pub fn context(ctx: &ContextResponse, json: bool) -> EngineResult<()> {
    if json {
        return print_json(ctx);
    }
    println!("{}", ctx.summary);
    println!();
    println!("{} memories, confidence {:.0}%", ctx.memories.len(), ctx.confidence * 100.0);
    Ok(())
}

pub fn relationship(rel: &MemoryRelationship, json: bool) -> EngineResult<()> {
    if json {
        return print_json(rel);
    }
    println!(
        "{} --{} ({:.2})--> {}  [{}]",
        rel.source_memory_id, rel.relationship_type, rel.strength, rel.target_memory_id, rel.id
    );
    Ok(())
}

pub fn hierarchy(h: &MemoryHierarchy, json: bool) -> EngineResult<()> {
    if json {
        return print_json(h);
    }
    for (label, ids) in [("parents", &h.parents), ("children", &h.children), ("siblings", &h.siblings)] {
        println!("{}: {}", label, if ids.is_empty() { "-".to_string() } else { ids.join(", ") });
    }
    Ok(())
}

pub fn health(health: &ServiceHealth, json: bool) -> EngineResult<()> {
    if json {
        return print_json(health);
    }
    let status = if health.vector_store.is_healthy() { "healthy" } else { "unhealthy" };
    println!("status: {}", status);
    println!("embedding model: {}", health.embedding_model);
    if let Some(ref err) = health.vector_store.error {
        println!("vector store: {}", err);
    }
    Ok(())
}

pub fn entities(entities: &[GraphEntity], json: bool) -> EngineResult<()> {
    if json {
        return print_json(entities);
    }
    if entities.is_empty() {
        println!("No entities found.");
    }
    for e in entities {
        println!("{}  {} ({})", e.id, e.name, e.entity_type);
    }
    Ok(())
}

pub fn paths(report: &PathSearch, json: bool) -> EngineResult<()> {
    if json {
        return print_json(report);
    }
    if report.paths.is_empty() {
        println!("No paths found.");
    }
    for p in &report.paths {
        println!("{} hops (weight {:.2}): {}", p.len(), p.weight, p.entity_ids.join(" -> "));
    }
    if report.truncated {
        println!("(search was truncated by the depth bound or path cap)");
    }
    Ok(())
}

pub fn graph_stats(stats: &GraphStats, json: bool) -> EngineResult<()> {
    if json {
        return print_json(stats);
    }
    println!("entities: {}\nrelations: {}", stats.entities, stats.relations);
    Ok(())
}
