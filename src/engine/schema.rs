// ── Memorai: Database Schema ────────────────────────────────────────────────
//
// Tables backing the durable repositories:
//   - graph_entities:        KnowledgeGraph nodes
//   - graph_relations:       KnowledgeGraph directed edges
//   - memory_relationships:  typed links between memory ids
//
// Every table carries tenant_id and every index leads with it.
// All statements are idempotent (CREATE IF NOT EXISTS).

use crate::atoms::error::EngineResult;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) a database file and run migrations.
pub fn open_database(path: &Path) -> EngineResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    info!("[schema] Opening database at {:?}", path);
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
    run_migrations(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, for tests and embedded use.
pub fn open_in_memory_database() -> EngineResult<Connection> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub fn run_migrations(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = "
    PRAGMA foreign_keys = OFF;

    CREATE TABLE IF NOT EXISTS graph_entities (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        name TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        properties TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_graph_entities_tenant
        ON graph_entities(tenant_id, entity_type);

    CREATE TABLE IF NOT EXISTS graph_relations (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        source_entity_id TEXT NOT NULL,
        target_entity_id TEXT NOT NULL,
        relation_type TEXT NOT NULL,
        properties TEXT NOT NULL DEFAULT '{}',
        weight REAL NOT NULL DEFAULT 1.0,
        confidence REAL NOT NULL DEFAULT 1.0,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_graph_relations_source
        ON graph_relations(tenant_id, source_entity_id);
    CREATE INDEX IF NOT EXISTS idx_graph_relations_target
        ON graph_relations(tenant_id, target_entity_id);

    CREATE TABLE IF NOT EXISTS memory_relationships (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        source_memory_id TEXT NOT NULL,
        target_memory_id TEXT NOT NULL,
        relationship_type TEXT NOT NULL,
        strength REAL NOT NULL DEFAULT 1.0,
        is_active INTEGER NOT NULL DEFAULT 1,
        note TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_memory_rel_source
        ON memory_relationships(tenant_id, source_memory_id);
    CREATE INDEX IF NOT EXISTS idx_memory_rel_target
        ON memory_relationships(tenant_id, target_memory_id);
";

// ── Row helpers ────────────────────────────────────────────────────────────

pub(crate) fn time_to_sql(t: &DateTime<Utc>) -> String {
    t.to_rfc3339()
}

/// Parse a stored RFC 3339 timestamp; unreadable values surface as a
/// conversion error on the column.
pub(crate) fn time_from_sql(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = open_in_memory_database().unwrap();
        run_migrations(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('graph_entities', 'graph_relations', 'memory_relationships')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_time_roundtrip() {
        let now = Utc::now();
        let back = time_from_sql(0, &time_to_sql(&now)).unwrap();
        assert_eq!(back, now);
    }
}
