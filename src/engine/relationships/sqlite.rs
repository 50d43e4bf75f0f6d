// Memorai Engine: SQLite Relationship Repository
//
// Durable RelationshipRepository over `memory_relationships`.
// `insert_pair` runs inside one transaction.

use crate::atoms::error::EngineResult;
use crate::atoms::relationship_types::{MemoryRelationship, RelationshipType};
use crate::atoms::traits::RelationshipRepository;
use crate::engine::schema::{open_database, open_in_memory_database, time_from_sql, time_to_sql};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const COLUMNS: &str = "id, source_memory_id, target_memory_id, relationship_type, strength,
     is_active, tenant_id, note, created_at, updated_at";

pub struct SqliteRelationshipRepository {
    conn: Mutex<Connection>,
}

impl SqliteRelationshipRepository {
    pub fn open(path: &Path) -> EngineResult<Self> {
        Ok(Self { conn: Mutex::new(open_database(path)?) })
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Ok(Self { conn: Mutex::new(open_in_memory_database()?) })
    }

    fn from_row(row: &Row) -> rusqlite::Result<MemoryRelationship> {
        let kind: String = row.get(3)?;
        let relationship_type = kind.parse::<RelationshipType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;
        Ok(MemoryRelationship {
            id: row.get(0)?,
            source_memory_id: row.get(1)?,
            target_memory_id: row.get(2)?,
            relationship_type,
            strength: row.get::<_, f64>(4)? as f32,
            is_active: row.get(5)?,
            tenant_id: row.get(6)?,
            note: row.get(7)?,
            created_at: time_from_sql(8, &created_at)?,
            updated_at: time_from_sql(9, &updated_at)?,
        })
    }

    fn select<P: rusqlite::Params>(&self, filter: &str, args: P) -> EngineResult<Vec<MemoryRelationship>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM memory_relationships WHERE {} ORDER BY rowid", COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(args, Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn write(conn: &Connection, rel: &MemoryRelationship) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO memory_relationships
            (id, source_memory_id, target_memory_id, relationship_type, strength,
             is_active, tenant_id, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            rel.id,
            rel.source_memory_id,
            rel.target_memory_id,
            rel.relationship_type.as_str(),
            rel.strength as f64,
            rel.is_active,
            rel.tenant_id,
            rel.note,
            time_to_sql(&rel.created_at),
            time_to_sql(&rel.updated_at),
        ],
    )
}

impl RelationshipRepository for SqliteRelationshipRepository {
    fn insert(&self, relationship: &MemoryRelationship) -> EngineResult<()> {
        let conn = self.conn.lock();
        write(&conn, relationship)?;
        Ok(())
    }

    fn insert_pair(&self, first: &MemoryRelationship, second: &MemoryRelationship) -> EngineResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        write(&tx, first)?;
        write(&tx, second)?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, tenant_id: &str, id: &str) -> EngineResult<Option<MemoryRelationship>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM memory_relationships WHERE tenant_id = ?1 AND id = ?2", COLUMNS);
        Ok(conn.query_row(&sql, params![tenant_id, id], Self::from_row).optional()?)
    }

    fn update(&self, relationship: &MemoryRelationship) -> EngineResult<bool> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE memory_relationships
             SET strength = ?3, is_active = ?4, note = ?5, updated_at = ?6
             WHERE tenant_id = ?1 AND id = ?2",
            params![
                relationship.tenant_id,
                relationship.id,
                relationship.strength as f64,
                relationship.is_active,
                relationship.note,
                time_to_sql(&relationship.updated_at),
            ],
        )?;
        Ok(n > 0)
    }

    fn delete(&self, tenant_id: &str, id: &str) -> EngineResult<bool> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM memory_relationships WHERE tenant_id = ?1 AND id = ?2",
            params![tenant_id, id],
        )?;
        Ok(n > 0)
    }

    fn delete_many(&self, tenant_id: &str, ids: &[String]) -> EngineResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM memory_relationships WHERE tenant_id = ?1 AND id = ?2")?;
            for id in ids {
                removed += stmt.execute(params![tenant_id, id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn outgoing(&self, tenant_id: &str, memory_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        self.select("tenant_id = ?1 AND source_memory_id = ?2", params![tenant_id, memory_id])
    }

    fn incoming(&self, tenant_id: &str, memory_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        self.select("tenant_id = ?1 AND target_memory_id = ?2", params![tenant_id, memory_id])
    }

    fn list_for_tenant(&self, tenant_id: &str) -> EngineResult<Vec<MemoryRelationship>> {
        self.select("tenant_id = ?1", params![tenant_id])
    }
}
