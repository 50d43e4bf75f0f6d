// Memorai Engine: SQLite Graph Repository
//
// Durable GraphRepository over the `graph_entities` / `graph_relations`
// tables (see engine/schema.rs). Property maps are stored as JSON text.

use crate::atoms::error::EngineResult;
use crate::atoms::graph_types::{GraphEntity, GraphRelation, GraphStats, Properties};
use crate::atoms::traits::GraphRepository;
use crate::engine::schema::{open_database, open_in_memory_database, time_from_sql, time_to_sql};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const ENTITY_COLUMNS: &str = "id, name, entity_type, properties, tenant_id, created_at";
const RELATION_COLUMNS: &str = "id, source_entity_id, target_entity_id, relation_type, properties,
     weight, confidence, tenant_id, created_at";

pub struct SqliteGraphRepository {
    conn: Mutex<Connection>,
}

impl SqliteGraphRepository {
    pub fn open(path: &Path) -> EngineResult<Self> {
        Ok(Self { conn: Mutex::new(open_database(path)?) })
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Ok(Self { conn: Mutex::new(open_in_memory_database()?) })
    }

    fn entity_from_row(row: &Row) -> rusqlite::Result<GraphEntity> {
        let properties: String = row.get(3)?;
        let created_at: String = row.get(5)?;
        Ok(GraphEntity {
            id: row.get(0)?,
            name: row.get(1)?,
            entity_type: row.get(2)?,
            properties: properties_from_sql(3, &properties)?,
            tenant_id: row.get(4)?,
            created_at: time_from_sql(5, &created_at)?,
        })
    }

    fn relation_from_row(row: &Row) -> rusqlite::Result<GraphRelation> {
        let properties: String = row.get(4)?;
        let created_at: String = row.get(8)?;
        Ok(GraphRelation {
            id: row.get(0)?,
            source_entity_id: row.get(1)?,
            target_entity_id: row.get(2)?,
            relation_type: row.get(3)?,
            properties: properties_from_sql(4, &properties)?,
            weight: row.get::<_, f64>(5)? as f32,
            confidence: row.get::<_, f64>(6)? as f32,
            tenant_id: row.get(7)?,
            created_at: time_from_sql(8, &created_at)?,
        })
    }

    fn query_relations(&self, sql: &str, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![tenant_id, entity_id], Self::relation_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn properties_from_sql(idx: usize, text: &str) -> rusqlite::Result<Properties> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

impl GraphRepository for SqliteGraphRepository {
    fn insert_entity(&self, entity: &GraphEntity) -> EngineResult<()> {
        let properties = serde_json::to_string(&entity.properties)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO graph_entities (id, name, entity_type, properties, tenant_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entity.id,
                entity.name,
                entity.entity_type,
                properties,
                entity.tenant_id,
                time_to_sql(&entity.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_entity(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphEntity>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM graph_entities WHERE tenant_id = ?1 AND id = ?2", ENTITY_COLUMNS);
        Ok(conn
            .query_row(&sql, params![tenant_id, id], Self::entity_from_row)
            .optional()?)
    }

    fn list_entities(&self, tenant_id: &str) -> EngineResult<Vec<GraphEntity>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM graph_entities WHERE tenant_id = ?1 ORDER BY created_at, id",
            ENTITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant_id], Self::entity_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_entity(&self, tenant_id: &str, id: &str) -> EngineResult<bool> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM graph_entities WHERE tenant_id = ?1 AND id = ?2",
            params![tenant_id, id],
        )?;
        Ok(n > 0)
    }

    fn insert_relation(&self, relation: &GraphRelation) -> EngineResult<()> {
        let properties = serde_json::to_string(&relation.properties)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO graph_relations
                (id, source_entity_id, target_entity_id, relation_type, properties,
                 weight, confidence, tenant_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                relation.id,
                relation.source_entity_id,
                relation.target_entity_id,
                relation.relation_type,
                properties,
                relation.weight as f64,
                relation.confidence as f64,
                relation.tenant_id,
                time_to_sql(&relation.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_relation(&self, tenant_id: &str, id: &str) -> EngineResult<Option<GraphRelation>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM graph_relations WHERE tenant_id = ?1 AND id = ?2", RELATION_COLUMNS);
        Ok(conn
            .query_row(&sql, params![tenant_id, id], Self::relation_from_row)
            .optional()?)
    }

    fn delete_relation(&self, tenant_id: &str, id: &str) -> EngineResult<bool> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM graph_relations WHERE tenant_id = ?1 AND id = ?2",
            params![tenant_id, id],
        )?;
        Ok(n > 0)
    }

    fn relations_from(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>> {
        let sql = format!(
            "SELECT {} FROM graph_relations WHERE tenant_id = ?1 AND source_entity_id = ?2
             ORDER BY rowid",
            RELATION_COLUMNS
        );
        self.query_relations(&sql, tenant_id, entity_id)
    }

    fn relations_to(&self, tenant_id: &str, entity_id: &str) -> EngineResult<Vec<GraphRelation>> {
        let sql = format!(
            "SELECT {} FROM graph_relations WHERE tenant_id = ?1 AND target_entity_id = ?2
             ORDER BY rowid",
            RELATION_COLUMNS
        );
        self.query_relations(&sql, tenant_id, entity_id)
    }

    fn delete_relations_touching(&self, tenant_id: &str, entity_id: &str) -> EngineResult<usize> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM graph_relations
             WHERE tenant_id = ?1 AND (source_entity_id = ?2 OR target_entity_id = ?2)",
            params![tenant_id, entity_id],
        )?;
        Ok(n)
    }

    fn stats(&self, tenant_id: &str) -> EngineResult<GraphStats> {
        let conn = self.conn.lock();
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE tenant_id = ?1", table),
                params![tenant_id],
                |row| row.get(0),
            )
        };
        Ok(GraphStats {
            entities: count("graph_entities")? as usize,
            relations: count("graph_relations")? as usize,
        })
    }
}
