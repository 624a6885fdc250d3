//! SQLite (persistent) backend.
//!
//! Records are stored in explicit columns so the decay and retrieval
//! paths can query by agent, time range, and strength in SQL. Set-valued
//! fields (tags, embedding, profile scalars) are JSON columns, which
//! keeps the schema stable as those types evolve.
//!
//! WAL mode allows concurrent readers during gameplay; `busy_timeout`
//! bounds how long any statement waits on the database, so no engine
//! operation blocks indefinitely.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{Result, ReverieError};
use crate::record::{MemoryFilter, MemoryRecord, RelationshipRecord, RelationshipUpdate};
use crate::store::MemoryBackend;
use crate::types::{
    AgentId, AgentProfile, ContextType, CounterpartyKind, Embedding, EmotionalState, MemoryId,
    PersonalityProfile,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memory_records (
    id                TEXT PRIMARY KEY,
    agent_id          TEXT NOT NULL,
    counterparty_id   TEXT,
    context_type      TEXT NOT NULL,
    content           TEXT NOT NULL,
    emotional_context TEXT NOT NULL,
    importance        INTEGER NOT NULL,
    strength          REAL NOT NULL,
    tags              TEXT NOT NULL,
    embedding         TEXT,
    created_at        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memory_agent ON memory_records(agent_id);
CREATE INDEX IF NOT EXISTS idx_memory_created ON memory_records(created_at);

CREATE TABLE IF NOT EXISTS relationships (
    agent_id            TEXT NOT NULL,
    counterparty_id     TEXT NOT NULL,
    counterparty_kind   TEXT NOT NULL,
    trust               REAL NOT NULL,
    respect             REAL NOT NULL,
    fear                REAL NOT NULL,
    loyalty             REAL NOT NULL,
    last_interaction_at INTEGER NOT NULL,
    PRIMARY KEY (agent_id, counterparty_id, counterparty_kind)
);
CREATE INDEX IF NOT EXISTS idx_relationship_agent ON relationships(agent_id);

CREATE TABLE IF NOT EXISTS agent_profiles (
    agent_id        TEXT PRIMARY KEY,
    emotional_state TEXT NOT NULL,
    personality     TEXT NOT NULL
);
";

const RECORD_COLUMNS: &str = "id, agent_id, counterparty_id, context_type, content, \
     emotional_context, importance, strength, tags, embedding, created_at";

/// Persistent backend over a SQLite database.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open (or create) a database at `path`. The schema is created if
    /// missing; WAL mode and a 5 s busy timeout are enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ReverieError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), "memory store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`ReverieError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

struct RawRecordRow {
    id: String,
    agent_id: String,
    counterparty_id: Option<String>,
    context_type: String,
    content: String,
    emotional_context: String,
    importance: i64,
    strength: f64,
    tags: String,
    embedding: Option<String>,
    created_at_ms: i64,
}

impl RawRecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            counterparty_id: row.get(2)?,
            context_type: row.get(3)?,
            content: row.get(4)?,
            emotional_context: row.get(5)?,
            importance: row.get(6)?,
            strength: row.get(7)?,
            tags: row.get(8)?,
            embedding: row.get(9)?,
            created_at_ms: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<MemoryRecord> {
        let id = uuid::Uuid::parse_str(&self.id)
            .map_err(|e| ReverieError::Serialization(format!("bad memory id: {e}")))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| ReverieError::Serialization(e.to_string()))?;
        let embedding: Option<Embedding> = match self.embedding {
            Some(json) => Some(
                serde_json::from_str(&json)
                    .map_err(|e| ReverieError::Serialization(e.to_string()))?,
            ),
            None => None,
        };
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at_ms).ok_or_else(
            || ReverieError::Serialization(format!("bad timestamp: {}", self.created_at_ms)),
        )?;

        Ok(MemoryRecord {
            id: MemoryId(id),
            agent_id: AgentId(self.agent_id),
            counterparty_id: self.counterparty_id.map(AgentId),
            context_type: ContextType::from_str(&self.context_type)?,
            content: self.content,
            emotional_context: self.emotional_context,
            importance: self.importance.clamp(0, 10) as u8,
            strength: (self.strength as f32).clamp(0.0, 1.0),
            tags,
            embedding,
            created_at,
        })
    }
}

fn rows_to_records(rows: Vec<RawRecordRow>) -> Result<Vec<MemoryRecord>> {
    rows.into_iter().map(RawRecordRow::into_record).collect()
}

struct RawRelationshipRow {
    agent_id: String,
    counterparty_id: String,
    counterparty_kind: String,
    trust: f64,
    respect: f64,
    fear: f64,
    loyalty: f64,
    last_interaction_ms: i64,
}

impl RawRelationshipRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            agent_id: row.get(0)?,
            counterparty_id: row.get(1)?,
            counterparty_kind: row.get(2)?,
            trust: row.get(3)?,
            respect: row.get(4)?,
            fear: row.get(5)?,
            loyalty: row.get(6)?,
            last_interaction_ms: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<RelationshipRecord> {
        let last_interaction_at = DateTime::<Utc>::from_timestamp_millis(self.last_interaction_ms)
            .ok_or_else(|| {
                ReverieError::Serialization(format!(
                    "bad timestamp: {}",
                    self.last_interaction_ms
                ))
            })?;
        Ok(RelationshipRecord {
            agent_id: AgentId(self.agent_id),
            counterparty_id: AgentId(self.counterparty_id),
            kind: CounterpartyKind::from_str(&self.counterparty_kind)?,
            trust: self.trust as f32,
            respect: self.respect as f32,
            fear: self.fear as f32,
            loyalty: self.loyalty as f32,
            last_interaction_at,
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend impl
// ---------------------------------------------------------------------------

impl MemoryBackend for SqliteBackend {
    fn create(&self, mut record: MemoryRecord) -> Result<MemoryId> {
        let start = Instant::now();
        // Persistent variant: importance range [0, 10].
        record.importance = record.importance.min(crate::record::MAX_IMPORTANCE);
        record.strength = record.strength.clamp(0.0, 1.0);

        let tags = serde_json::to_string(&record.tags)
            .map_err(|e| ReverieError::Serialization(e.to_string()))?;
        let embedding = match &record.embedding {
            Some(emb) => Some(
                serde_json::to_string(emb)
                    .map_err(|e| ReverieError::Serialization(e.to_string()))?,
            ),
            None => None,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO memory_records (id, agent_id, counterparty_id, context_type, content, \
             emotional_context, importance, strength, tags, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id.0.to_string(),
                record.agent_id.0,
                record.counterparty_id.as_ref().map(|c| c.0.clone()),
                record.context_type.as_str(),
                record.content,
                record.emotional_context,
                i64::from(record.importance),
                f64::from(record.strength),
                tags,
                embedding,
                record.created_at.timestamp_millis(),
            ],
        )?;

        debug!(
            memory = %record.id,
            agent = %record.agent_id,
            elapsed_us = start.elapsed().as_micros(),
            "created memory record"
        );
        Ok(record.id)
    }

    fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM memory_records WHERE id = ?1"
        ))?;
        let raw = match stmt.query_row(params![id.0.to_string()], RawRecordRow::from_row) {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(raw.into_record()?))
    }

    fn find(&self, agent_id: &AgentId, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>> {
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM memory_records WHERE agent_id = ?"
        );
        let mut bind: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(agent_id.0.clone())];

        if let Some(ct) = filter.context_type {
            sql.push_str(" AND context_type = ?");
            bind.push(Box::new(ct.as_str()));
        }
        if let Some(ref cp) = filter.counterparty_id {
            sql.push_str(" AND counterparty_id = ?");
            bind.push(Box::new(cp.0.clone()));
        }
        if let Some(min) = filter.min_importance {
            sql.push_str(" AND importance >= ?");
            bind.push(Box::new(i64::from(min)));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND created_at >= ?");
            bind.push(Box::new(from.timestamp_millis()));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND created_at <= ?");
            bind.push(Box::new(to.timestamp_millis()));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(bind.iter().map(|b| &**b)),
                RawRecordRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows_to_records(rows)
    }

    fn delete(&self, id: MemoryId) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM memory_records WHERE id = ?1",
            params![id.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn update_strength(&self, id: MemoryId, strength: f32) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE memory_records SET strength = ?1 WHERE id = ?2",
            params![f64::from(strength.clamp(0.0, 1.0)), id.0.to_string()],
        )?;
        if updated == 0 {
            return Err(ReverieError::MemoryNotFound(id));
        }
        Ok(())
    }

    fn decay_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM memory_records \
             WHERE created_at < ?1 AND strength > 0.0"
        ))?;
        let rows = stmt
            .query_map(params![cutoff.timestamp_millis()], RawRecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows_to_records(rows)
    }

    fn purge_older_than(&self, horizon: DateTime<Utc>) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM memory_records WHERE created_at < ?1"
        ))?;
        let rows = stmt
            .query_map(params![horizon.timestamp_millis()], RawRecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        conn.execute(
            "DELETE FROM memory_records WHERE created_at < ?1",
            params![horizon.timestamp_millis()],
        )?;
        rows_to_records(rows)
    }

    fn records_for_agent(&self, agent_id: &AgentId) -> Result<Vec<MemoryRecord>> {
        self.find(agent_id, &MemoryFilter::default())
    }

    fn all_records(&self) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM memory_records ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map([], RawRecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows_to_records(rows)
    }

    fn upsert_relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
        update: &RelationshipUpdate,
        now: DateTime<Utc>,
    ) -> Result<RelationshipRecord> {
        // Read-merge-write under the connection lock keeps the upsert
        // atomic against other engine threads.
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT agent_id, counterparty_id, counterparty_kind, trust, respect, fear, \
             loyalty, last_interaction_at FROM relationships \
             WHERE agent_id = ?1 AND counterparty_id = ?2 AND counterparty_kind = ?3",
        )?;
        let existing = match stmt.query_row(
            params![agent_id.0, counterparty_id.0, kind.as_str()],
            RawRelationshipRow::from_row,
        ) {
            Ok(raw) => Some(raw.into_record()?),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        drop(stmt);

        let mut record = existing.unwrap_or_else(|| {
            RelationshipRecord::neutral(agent_id.clone(), counterparty_id.clone(), kind, now)
        });
        record.apply(update, now);

        conn.execute(
            "INSERT INTO relationships (agent_id, counterparty_id, counterparty_kind, trust, \
             respect, fear, loyalty, last_interaction_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(agent_id, counterparty_id, counterparty_kind) DO UPDATE SET
                trust = excluded.trust,
                respect = excluded.respect,
                fear = excluded.fear,
                loyalty = excluded.loyalty,
                last_interaction_at = excluded.last_interaction_at",
            params![
                record.agent_id.0,
                record.counterparty_id.0,
                record.kind.as_str(),
                f64::from(record.trust),
                f64::from(record.respect),
                f64::from(record.fear),
                f64::from(record.loyalty),
                record.last_interaction_at.timestamp_millis(),
            ],
        )?;

        Ok(record)
    }

    fn relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
    ) -> Result<Option<RelationshipRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT agent_id, counterparty_id, counterparty_kind, trust, respect, fear, \
             loyalty, last_interaction_at FROM relationships \
             WHERE agent_id = ?1 AND counterparty_id = ?2 AND counterparty_kind = ?3",
        )?;
        match stmt.query_row(
            params![agent_id.0, counterparty_id.0, kind.as_str()],
            RawRelationshipRow::from_row,
        ) {
            Ok(raw) => Ok(Some(raw.into_record()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn relationships_for(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<RelationshipRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT agent_id, counterparty_id, counterparty_kind, trust, respect, fear, \
             loyalty, last_interaction_at FROM relationships \
             WHERE agent_id = ?1 ORDER BY last_interaction_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(
                params![agent_id.0, limit as i64],
                RawRelationshipRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawRelationshipRow::into_record).collect()
    }

    fn agent_profile(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT emotional_state, personality FROM agent_profiles WHERE agent_id = ?1",
        )?;
        let raw: Option<(String, String)> =
            match stmt.query_row(params![agent_id.0], |row| Ok((row.get(0)?, row.get(1)?))) {
                Ok(pair) => Some(pair),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };

        let Some((emotional_json, personality_json)) = raw else {
            return Ok(None);
        };
        let emotional_state: EmotionalState = serde_json::from_str(&emotional_json)
            .map_err(|e| ReverieError::Serialization(e.to_string()))?;
        let personality: PersonalityProfile = serde_json::from_str(&personality_json)
            .map_err(|e| ReverieError::Serialization(e.to_string()))?;
        Ok(Some(AgentProfile {
            agent_id: agent_id.clone(),
            emotional_state,
            personality,
        }))
    }

    fn put_agent_profile(&self, profile: &AgentProfile) -> Result<()> {
        let emotional = serde_json::to_string(&profile.emotional_state)
            .map_err(|e| ReverieError::Serialization(e.to_string()))?;
        let personality = serde_json::to_string(&profile.personality)
            .map_err(|e| ReverieError::Serialization(e.to_string()))?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agent_profiles (agent_id, emotional_state, personality)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(agent_id) DO UPDATE SET
                emotional_state = excluded.emotional_state,
                personality = excluded.personality",
            params![profile.agent_id.0, emotional, personality],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewMemory;
    use crate::types::Embedding;

    fn sample_record(content: &str, importance: i32) -> MemoryRecord {
        let new = NewMemory::new("npc-1", ContextType::Conversation, content, importance)
            .with_counterparty("player-9")
            .with_emotional_context("happy");
        MemoryRecord::from_new(new, Some(Embedding(vec![0.1, 0.2, 0.3])), Utc::now())
    }

    #[test]
    fn round_trip_create_get() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let record = sample_record("Met a wandering bard at the tavern", 7);
        let id = backend.create(record.clone()).expect("create");

        let loaded = backend.get(id).expect("get").expect("some");
        assert_eq!(loaded.content, record.content);
        assert_eq!(loaded.agent_id, record.agent_id);
        assert_eq!(loaded.counterparty_id, record.counterparty_id);
        assert_eq!(loaded.importance, 7);
        assert_eq!(loaded.tags, record.tags);
        assert_eq!(loaded.embedding, record.embedding);
        assert_eq!(
            loaded.created_at.timestamp_millis(),
            record.created_at.timestamp_millis()
        );
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        assert!(backend.get(MemoryId::new()).expect("get").is_none());
    }

    #[test]
    fn find_applies_filters_in_sql() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        backend.create(sample_record("high stakes duel", 9)).expect("create");
        backend.create(sample_record("idle gossip", 2)).expect("create");

        let agent = AgentId::from("npc-1");
        let important = backend
            .find(
                &agent,
                &MemoryFilter {
                    min_importance: Some(5),
                    ..Default::default()
                },
            )
            .expect("find");
        assert_eq!(important.len(), 1);
        assert_eq!(important[0].content, "high stakes duel");

        let other_agent = backend
            .find(&AgentId::from("npc-2"), &MemoryFilter::default())
            .expect("find");
        assert!(other_agent.is_empty());
    }

    #[test]
    fn update_strength_persists_and_clamps() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let id = backend.create(sample_record("fading memory", 5)).expect("create");

        backend.update_strength(id, 0.42).expect("update");
        let loaded = backend.get(id).expect("get").expect("some");
        assert!((loaded.strength - 0.42).abs() < 1e-6);

        backend.update_strength(id, 7.0).expect("update");
        let loaded = backend.get(id).expect("get").expect("some");
        assert!((loaded.strength - 1.0).abs() < 1e-6);

        let err = backend
            .update_strength(MemoryId::new(), 0.5)
            .expect_err("missing record");
        assert!(matches!(err, ReverieError::MemoryNotFound(_)));
    }

    #[test]
    fn decay_candidates_respect_cutoff_and_strength() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let now = Utc::now();

        let mut old = sample_record("old memory", 5);
        old.created_at = now - chrono::Duration::hours(48);
        let old_id = backend.create(old).expect("create");

        let mut spent = sample_record("spent memory", 5);
        spent.created_at = now - chrono::Duration::hours(48);
        let spent_id = backend.create(spent).expect("create");
        backend.update_strength(spent_id, 0.0).expect("zero out");

        backend.create(sample_record("fresh memory", 5)).expect("create");

        let candidates = backend
            .decay_candidates(now - chrono::Duration::hours(24))
            .expect("candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, old_id);
    }

    #[test]
    fn purge_returns_removed_records() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let now = Utc::now();

        let mut ancient = sample_record("ancient memory", 9);
        ancient.created_at = now - chrono::Duration::days(60);
        backend.create(ancient).expect("create");
        backend.create(sample_record("recent memory", 3)).expect("create");

        let removed = backend
            .purge_older_than(now - chrono::Duration::days(30))
            .expect("purge");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].content, "ancient memory");

        let remaining = backend.all_records().expect("all");
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn relationship_upsert_round_trip() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let agent = AgentId::from("npc-1");
        let player = AgentId::from("player-9");
        let now = Utc::now();

        backend
            .upsert_relationship(
                &agent,
                &player,
                CounterpartyKind::Player,
                &RelationshipUpdate::touch().trust(0.6).loyalty(-0.2),
                now,
            )
            .expect("upsert");

        let later = now + chrono::Duration::minutes(5);
        let updated = backend
            .upsert_relationship(
                &agent,
                &player,
                CounterpartyKind::Player,
                &RelationshipUpdate::touch().respect(0.3),
                later,
            )
            .expect("upsert");
        assert!((updated.trust - 0.6).abs() < 1e-6);
        assert!((updated.respect - 0.3).abs() < 1e-6);
        assert!((updated.loyalty + 0.2).abs() < 1e-6);

        let loaded = backend
            .relationship(&agent, &player, CounterpartyKind::Player)
            .expect("get")
            .expect("some");
        assert!((loaded.trust - 0.6).abs() < 1e-6);
        assert_eq!(
            loaded.last_interaction_at.timestamp_millis(),
            later.timestamp_millis()
        );
    }

    #[test]
    fn same_counterparty_different_kinds_are_distinct() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let agent = AgentId::from("npc-1");
        let other = AgentId::from("iron-covenant");
        let now = Utc::now();

        backend
            .upsert_relationship(
                &agent,
                &other,
                CounterpartyKind::Npc,
                &RelationshipUpdate::touch().trust(0.9),
                now,
            )
            .expect("upsert");
        backend
            .upsert_relationship(
                &agent,
                &other,
                CounterpartyKind::Faction,
                &RelationshipUpdate::touch().trust(-0.9),
                now,
            )
            .expect("upsert");

        let npc = backend
            .relationship(&agent, &other, CounterpartyKind::Npc)
            .expect("get")
            .expect("some");
        let faction = backend
            .relationship(&agent, &other, CounterpartyKind::Faction)
            .expect("get")
            .expect("some");
        assert!((npc.trust - 0.9).abs() < 1e-6);
        assert!((faction.trust + 0.9).abs() < 1e-6);
    }

    #[test]
    fn profile_round_trip() {
        let backend = SqliteBackend::open_in_memory().expect("open");
        let agent = AgentId::from("npc-1");
        assert!(backend.agent_profile(&agent).expect("get").is_none());

        let profile = AgentProfile {
            agent_id: agent.clone(),
            emotional_state: EmotionalState::new(0.8, 0.1, 0.0, 0.4, 0.2, 0.6),
            personality: PersonalityProfile {
                humor: 0.9,
                ..Default::default()
            },
        };
        backend.put_agent_profile(&profile).expect("put");

        let loaded = backend.agent_profile(&agent).expect("get").expect("some");
        assert_eq!(loaded, profile);
    }

    #[test]
    fn file_based_open_works() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("memories.db");

        let backend = SqliteBackend::open(&db_path).expect("open");
        let id = backend.create(sample_record("persisted across opens", 6)).expect("create");
        drop(backend);

        let reopened = SqliteBackend::open(&db_path).expect("reopen");
        let loaded = reopened.get(id).expect("get").expect("some");
        assert_eq!(loaded.content, "persisted across opens");
    }
}
