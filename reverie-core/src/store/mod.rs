//! System-of-record backends for memory and relationship records.
//!
//! The two historical implementations — a database-backed store and a
//! fully in-memory store — live behind one [`MemoryBackend`] trait so the
//! engine, index, decay, and retrieval code is backend-agnostic.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryBackend;
pub use sqlite::SqliteBackend;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::record::{MemoryFilter, MemoryRecord, RelationshipRecord, RelationshipUpdate};
use crate::types::{AgentId, AgentProfile, CounterpartyKind, MemoryId};

/// Persistence contract for memory records, relationships, and agent
/// profiles.
///
/// Implementations must be internally synchronized (`Send + Sync`);
/// callers serialize writes per agent, but reads may arrive from any
/// thread at any time. All `create` implementations clamp importance
/// into their variant's valid range before acceptance — out-of-range
/// input is clamped, never rejected.
pub trait MemoryBackend: Send + Sync {
    /// Store a new memory record, returning its id.
    fn create(&self, record: MemoryRecord) -> Result<MemoryId>;

    /// Fetch a single record by id.
    fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>>;

    /// Fetch an agent's records matching every supplied filter field,
    /// newest first.
    fn find(&self, agent_id: &AgentId, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>>;

    /// Delete a record. Returns whether a record was actually deleted.
    fn delete(&self, id: MemoryId) -> Result<bool>;

    /// Overwrite a record's strength (clamped to [0, 1]).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReverieError::MemoryNotFound`] if no record has
    /// the given id.
    fn update_strength(&self, id: MemoryId, strength: f32) -> Result<()>;

    /// Records created before `cutoff` with strength > 0 — the decay
    /// cycle's working set.
    fn decay_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<MemoryRecord>>;

    /// Delete every record created before `horizon` regardless of
    /// strength, returning the removed records so index entries and
    /// cached contexts can be cleaned up.
    fn purge_older_than(&self, horizon: DateTime<Utc>) -> Result<Vec<MemoryRecord>>;

    /// Every record owned by an agent (index rebuild support).
    fn records_for_agent(&self, agent_id: &AgentId) -> Result<Vec<MemoryRecord>>;

    /// Every record in the store (full index rebuild).
    fn all_records(&self) -> Result<Vec<MemoryRecord>>;

    /// Create or update the relationship for a composite key, applying
    /// the update's clamped dimensions and refreshing the interaction
    /// timestamp. Unsupplied dimensions default to 0 on creation and are
    /// left untouched on update.
    fn upsert_relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
        update: &RelationshipUpdate,
        now: DateTime<Utc>,
    ) -> Result<RelationshipRecord>;

    /// Fetch the relationship for a composite key, if one exists.
    fn relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
    ) -> Result<Option<RelationshipRecord>>;

    /// An agent's relationships, most recent interaction first, bounded
    /// by `limit`.
    fn relationships_for(&self, agent_id: &AgentId, limit: usize)
        -> Result<Vec<RelationshipRecord>>;

    /// Fetch an agent's stored profile, if any.
    fn agent_profile(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>>;

    /// Store (upsert) an agent's profile.
    fn put_agent_profile(&self, profile: &AgentProfile) -> Result<()>;
}
