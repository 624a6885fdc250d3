//! In-memory (ephemeral) backend.
//!
//! Holds everything in process-local hash maps behind `parking_lot`
//! read/write locks. This is the ephemeral store variant: importance is
//! clamped to [1, 10] on create (a zero-importance ephemeral memory is
//! not worth holding), and the decay cycle's retention-horizon purge is
//! expected to run against it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, ReverieError};
use crate::record::{MemoryFilter, MemoryRecord, RelationshipRecord, RelationshipUpdate};
use crate::store::MemoryBackend;
use crate::types::{AgentId, AgentProfile, CounterpartyKind, MemoryId};

type RelationshipKey = (AgentId, AgentId, CounterpartyKind);

/// Ephemeral backend over process-local maps.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<MemoryId, MemoryRecord>>,
    relationships: RwLock<HashMap<RelationshipKey, RelationshipRecord>>,
    profiles: RwLock<HashMap<AgentId, AgentProfile>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored memory records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

impl MemoryBackend for InMemoryBackend {
    fn create(&self, mut record: MemoryRecord) -> Result<MemoryId> {
        // Ephemeral variant: importance floor of 1.
        record.importance = record.importance.clamp(1, crate::record::MAX_IMPORTANCE);
        record.strength = record.strength.clamp(0.0, 1.0);

        let id = record.id;
        self.records.write().insert(id, record);
        debug!(memory = %id, "created in-memory record");
        Ok(id)
    }

    fn get(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    fn find(&self, agent_id: &AgentId, filter: &MemoryFilter) -> Result<Vec<MemoryRecord>> {
        let records = self.records.read();
        let mut matched: Vec<MemoryRecord> = records
            .values()
            .filter(|r| &r.agent_id == agent_id && filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    fn delete(&self, id: MemoryId) -> Result<bool> {
        Ok(self.records.write().remove(&id).is_some())
    }

    fn update_strength(&self, id: MemoryId, strength: f32) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or(ReverieError::MemoryNotFound(id))?;
        record.strength = strength.clamp(0.0, 1.0);
        Ok(())
    }

    fn decay_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<MemoryRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| r.created_at < cutoff && r.strength > 0.0)
            .cloned()
            .collect())
    }

    fn purge_older_than(&self, horizon: DateTime<Utc>) -> Result<Vec<MemoryRecord>> {
        let mut records = self.records.write();
        let doomed: Vec<MemoryId> = records
            .values()
            .filter(|r| r.created_at < horizon)
            .map(|r| r.id)
            .collect();
        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(record) = records.remove(&id) {
                removed.push(record);
            }
        }
        Ok(removed)
    }

    fn records_for_agent(&self, agent_id: &AgentId) -> Result<Vec<MemoryRecord>> {
        self.find(agent_id, &MemoryFilter::default())
    }

    fn all_records(&self) -> Result<Vec<MemoryRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn upsert_relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
        update: &RelationshipUpdate,
        now: DateTime<Utc>,
    ) -> Result<RelationshipRecord> {
        let key = (agent_id.clone(), counterparty_id.clone(), kind);
        let mut relationships = self.relationships.write();
        let record = relationships.entry(key).or_insert_with(|| {
            RelationshipRecord::neutral(agent_id.clone(), counterparty_id.clone(), kind, now)
        });
        record.apply(update, now);
        Ok(record.clone())
    }

    fn relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
    ) -> Result<Option<RelationshipRecord>> {
        let key = (agent_id.clone(), counterparty_id.clone(), kind);
        Ok(self.relationships.read().get(&key).cloned())
    }

    fn relationships_for(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<RelationshipRecord>> {
        let relationships = self.relationships.read();
        let mut matched: Vec<RelationshipRecord> = relationships
            .values()
            .filter(|r| &r.agent_id == agent_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.last_interaction_at.cmp(&a.last_interaction_at));
        matched.truncate(limit);
        Ok(matched)
    }

    fn agent_profile(&self, agent_id: &AgentId) -> Result<Option<AgentProfile>> {
        Ok(self.profiles.read().get(agent_id).cloned())
    }

    fn put_agent_profile(&self, profile: &AgentProfile) -> Result<()> {
        self.profiles
            .write()
            .insert(profile.agent_id.clone(), profile.clone());
        Ok(())
    }
}
