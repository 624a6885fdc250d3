//! Relationship tracking — four bounded trust dimensions per
//! (agent, counterparty) pair.
//!
//! Dimensions are independent scalars in [-1, 1]. A pair that has never
//! interacted reads as neutral (all zeros), which is a valid state, not
//! an error.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::record::{RelationshipRecord, RelationshipUpdate};
use crate::store::MemoryBackend;
use crate::types::{AgentId, CounterpartyKind};

/// Tracks relationship state against the system-of-record backend.
pub struct RelationshipTracker {
    backend: Arc<dyn MemoryBackend>,
}

impl RelationshipTracker {
    /// Create a tracker over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }

    /// Create or update the relationship for a composite key.
    ///
    /// Each supplied dimension is clamped to [-1, 1]; unsupplied
    /// dimensions are left untouched on update and default to 0 on
    /// creation. `last_interaction_at` is always refreshed, whether or
    /// not any dimension changed.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn upsert(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
        update: &RelationshipUpdate,
    ) -> Result<RelationshipRecord> {
        let record =
            self.backend
                .upsert_relationship(agent_id, counterparty_id, kind, update, Utc::now())?;
        debug!(
            agent = %agent_id,
            counterparty = %counterparty_id,
            kind = %kind,
            trust = record.trust,
            "relationship upserted"
        );
        Ok(record)
    }

    /// Read the relationship for a composite key. Absent records read as
    /// neutral.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn read(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
    ) -> Result<RelationshipRecord> {
        Ok(self
            .backend
            .relationship(agent_id, counterparty_id, kind)?
            .unwrap_or_else(|| {
                RelationshipRecord::neutral(
                    agent_id.clone(),
                    counterparty_id.clone(),
                    kind,
                    Utc::now(),
                )
            }))
    }

    /// An agent's relationships, most recent interaction first.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn recent(&self, agent_id: &AgentId, limit: usize) -> Result<Vec<RelationshipRecord>> {
        self.backend.relationships_for(agent_id, limit)
    }
}
