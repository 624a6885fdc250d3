//! Secondary index — in-process lookup acceleration over the store.
//!
//! Three mappings: (agent, context-type) → record ids, tag → record ids,
//! and counterparty → record ids in creation order. The index is a
//! performance accelerant only: the store is authoritative, and the index
//! can always be rebuilt from it with identical lookup results.

use std::collections::{HashMap, HashSet};

use crate::record::MemoryRecord;
use crate::types::{AgentId, ContextType, MemoryId};

/// Key for the (agent, context-type) mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    /// Owning agent.
    pub agent_id: AgentId,
    /// Interaction kind.
    pub context_type: ContextType,
}

/// In-process secondary index over memory records.
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    by_context: HashMap<ContextKey, HashSet<MemoryId>>,
    by_tag: HashMap<String, HashSet<MemoryId>>,
    by_counterparty: HashMap<AgentId, Vec<MemoryId>>,
}

impl SecondaryIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a record. Called synchronously with every successful store
    /// create so no entry ever dangles.
    pub fn insert(&mut self, record: &MemoryRecord) {
        let key = ContextKey {
            agent_id: record.agent_id.clone(),
            context_type: record.context_type,
        };
        self.by_context.entry(key).or_default().insert(record.id);

        for tag in &record.tags {
            self.by_tag.entry(tag.clone()).or_default().insert(record.id);
        }

        if let Some(ref counterparty) = record.counterparty_id {
            self.by_counterparty
                .entry(counterparty.clone())
                .or_default()
                .push(record.id);
        }
    }

    /// Remove a record's entries. Called synchronously with every
    /// successful store delete.
    pub fn remove(&mut self, record: &MemoryRecord) {
        let key = ContextKey {
            agent_id: record.agent_id.clone(),
            context_type: record.context_type,
        };
        if let Some(ids) = self.by_context.get_mut(&key) {
            ids.remove(&record.id);
        }

        for tag in &record.tags {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.remove(&record.id);
            }
        }

        if let Some(ref counterparty) = record.counterparty_id {
            if let Some(ids) = self.by_counterparty.get_mut(counterparty) {
                ids.retain(|id| *id != record.id);
            }
        }
    }

    /// Record ids for an (agent, context-type) pair.
    #[must_use]
    pub fn by_context(&self, agent_id: &AgentId, context_type: ContextType) -> HashSet<MemoryId> {
        let key = ContextKey {
            agent_id: agent_id.clone(),
            context_type,
        };
        self.by_context.get(&key).cloned().unwrap_or_default()
    }

    /// Record ids carrying a tag.
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> HashSet<MemoryId> {
        self.by_tag.get(tag).cloned().unwrap_or_default()
    }

    /// Record ids attributed to a counterparty, in creation order.
    #[must_use]
    pub fn by_counterparty(&self, counterparty: &AgentId) -> Vec<MemoryId> {
        self.by_counterparty
            .get(counterparty)
            .cloned()
            .unwrap_or_default()
    }

    /// Rebuild the index from the store's records. Produces lookup results
    /// identical to incrementally maintaining the index, regardless of the
    /// input order (counterparty lists are re-sorted by creation time).
    #[must_use]
    pub fn rebuild(records: &[MemoryRecord]) -> Self {
        let mut ordered: Vec<&MemoryRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.created_at);

        let mut index = Self::new();
        for record in ordered {
            index.insert(record);
        }
        index
    }

    /// Drop empty buckets left behind by removals. Run during
    /// maintenance; returns the number of buckets pruned.
    pub fn prune_empty(&mut self) -> usize {
        let before = self.by_context.len() + self.by_tag.len() + self.by_counterparty.len();
        self.by_context.retain(|_, ids| !ids.is_empty());
        self.by_tag.retain(|_, ids| !ids.is_empty());
        self.by_counterparty.retain(|_, ids| !ids.is_empty());
        before - (self.by_context.len() + self.by_tag.len() + self.by_counterparty.len())
    }

    /// Total number of non-empty buckets across all three maps.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.by_context.len() + self.by_tag.len() + self.by_counterparty.len()
    }
}
