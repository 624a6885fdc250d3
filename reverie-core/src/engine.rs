//! The memory engine facade — the one entry point hosts interact with.
//!
//! Wires the backend, cache, index, retrieval, relationship tracking, and
//! decay together. All collaborators are injected through
//! [`MemoryEngineBuilder`]; the engine holds no global state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{ContextCache, LruContextCache};
use crate::config::EngineConfig;
use crate::decay::{DecayEngine, DecayReport};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::SecondaryIndex;
use crate::record::{MemoryContext, MemoryFilter, MemoryRecord, MemorySnippet, NewMemory,
    RelationshipUpdate};
use crate::relationship::RelationshipTracker;
use crate::retrieval::RetrievalEngine;
use crate::store::MemoryBackend;
use crate::types::{AgentId, AgentProfile, CounterpartyKind, MemoryId};

/// Context summary shown for agents with no memories.
const NO_MEMORIES_SUMMARY: &str = "No relevant memories.";

/// The memory & recall engine.
///
/// Writes for one agent are serialized through a per-agent lock; writes
/// for different agents proceed concurrently. Every write invalidates the
/// agent's cached context before returning, so a context read racing a
/// write may briefly serve the pre-write context but never an arbitrarily
/// stale one: eventual consistency within one cache TTL.
pub struct MemoryEngine {
    backend: Arc<dyn MemoryBackend>,
    cache: Arc<dyn ContextCache>,
    retrieval: RetrievalEngine,
    tracker: RelationshipTracker,
    decay: DecayEngine,
    index: RwLock<SecondaryIndex>,
    agent_locks: DashMap<AgentId, Arc<Mutex<()>>>,
    config: EngineConfig,
}

impl MemoryEngine {
    /// Start building an engine over a backend.
    #[must_use]
    pub fn builder(backend: Arc<dyn MemoryBackend>) -> MemoryEngineBuilder {
        MemoryEngineBuilder::new(backend)
    }

    fn agent_lock(&self, agent_id: &AgentId) -> Arc<Mutex<()>> {
        Arc::clone(&self.agent_locks.entry(agent_id.clone()).or_default())
    }

    /// Store a new memory for an agent.
    ///
    /// Content is truncated and importance clamped rather than rejected.
    /// When an embedding provider is configured the content is embedded at
    /// write time; an embedding failure stores the record without one and
    /// logs a warning. The agent's cached context is invalidated before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn remember(&self, new: NewMemory) -> Result<MemoryId> {
        let agent_id = new.agent_id.clone();
        let embedding = match self.retrieval.provider() {
            Some(provider) => match provider.embed(&new.content) {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!(agent = %agent_id, error = %e, "embedding failed, storing without one");
                    None
                }
            },
            None => None,
        };
        let record = MemoryRecord::from_new(new, embedding, Utc::now());

        let lock = self.agent_lock(&agent_id);
        let _guard = lock.lock();

        let id = self.backend.create(record.clone())?;
        self.index.write().insert(&record);
        self.cache.invalidate(&agent_id);
        debug!(agent = %agent_id, memory = %id, importance = record.importance, "memory stored");
        Ok(id)
    }

    /// Delete a memory by id. Returns whether a record was deleted;
    /// deleting an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn forget(&self, id: MemoryId) -> Result<bool> {
        let Some(record) = self.backend.get(id)? else {
            return Ok(false);
        };

        let lock = self.agent_lock(&record.agent_id);
        let _guard = lock.lock();

        let deleted = self.backend.delete(id)?;
        if deleted {
            self.index.write().remove(&record);
            self.cache.invalidate(&record.agent_id);
            debug!(agent = %record.agent_id, memory = %id, "memory forgotten");
        }
        Ok(deleted)
    }

    /// Search an agent's memories: hybrid semantic/keyword ranking with
    /// an importance-dominant final re-rank. An empty query returns the
    /// agent's memories ranked by importance then recency.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn recall(
        &self,
        agent_id: &AgentId,
        query: &str,
        filter: &MemoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>> {
        self.retrieval.search(agent_id, query, filter, limit)
    }

    /// Create or update a relationship dimension set for a composite
    /// (agent, counterparty, kind) key. Dimensions are clamped to [-1, 1];
    /// the interaction timestamp is always refreshed. Invalidates the
    /// agent's cached context.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn upsert_relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
        update: &RelationshipUpdate,
    ) -> Result<crate::record::RelationshipRecord> {
        let lock = self.agent_lock(agent_id);
        let _guard = lock.lock();

        let record = self.tracker.upsert(agent_id, counterparty_id, kind, update)?;
        self.cache.invalidate(agent_id);
        Ok(record)
    }

    /// Read a relationship; pairs that never interacted read as neutral.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn relationship(
        &self,
        agent_id: &AgentId,
        counterparty_id: &AgentId,
        kind: CounterpartyKind,
    ) -> Result<crate::record::RelationshipRecord> {
        self.tracker.read(agent_id, counterparty_id, kind)
    }

    /// Store (upsert) an agent's emotional/personality profile.
    /// Invalidates the agent's cached context.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn put_agent_profile(&self, profile: &AgentProfile) -> Result<()> {
        let lock = self.agent_lock(&profile.agent_id);
        let _guard = lock.lock();

        self.backend.put_agent_profile(profile)?;
        self.cache.invalidate(&profile.agent_id);
        Ok(())
    }

    /// Assemble the bounded context handed to a dialogue generator.
    ///
    /// Cache-aside: a fresh cached context is returned verbatim; on miss
    /// the context is assembled from the store and cached with the
    /// configured TTL. Infallible — if the store is unreachable the
    /// neutral context is returned (and not cached) so a conversation
    /// turn never hard-fails.
    #[must_use]
    pub fn get_context(&self, agent_id: &AgentId) -> MemoryContext {
        if let Some(context) = self.cache.get(agent_id) {
            debug!(agent = %agent_id, "context cache hit");
            return context;
        }

        match self.assemble_context(agent_id) {
            Ok(context) => {
                let ttl = Duration::from_secs(self.config.cache.ttl_seconds);
                self.cache.put(agent_id, context.clone(), ttl);
                context
            }
            Err(e) => {
                warn!(agent = %agent_id, error = %e, "context assembly failed, serving neutral");
                MemoryContext::neutral(agent_id.clone())
            }
        }
    }

    fn assemble_context(&self, agent_id: &AgentId) -> Result<MemoryContext> {
        let memories = self.retrieval.search(
            agent_id,
            "",
            &MemoryFilter::default(),
            Some(self.config.retrieval.context_memory_limit),
        )?;
        let relationships = self
            .tracker
            .recent(agent_id, self.config.retrieval.context_relationship_limit)?;
        let profile = self
            .backend
            .agent_profile(agent_id)?
            .unwrap_or_else(|| AgentProfile::neutral(agent_id.clone()));

        Ok(MemoryContext {
            agent_id: agent_id.clone(),
            recent_memories: memories.iter().map(MemorySnippet::from).collect(),
            relationships,
            dominant_emotion: profile.emotional_state.dominant_emotion().to_string(),
            emotional_state: profile.emotional_state,
            personality: profile.personality,
        })
    }

    /// One-line-per-memory text summary of what the agent remembers,
    /// optionally narrowed to a topic query. Agents with no matching
    /// memories get a fixed no-memories line.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn get_context_summary(&self, agent_id: &AgentId, topic: Option<&str>) -> Result<String> {
        let memories = self.retrieval.search(
            agent_id,
            topic.unwrap_or(""),
            &MemoryFilter::default(),
            Some(self.config.retrieval.context_memory_limit),
        )?;
        if memories.is_empty() {
            return Ok(NO_MEMORIES_SUMMARY.to_string());
        }

        let mut summary = String::new();
        for memory in &memories {
            summary.push_str(&format!(
                "[{}] ({}) {}\n",
                memory.context_type,
                memory.emotional_context,
                memory.content
            ));
        }
        Ok(summary)
    }

    /// Run one decay cycle now: lower the strength of aged records,
    /// delete those at the floor, and apply the retention horizon if one
    /// is configured. The engine spawns no timers; the host calls this on
    /// its own cadence.
    pub fn apply_decay_cycle(&self) -> DecayReport {
        let report = self.decay.run_cycle(&self.index, self.cache.as_ref(), Utc::now());
        if report.deleted > 0 || report.purged > 0 {
            let pruned = self.index.write().prune_empty();
            debug!(pruned, "index buckets pruned after decay");
        }
        report
    }

    /// Rebuild the secondary index from the store. Returns the number of
    /// records indexed.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn rebuild_index(&self) -> Result<usize> {
        let records = self.backend.all_records()?;
        let count = records.len();
        *self.index.write() = SecondaryIndex::rebuild(&records);
        info!(records = count, "secondary index rebuilt");
        Ok(count)
    }

    /// Shared read access to the secondary index.
    pub fn with_index<T>(&self, f: impl FnOnce(&SecondaryIndex) -> T) -> T {
        f(&self.index.read())
    }
}

/// Builder for [`MemoryEngine`]. The backend is required; the cache,
/// embedding provider, and config have working defaults.
pub struct MemoryEngineBuilder {
    backend: Arc<dyn MemoryBackend>,
    cache: Option<Arc<dyn ContextCache>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    config: EngineConfig,
}

impl MemoryEngineBuilder {
    /// Start a builder over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self {
            backend,
            cache: None,
            provider: None,
            config: EngineConfig::default(),
        }
    }

    /// Use a specific context cache (default: an LRU cache sized from
    /// config).
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn ContextCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Enable semantic retrieval with an embedding provider.
    #[must_use]
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use a specific configuration (default: [`EngineConfig::default`]).
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine and populate its index from the store.
    ///
    /// # Errors
    ///
    /// Propagates backend failures while loading existing records.
    pub fn build(self) -> Result<MemoryEngine> {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(LruContextCache::new(self.config.cache.capacity)));
        let index = SecondaryIndex::rebuild(&self.backend.all_records()?);

        Ok(MemoryEngine {
            retrieval: RetrievalEngine::new(
                Arc::clone(&self.backend),
                self.provider.clone(),
                self.config.retrieval.clone(),
            ),
            tracker: RelationshipTracker::new(Arc::clone(&self.backend)),
            decay: DecayEngine::new(Arc::clone(&self.backend), self.config.decay.clone()),
            index: RwLock::new(index),
            agent_locks: DashMap::new(),
            backend: self.backend,
            cache,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBackend;
    use crate::types::ContextType;

    fn engine() -> MemoryEngine {
        MemoryEngine::builder(Arc::new(InMemoryBackend::new()))
            .build()
            .expect("build")
    }

    #[test]
    fn remember_then_context_includes_memory() {
        let engine = engine();
        let agent = AgentId::from("npc-1");
        engine
            .remember(NewMemory::new("npc-1", ContextType::Conversation, "Said hello", 8))
            .expect("remember");

        let context = engine.get_context(&agent);
        assert_eq!(context.recent_memories.len(), 1);
        assert_eq!(context.recent_memories[0].content, "Said hello");
        assert_eq!(context.recent_memories[0].importance, 8);
    }

    #[test]
    fn forget_removes_memory_everywhere() {
        let engine = engine();
        let agent = AgentId::from("npc-1");
        let id = engine
            .remember(NewMemory::new("npc-1", ContextType::Event, "A dragon passed", 6))
            .expect("remember");

        assert!(engine.forget(id).expect("forget"));
        assert!(!engine.forget(id).expect("second forget is a no-op"));

        let results = engine
            .recall(&agent, "dragon", &MemoryFilter::default(), None)
            .expect("recall");
        assert!(results.is_empty());
        assert!(engine.with_index(|i| i.by_tag("dragon").is_empty()));
    }

    #[test]
    fn context_is_neutral_for_unknown_agent() {
        let engine = engine();
        let context = engine.get_context(&AgentId::from("stranger"));
        assert!(context.recent_memories.is_empty());
        assert!(context.relationships.is_empty());
        assert_eq!(context.dominant_emotion, "happiness");
    }

    #[test]
    fn summary_for_empty_agent_is_fixed_line() {
        let engine = engine();
        let summary = engine
            .get_context_summary(&AgentId::from("npc-1"), None)
            .expect("summary");
        assert_eq!(summary, NO_MEMORIES_SUMMARY);
    }

    #[test]
    fn summary_lists_memories_with_topic_filter() {
        let engine = engine();
        engine
            .remember(NewMemory::new("npc-1", ContextType::Event, "Dragon burned the mill", 9))
            .expect("remember");
        engine
            .remember(NewMemory::new("npc-1", ContextType::Trade, "Sold bread", 3))
            .expect("remember");

        let summary = engine
            .get_context_summary(&AgentId::from("npc-1"), Some("dragon"))
            .expect("summary");
        assert!(summary.contains("Dragon burned the mill"));
        assert!(!summary.contains("Sold bread"));
    }

    #[test]
    fn writes_invalidate_cached_context() {
        let engine = engine();
        let agent = AgentId::from("npc-1");

        // Prime the cache with an empty context.
        let before = engine.get_context(&agent);
        assert!(before.recent_memories.is_empty());

        engine
            .remember(NewMemory::new("npc-1", ContextType::Observation, "Saw the moon rise", 4))
            .expect("remember");

        let after = engine.get_context(&agent);
        assert_eq!(after.recent_memories.len(), 1);
    }

    #[test]
    fn relationship_roundtrip_through_engine() {
        let engine = engine();
        let agent = AgentId::from("npc-1");
        let player = AgentId::from("player-9");

        engine
            .upsert_relationship(
                &agent,
                &player,
                CounterpartyKind::Player,
                &RelationshipUpdate::touch().trust(1.5),
            )
            .expect("upsert");

        let rel = engine
            .relationship(&agent, &player, CounterpartyKind::Player)
            .expect("read");
        assert_eq!(rel.trust, 1.0);

        let context = engine.get_context(&agent);
        assert_eq!(context.relationships.len(), 1);
    }

    #[test]
    fn rebuild_index_matches_store() {
        let backend = Arc::new(InMemoryBackend::new());
        let engine = MemoryEngine::builder(backend).build().expect("build");
        engine
            .remember(NewMemory::new("npc-1", ContextType::Combat, "Fought wolves", 7))
            .expect("remember");

        let count = engine.rebuild_index().expect("rebuild");
        assert_eq!(count, 1);
        assert!(engine.with_index(|i| !i.by_tag("wolves").is_empty()));
    }

    #[test]
    fn profile_shapes_context_emotion() {
        use crate::types::EmotionalState;

        let engine = engine();
        let agent = AgentId::from("npc-1");
        let mut profile = AgentProfile::neutral(agent.clone());
        profile.emotional_state = EmotionalState::new(0.1, 0.9, 0.0, 0.0, 0.0, 0.0);
        engine.put_agent_profile(&profile).expect("put profile");

        let context = engine.get_context(&agent);
        assert_eq!(context.dominant_emotion, "anger");
    }
}
