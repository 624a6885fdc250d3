//! Memory and relationship record types — the data model owned by the store.
//!
//! [`MemoryRecord`]s are append-only: created by `remember`, mutated only by
//! the decay engine (strength), deleted only by decay or `forget`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AgentId, ContextType, CounterpartyKind, Embedding, EmotionalState, MemoryId,
    PersonalityProfile};

/// Maximum stored content length in characters.
pub const MAX_CONTENT_CHARS: usize = 2_000;

/// Maximum number of derived tags per record.
pub const MAX_TAGS: usize = 12;

/// Importance ceiling — caller-assigned salience saturates here.
pub const MAX_IMPORTANCE: u8 = 10;

// ---------------------------------------------------------------------------
// MemoryRecord
// ---------------------------------------------------------------------------

/// A single contextual memory owned by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, assigned at creation. Immutable.
    pub id: MemoryId,
    /// The agent that owns this memory.
    pub agent_id: AgentId,
    /// The player/NPC this memory originates from (attribution only).
    pub counterparty_id: Option<AgentId>,
    /// What kind of interaction formed this memory.
    pub context_type: ContextType,
    /// Free-text content, bounded to [`MAX_CONTENT_CHARS`].
    pub content: String,
    /// Free-form emotional label (e.g. "happy").
    pub emotional_context: String,
    /// Caller-assigned salience, clamped into the backend's valid range.
    pub importance: u8,
    /// Decay factor in [0, 1]. Starts at 1.0; only the decay engine
    /// lowers it.
    pub strength: f32,
    /// Keywords derived from the content at write time.
    pub tags: Vec<String>,
    /// Semantic embedding, present only when a provider was configured
    /// at write time.
    pub embedding: Option<Embedding>,
    /// Creation timestamp. Immutable.
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Build a record from caller input: assigns an id, derives tags,
    /// truncates over-long content and clamps importance to [0, 10].
    /// Out-of-range importance is clamped, not rejected.
    #[must_use]
    pub fn from_new(new: NewMemory, embedding: Option<Embedding>, now: DateTime<Utc>) -> Self {
        let content = bound_content(&new.content);
        let tags = derive_tags(&content, new.context_type);
        Self {
            id: MemoryId::new(),
            agent_id: new.agent_id,
            counterparty_id: new.counterparty_id,
            context_type: new.context_type,
            content,
            emotional_context: new.emotional_context,
            importance: clamp_importance(new.importance),
            strength: 1.0,
            tags,
            embedding,
            created_at: now,
        }
    }
}

/// Caller-supplied input for `remember`.
#[derive(Debug, Clone)]
pub struct NewMemory {
    /// The agent that will own the memory.
    pub agent_id: AgentId,
    /// Optional originating player/NPC.
    pub counterparty_id: Option<AgentId>,
    /// What kind of interaction this was.
    pub context_type: ContextType,
    /// Free-text content.
    pub content: String,
    /// Free-form emotional label.
    pub emotional_context: String,
    /// Salience. Accepted as a wide integer so out-of-range callers are
    /// clamped rather than rejected.
    pub importance: i32,
}

impl NewMemory {
    /// Create a new memory input with a neutral emotional label.
    pub fn new(
        agent_id: impl Into<AgentId>,
        context_type: ContextType,
        content: impl Into<String>,
        importance: i32,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            counterparty_id: None,
            context_type,
            content: content.into(),
            emotional_context: "neutral".to_string(),
            importance,
        }
    }

    /// Attribute the memory to a counterparty.
    #[must_use]
    pub fn with_counterparty(mut self, counterparty: impl Into<AgentId>) -> Self {
        self.counterparty_id = Some(counterparty.into());
        self
    }

    /// Set the emotional label.
    #[must_use]
    pub fn with_emotional_context(mut self, label: impl Into<String>) -> Self {
        self.emotional_context = label.into();
        self
    }
}

/// Clamp a caller-supplied importance into [0, `MAX_IMPORTANCE`].
#[must_use]
pub fn clamp_importance(raw: i32) -> u8 {
    raw.clamp(0, i32::from(MAX_IMPORTANCE)) as u8
}

/// Truncate content to [`MAX_CONTENT_CHARS`] on a character boundary.
fn bound_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        content.to_string()
    } else {
        content.chars().take(MAX_CONTENT_CHARS).collect()
    }
}

/// Derive the tag set for a record: the context-type label plus distinct
/// lowercase content words longer than 3 characters, capped at
/// [`MAX_TAGS`].
#[must_use]
pub fn derive_tags(content: &str, context_type: ContextType) -> Vec<String> {
    let mut tags = vec![context_type.as_str().to_ascii_lowercase()];
    for word in content.split(|c: char| !c.is_alphanumeric()) {
        if tags.len() >= MAX_TAGS {
            break;
        }
        let word = word.to_lowercase();
        if word.len() > 3 && !tags.contains(&word) {
            tags.push(word);
        }
    }
    tags
}

// ---------------------------------------------------------------------------
// MemoryFilter
// ---------------------------------------------------------------------------

/// Filters applied when querying memories. Every supplied field must
/// equal the corresponding record field exactly; the time range is
/// inclusive on both bounds.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Exact context-type match.
    pub context_type: Option<ContextType>,
    /// Exact counterparty match.
    pub counterparty_id: Option<AgentId>,
    /// Minimum importance (inclusive).
    pub min_importance: Option<u8>,
    /// Earliest creation time (inclusive).
    pub from: Option<DateTime<Utc>>,
    /// Latest creation time (inclusive).
    pub to: Option<DateTime<Utc>>,
}

impl MemoryFilter {
    /// Whether a record satisfies every supplied filter field.
    #[must_use]
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(ct) = self.context_type {
            if record.context_type != ct {
                return false;
            }
        }
        if let Some(ref cp) = self.counterparty_id {
            if record.counterparty_id.as_ref() != Some(cp) {
                return false;
            }
        }
        if let Some(min) = self.min_importance {
            if record.importance < min {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.created_at > to {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// RelationshipRecord
// ---------------------------------------------------------------------------

/// Bounded trust state between an agent and one counterparty.
///
/// At most one record exists per `(agent_id, counterparty_id, kind)`
/// key; upserts update it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// The agent holding the relationship.
    pub agent_id: AgentId,
    /// The other party.
    pub counterparty_id: AgentId,
    /// What kind of entity the counterparty is.
    pub kind: CounterpartyKind,
    /// Willingness to rely on the counterparty. [-1, 1].
    pub trust: f32,
    /// Regard for the counterparty's standing. [-1, 1].
    pub respect: f32,
    /// Perceived threat from the counterparty. [-1, 1].
    pub fear: f32,
    /// Commitment to the counterparty. [-1, 1].
    pub loyalty: f32,
    /// Refreshed on every upsert, whether or not dimensions changed.
    pub last_interaction_at: DateTime<Utc>,
}

impl RelationshipRecord {
    /// A neutral relationship: all dimensions zero. Returned for pairs
    /// that have never interacted — absence is a valid state, not an
    /// error.
    #[must_use]
    pub fn neutral(
        agent_id: AgentId,
        counterparty_id: AgentId,
        kind: CounterpartyKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id,
            counterparty_id,
            kind,
            trust: 0.0,
            respect: 0.0,
            fear: 0.0,
            loyalty: 0.0,
            last_interaction_at: now,
        }
    }

    /// Apply an update: each supplied dimension is clamped to [-1, 1]
    /// and stored; unsupplied dimensions are left untouched.
    pub fn apply(&mut self, update: &RelationshipUpdate, now: DateTime<Utc>) {
        if let Some(trust) = update.trust {
            self.trust = trust.clamp(-1.0, 1.0);
        }
        if let Some(respect) = update.respect {
            self.respect = respect.clamp(-1.0, 1.0);
        }
        if let Some(fear) = update.fear {
            self.fear = fear.clamp(-1.0, 1.0);
        }
        if let Some(loyalty) = update.loyalty {
            self.loyalty = loyalty.clamp(-1.0, 1.0);
        }
        self.last_interaction_at = now;
    }
}

/// Per-dimension relationship update. `None` leaves a dimension untouched
/// (or at 0.0 on first creation).
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipUpdate {
    /// New trust value, if supplied.
    pub trust: Option<f32>,
    /// New respect value, if supplied.
    pub respect: Option<f32>,
    /// New fear value, if supplied.
    pub fear: Option<f32>,
    /// New loyalty value, if supplied.
    pub loyalty: Option<f32>,
}

impl RelationshipUpdate {
    /// An update touching no dimensions — still refreshes
    /// `last_interaction_at`.
    #[must_use]
    pub fn touch() -> Self {
        Self::default()
    }

    /// Set the trust dimension.
    #[must_use]
    pub fn trust(mut self, value: f32) -> Self {
        self.trust = Some(value);
        self
    }

    /// Set the respect dimension.
    #[must_use]
    pub fn respect(mut self, value: f32) -> Self {
        self.respect = Some(value);
        self
    }

    /// Set the fear dimension.
    #[must_use]
    pub fn fear(mut self, value: f32) -> Self {
        self.fear = Some(value);
        self
    }

    /// Set the loyalty dimension.
    #[must_use]
    pub fn loyalty(mut self, value: f32) -> Self {
        self.loyalty = Some(value);
        self
    }
}

// ---------------------------------------------------------------------------
// MemoryContext (derived read model)
// ---------------------------------------------------------------------------

/// Projection of a memory record handed to the dialogue generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnippet {
    /// Source record id.
    pub id: MemoryId,
    /// What kind of interaction formed the memory.
    pub context_type: ContextType,
    /// Memory content.
    pub content: String,
    /// Emotional label at formation time.
    pub emotional_context: String,
    /// Salience.
    pub importance: u8,
    /// When the memory was formed.
    pub created_at: DateTime<Utc>,
}

impl From<&MemoryRecord> for MemorySnippet {
    fn from(record: &MemoryRecord) -> Self {
        Self {
            id: record.id,
            context_type: record.context_type,
            content: record.content.clone(),
            emotional_context: record.emotional_context.clone(),
            importance: record.importance,
            created_at: record.created_at,
        }
    }
}

/// The bounded, ranked snapshot handed to a generation caller.
///
/// Computed fresh from the store on cache miss; the cache owns the cached
/// copy and is the only authority on whether it is fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    /// The agent the context describes.
    pub agent_id: AgentId,
    /// Up to 20 memories, importance desc then recency desc.
    pub recent_memories: Vec<MemorySnippet>,
    /// Up to 10 relationships, most recent interaction first.
    pub relationships: Vec<RelationshipRecord>,
    /// Current emotional state (neutral baseline when no profile exists).
    pub emotional_state: EmotionalState,
    /// Name of the strongest emotional axis.
    pub dominant_emotion: String,
    /// Personality traits (balanced baseline when no profile exists).
    pub personality: PersonalityProfile,
}

impl MemoryContext {
    /// The neutral default context — returned when an agent is unknown or
    /// the store is unreachable, so a conversation turn never hard-fails.
    #[must_use]
    pub fn neutral(agent_id: AgentId) -> Self {
        let emotional_state = EmotionalState::NEUTRAL;
        Self {
            agent_id,
            recent_memories: Vec::new(),
            relationships: Vec::new(),
            dominant_emotion: emotional_state.dominant_emotion().to_string(),
            emotional_state,
            personality: PersonalityProfile::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new() -> NewMemory {
        NewMemory::new("npc-1", ContextType::Conversation, "Said hello", 8)
            .with_counterparty("player-9")
            .with_emotional_context("happy")
    }

    #[test]
    fn from_new_assigns_defaults() {
        let record = MemoryRecord::from_new(sample_new(), None, Utc::now());
        assert_eq!(record.agent_id, AgentId::from("npc-1"));
        assert_eq!(record.importance, 8);
        assert!((record.strength - 1.0).abs() < f32::EPSILON);
        assert!(record.embedding.is_none());
    }

    #[test]
    fn importance_clamped_not_rejected() {
        assert_eq!(clamp_importance(-100), 0);
        assert_eq!(clamp_importance(0), 0);
        assert_eq!(clamp_importance(7), 7);
        assert_eq!(clamp_importance(100), 10);
    }

    #[test]
    fn content_is_bounded() {
        let long = "x".repeat(MAX_CONTENT_CHARS * 2);
        let new = NewMemory::new("npc-1", ContextType::Event, long, 5);
        let record = MemoryRecord::from_new(new, None, Utc::now());
        assert_eq!(record.content.chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn tags_include_context_and_keywords() {
        let new = NewMemory::new(
            "npc-1",
            ContextType::Trade,
            "Sold three healing potions to the wandering knight",
            5,
        );
        let record = MemoryRecord::from_new(new, None, Utc::now());
        assert!(record.tags.contains(&"trade".to_string()));
        assert!(record.tags.contains(&"healing".to_string()));
        assert!(record.tags.contains(&"potions".to_string()));
        // Short words are skipped.
        assert!(!record.tags.contains(&"the".to_string()));
        assert!(record.tags.len() <= MAX_TAGS);
    }

    #[test]
    fn tags_are_deduplicated() {
        let new = NewMemory::new(
            "npc-1",
            ContextType::Event,
            "gold gold gold everywhere, gold",
            5,
        );
        let record = MemoryRecord::from_new(new, None, Utc::now());
        let gold_count = record.tags.iter().filter(|t| *t == "gold").count();
        assert_eq!(gold_count, 1);
    }

    #[test]
    fn filter_matches_all_supplied_fields() {
        let record = MemoryRecord::from_new(sample_new(), None, Utc::now());

        assert!(MemoryFilter::default().matches(&record));

        let filter = MemoryFilter {
            context_type: Some(ContextType::Conversation),
            counterparty_id: Some(AgentId::from("player-9")),
            min_importance: Some(8),
            ..Default::default()
        };
        assert!(filter.matches(&record));

        let wrong_type = MemoryFilter {
            context_type: Some(ContextType::Combat),
            ..Default::default()
        };
        assert!(!wrong_type.matches(&record));

        let too_important = MemoryFilter {
            min_importance: Some(9),
            ..Default::default()
        };
        assert!(!too_important.matches(&record));
    }

    #[test]
    fn filter_time_range_is_inclusive() {
        let record = MemoryRecord::from_new(sample_new(), None, Utc::now());
        let filter = MemoryFilter {
            from: Some(record.created_at),
            to: Some(record.created_at),
            ..Default::default()
        };
        assert!(filter.matches(&record));
    }

    #[test]
    fn relationship_update_clamps_supplied_dimensions() {
        let now = Utc::now();
        let mut rel = RelationshipRecord::neutral(
            AgentId::from("npc-1"),
            AgentId::from("player-9"),
            CounterpartyKind::Player,
            now,
        );
        rel.apply(&RelationshipUpdate::touch().trust(1.5).fear(-3.0), now);
        assert_eq!(rel.trust, 1.0);
        assert_eq!(rel.fear, -1.0);
        // Untouched dimensions stay at their prior value.
        assert_eq!(rel.respect, 0.0);
        assert_eq!(rel.loyalty, 0.0);
    }

    #[test]
    fn touch_refreshes_timestamp_only() {
        let t0 = Utc::now();
        let mut rel = RelationshipRecord::neutral(
            AgentId::from("npc-1"),
            AgentId::from("player-9"),
            CounterpartyKind::Player,
            t0,
        );
        rel.trust = 0.4;
        let t1 = t0 + chrono::Duration::seconds(60);
        rel.apply(&RelationshipUpdate::touch(), t1);
        assert_eq!(rel.trust, 0.4);
        assert_eq!(rel.last_interaction_at, t1);
    }
}
