//! Core type definitions for the reverie memory system.
//!
//! All types are serializable and cheap to clone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier for any agent or counterparty (NPC, companion, player) known
/// to the game server. Agent ids are assigned by the server (e.g. `npc-1`),
/// not by this engine, so they are opaque strings rather than UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create an agent id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a memory record, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random memory ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Context & counterparty taxonomies
// ---------------------------------------------------------------------------

/// The kind of interaction a memory was formed in.
///
/// Serialized in `SCREAMING_SNAKE_CASE` to match the rows the legacy
/// server wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextType {
    /// A dialogue exchange with a player or another NPC.
    Conversation,
    /// A world event the agent participated in or witnessed.
    Event,
    /// Something the agent observed without participating.
    Observation,
    /// An economic exchange (shop, barter, contract).
    Trade,
    /// A fight the agent was involved in.
    Combat,
}

impl ContextType {
    /// Stable string form used in persistence and index keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "CONVERSATION",
            Self::Event => "EVENT",
            Self::Observation => "OBSERVATION",
            Self::Trade => "TRADE",
            Self::Combat => "COMBAT",
        }
    }
}

impl FromStr for ContextType {
    type Err = crate::error::ReverieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONVERSATION" => Ok(Self::Conversation),
            "EVENT" => Ok(Self::Event),
            "OBSERVATION" => Ok(Self::Observation),
            "TRADE" => Ok(Self::Trade),
            "COMBAT" => Ok(Self::Combat),
            other => Err(crate::error::ReverieError::Serialization(format!(
                "unknown context type: {other}"
            ))),
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of entity sits on the other side of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterpartyKind {
    /// A human player character.
    Player,
    /// Another AI-controlled NPC.
    Npc,
    /// A faction (collective counterparty).
    Faction,
}

impl CounterpartyKind {
    /// Stable string form used in persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "PLAYER",
            Self::Npc => "NPC",
            Self::Faction => "FACTION",
        }
    }
}

impl FromStr for CounterpartyKind {
    type Err = crate::error::ReverieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLAYER" => Ok(Self::Player),
            "NPC" => Ok(Self::Npc),
            "FACTION" => Ok(Self::Faction),
            other => Err(crate::error::ReverieError::Serialization(format!(
                "unknown counterparty kind: {other}"
            ))),
        }
    }
}

impl fmt::Display for CounterpartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Emotional state
// ---------------------------------------------------------------------------

/// Named-dimension emotional state for an agent. Each axis ranges 0.0–1.0.
///
/// Explicit fields (rather than an open map) so an invalid dimension is a
/// compile-time error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    /// Contentment / joy.
    pub happiness: f32,
    /// Hostility / irritation.
    pub anger: f32,
    /// Perceived threat.
    pub fear: f32,
    /// Arousal / anticipation.
    pub excitement: f32,
    /// Pressure / overwhelm.
    pub stress: f32,
    /// Self-assuredness.
    pub confidence: f32,
}

impl EmotionalState {
    /// Baseline state used when an agent has no stored profile.
    pub const NEUTRAL: Self = Self {
        happiness: 0.0,
        anger: 0.0,
        fear: 0.0,
        excitement: 0.0,
        stress: 0.0,
        confidence: 0.0,
    };

    /// Create a new emotional state, clamping every axis to [0, 1].
    #[must_use]
    pub fn new(
        happiness: f32,
        anger: f32,
        fear: f32,
        excitement: f32,
        stress: f32,
        confidence: f32,
    ) -> Self {
        Self {
            happiness: happiness.clamp(0.0, 1.0),
            anger: anger.clamp(0.0, 1.0),
            fear: fear.clamp(0.0, 1.0),
            excitement: excitement.clamp(0.0, 1.0),
            stress: stress.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Name of the dimension with the maximum value.
    ///
    /// Ties break toward the first-declared field, so a fully neutral
    /// state reports `"happiness"`.
    #[must_use]
    pub fn dominant_emotion(&self) -> &'static str {
        let axes = [
            ("happiness", self.happiness),
            ("anger", self.anger),
            ("fear", self.fear),
            ("excitement", self.excitement),
            ("stress", self.stress),
            ("confidence", self.confidence),
        ];
        let mut best = axes[0];
        for axis in &axes[1..] {
            if axis.1 > best.1 {
                best = *axis;
            }
        }
        best.0
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

// ---------------------------------------------------------------------------
// Personality profile
// ---------------------------------------------------------------------------

/// Named-dimension personality profile. Each trait ranges 0.0–1.0 and
/// biases how the dialogue generator plays the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    /// How confrontational the agent is.
    pub aggressiveness: f32,
    /// How strongly the agent sticks with allies.
    pub loyalty: f32,
    /// How sharp / well-informed the agent acts.
    pub intelligence: f32,
    /// How money-motivated the agent is.
    pub greed: f32,
    /// How playful the agent's dialogue reads.
    pub humor: f32,
    /// How honest the agent is in dealings.
    pub trustworthiness: f32,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            aggressiveness: 0.5,
            loyalty: 0.5,
            intelligence: 0.5,
            greed: 0.5,
            humor: 0.5,
            trustworthiness: 0.5,
        }
    }
}

/// Stored per-agent profile — the source of the emotional and personality
/// summaries handed to the dialogue generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// The agent this profile belongs to.
    pub agent_id: AgentId,
    /// Current emotional state.
    pub emotional_state: EmotionalState,
    /// Long-lived personality traits.
    pub personality: PersonalityProfile,
}

impl AgentProfile {
    /// Fixed neutral baseline used when no profile is stored.
    #[must_use]
    pub fn neutral(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            emotional_state: EmotionalState::NEUTRAL,
            personality: PersonalityProfile::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory Embedding Vector
// ---------------------------------------------------------------------------

/// A dense vector embedding for semantic similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Cosine similarity between two embeddings.
    /// Returns 0.0 on dimension mismatch or zero-magnitude vectors.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom < f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}
