//! Configuration for the memory & recall engine.
//!
//! Loadable from TOML; every section and field has a serde default so a
//! partial file (or none at all) yields a working engine.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decay cycle settings.
    #[serde(default)]
    pub decay: DecayConfig,
    /// Retrieval and ranking settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Context cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ReverieError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::ReverieError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

/// Settings for the periodic decay cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Strength subtracted per cycle.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
    /// Records whose decayed strength falls to or below this floor are
    /// deleted.
    #[serde(default = "default_strength_floor")]
    pub strength_floor: f32,
    /// Only records older than this many hours are decayed.
    #[serde(default = "default_age_cutoff_hours")]
    pub age_cutoff_hours: u32,
    /// When set, records older than this many days are purged regardless
    /// of strength (the ephemeral-store retention horizon).
    #[serde(default)]
    pub retention_horizon_days: Option<u32>,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            strength_floor: default_strength_floor(),
            age_cutoff_hours: default_age_cutoff_hours(),
            retention_horizon_days: None,
        }
    }
}

fn default_decay_rate() -> f32 {
    0.01
}

fn default_strength_floor() -> f32 {
    0.1
}

fn default_age_cutoff_hours() -> u32 {
    24
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// Settings for hybrid retrieval.
///
/// The final re-rank itself is not configurable: importance strictly
/// dominates, recency breaks ties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for the semantic path.
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,
    /// Result limit when the caller does not supply one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Memories included in an assembled context.
    #[serde(default = "default_context_memory_limit")]
    pub context_memory_limit: usize,
    /// Relationships included in an assembled context.
    #[serde(default = "default_context_relationship_limit")]
    pub context_relationship_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: default_semantic_threshold(),
            default_limit: default_limit(),
            context_memory_limit: default_context_memory_limit(),
            context_relationship_limit: default_context_relationship_limit(),
        }
    }
}

fn default_semantic_threshold() -> f32 {
    0.7
}

fn default_limit() -> usize {
    10
}

fn default_context_memory_limit() -> usize {
    20
}

fn default_context_relationship_limit() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Settings for the in-process context cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached context stays valid absent invalidation.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum number of cached contexts.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_ttl_seconds() -> u64 {
    3_600
}

fn default_cache_capacity() -> usize {
    1_024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert!((config.decay.decay_rate - 0.01).abs() < f32::EPSILON);
        assert!((config.decay.strength_floor - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.decay.age_cutoff_hours, 24);
        assert!(config.decay.retention_horizon_days.is_none());
        assert!((config.retrieval.semantic_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.default_limit, 10);
        assert_eq!(config.retrieval.context_memory_limit, 20);
        assert_eq!(config.cache.ttl_seconds, 3_600);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [decay]
            decay_rate = 0.05
            retention_horizon_days = 30

            [cache]
            ttl_seconds = 60
            "#,
        )
        .expect("parse");

        assert!((config.decay.decay_rate - 0.05).abs() < f32::EPSILON);
        assert_eq!(config.decay.retention_horizon_days, Some(30));
        assert_eq!(config.decay.age_cutoff_hours, 24);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.retrieval.default_limit, 10);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = EngineConfig::from_toml("decay = 'nope").expect_err("should fail");
        assert!(matches!(err, crate::ReverieError::Config(_)));
    }
}
