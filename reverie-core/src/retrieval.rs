//! Hybrid memory retrieval — filtered candidates, semantic or keyword
//! scoring, and an importance-dominant final re-rank.
//!
//! The scoring pipeline:
//! 1. Filter candidates through the backend (exact match on every
//!    supplied filter field).
//! 2. Semantic path — only when the query is non-empty, a provider is
//!    configured, and every candidate carries an embedding of the
//!    provider's dimensionality: cosine similarity against the embedded
//!    query, threshold, sort descending.
//! 3. Keyword path otherwise: term overlap against content and tags.
//! 4. Final re-rank: importance descending, recency breaking ties.
//! 5. Truncate to the limit.
//!
//! An empty query skips steps 2–3 entirely — the "what do you know
//! about X" summarization path.

use std::cmp::Reverse;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::record::{MemoryFilter, MemoryRecord};
use crate::store::MemoryBackend;
use crate::types::AgentId;

/// The retrieval engine. Owns no state beyond its collaborators and
/// config; every search runs against a point-in-time snapshot of the
/// backend's rows.
pub struct RetrievalEngine {
    backend: Arc<dyn MemoryBackend>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Create a retrieval engine. `provider` is an optional capability:
    /// without it, every query takes the keyword path.
    #[must_use]
    pub fn new(
        backend: Arc<dyn MemoryBackend>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            backend,
            provider,
            config,
        }
    }

    /// The configured embedding provider, if any.
    #[must_use]
    pub fn provider(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.provider.as_ref()
    }

    /// Search an agent's memories. Returns at most `limit` records
    /// (engine default when `None`), ranked per the module docs.
    ///
    /// # Errors
    ///
    /// Propagates backend failures. Embedding failures fall back to the
    /// keyword path instead of erroring.
    pub fn search(
        &self,
        agent_id: &AgentId,
        query: &str,
        filter: &MemoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>> {
        let limit = limit.unwrap_or(self.config.default_limit);
        let mut candidates = self.backend.find(agent_id, filter)?;
        let candidate_count = candidates.len();

        let query = query.trim();
        if !query.is_empty() {
            candidates = match self.semantic_pass(query, candidates) {
                SemanticOutcome::Ranked(ranked) => ranked,
                SemanticOutcome::NotApplicable(unranked) => keyword_pass(query, unranked),
            };
        }

        rerank(&mut candidates);
        candidates.truncate(limit);

        debug!(
            agent = %agent_id,
            query_len = query.len(),
            candidates = candidate_count,
            returned = candidates.len(),
            "memory search"
        );
        Ok(candidates)
    }

    /// Try the semantic path. Applicable only when a provider is
    /// configured and every candidate carries an embedding of the
    /// provider's dimensionality; anything else hands the candidates
    /// back untouched for keyword scoring.
    fn semantic_pass(&self, query: &str, candidates: Vec<MemoryRecord>) -> SemanticOutcome {
        let Some(provider) = &self.provider else {
            return SemanticOutcome::NotApplicable(candidates);
        };
        if candidates.is_empty() {
            return SemanticOutcome::NotApplicable(candidates);
        }
        let dims = provider.dimensions();
        let all_embedded = candidates
            .iter()
            .all(|c| c.embedding.as_ref().is_some_and(|e| e.dimensions() == dims));
        if !all_embedded {
            return SemanticOutcome::NotApplicable(candidates);
        }

        let query_embedding = match provider.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed, falling back to keyword scoring");
                return SemanticOutcome::NotApplicable(candidates);
            }
        };

        let threshold = self.config.semantic_threshold;
        let mut scored: Vec<(OrderedFloat<f32>, MemoryRecord)> = candidates
            .into_iter()
            .filter_map(|record| {
                let similarity = record
                    .embedding
                    .as_ref()
                    .map(|e| query_embedding.cosine_similarity(e))?;
                (similarity >= threshold).then(|| (OrderedFloat(similarity), record))
            })
            .collect();
        scored.sort_by_key(|(similarity, _)| Reverse(*similarity));
        SemanticOutcome::Ranked(scored.into_iter().map(|(_, record)| record).collect())
    }
}

enum SemanticOutcome {
    /// Semantic similarity applied; candidates thresholded and sorted.
    Ranked(Vec<MemoryRecord>),
    /// Semantic path not applicable; candidates returned untouched.
    NotApplicable(Vec<MemoryRecord>),
}

// ---------------------------------------------------------------------------
// Keyword scoring
// ---------------------------------------------------------------------------

/// Split a query into lowercase terms longer than 2 characters.
fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Term-overlap score: 2 points per term found in the content, 1 point
/// per term found in any tag.
fn keyword_score(record: &MemoryRecord, terms: &[String]) -> u32 {
    let content = record.content.to_lowercase();
    let mut score = 0;
    for term in terms {
        if content.contains(term.as_str()) {
            score += 2;
        }
        if record.tags.iter().any(|tag| tag.contains(term.as_str())) {
            score += 1;
        }
    }
    score
}

/// Keyword path: score, drop zero-score candidates, sort descending.
fn keyword_pass(query: &str, candidates: Vec<MemoryRecord>) -> Vec<MemoryRecord> {
    let terms = tokenize(query);
    let mut scored: Vec<(u32, MemoryRecord)> = candidates
        .into_iter()
        .filter_map(|record| {
            let score = keyword_score(&record, &terms);
            (score > 0).then_some((score, record))
        })
        .collect();
    scored.sort_by_key(|(score, _)| Reverse(*score));
    scored.into_iter().map(|(_, record)| record).collect()
}

// ---------------------------------------------------------------------------
// Final re-rank
// ---------------------------------------------------------------------------

/// Importance-dominant final ordering: importance descending, creation
/// time descending as the tie-break. Lexicographic rather than a weighted
/// blend, so no recency gap can ever outvote an importance point. The
/// sort is stable, so candidates equal on both keys keep their
/// semantic/keyword order.
fn rerank(candidates: &mut [MemoryRecord]) {
    candidates.sort_by_key(|record| (Reverse(record.importance), Reverse(record.created_at)));
}
