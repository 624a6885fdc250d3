//! Context cache — read-through, invalidate-on-write.
//!
//! The cache owns the cached copy of a [`MemoryContext`] and is the only
//! authority on whether it is fresh. Implementations must degrade
//! gracefully: a broken or unavailable cache behaves as all-miss, never
//! as an error.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::record::MemoryContext;
use crate::types::AgentId;

/// Cache collaborator contract.
///
/// Infallible by design: `get` misses instead of erroring, `put` and
/// `invalidate` silently drop failures. The engine treats every miss the
/// same way regardless of cause.
pub trait ContextCache: Send + Sync {
    /// Fetch a cached context, or `None` on miss/expiry/unavailability.
    fn get(&self, agent_id: &AgentId) -> Option<MemoryContext>;

    /// Store a context with a time-to-live.
    fn put(&self, agent_id: &AgentId, context: MemoryContext, ttl: Duration);

    /// Drop the cached context for an agent, if any.
    fn invalidate(&self, agent_id: &AgentId);
}

// ---------------------------------------------------------------------------
// In-process LRU implementation
// ---------------------------------------------------------------------------

struct CachedContext {
    deadline: Instant,
    context: MemoryContext,
}

/// Bounded in-process cache: LRU capacity eviction plus per-entry TTL.
pub struct LruContextCache {
    entries: Mutex<LruCache<AgentId, CachedContext>>,
}

impl LruContextCache {
    /// Create a cache holding at most `capacity` contexts.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of live (possibly expired, not yet reaped) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ContextCache for LruContextCache {
    fn get(&self, agent_id: &AgentId) -> Option<MemoryContext> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(agent_id) {
            Some(cached) if cached.deadline > Instant::now() => {
                return Some(cached.context.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(agent_id);
            debug!(agent = %agent_id, "cached context expired");
        }
        None
    }

    fn put(&self, agent_id: &AgentId, context: MemoryContext, ttl: Duration) {
        let cached = CachedContext {
            deadline: Instant::now() + ttl,
            context,
        };
        self.entries.lock().put(agent_id.clone(), cached);
    }

    fn invalidate(&self, agent_id: &AgentId) {
        self.entries.lock().pop(agent_id);
    }
}

// ---------------------------------------------------------------------------
// Null implementation (caching disabled)
// ---------------------------------------------------------------------------

/// A cache that stores nothing — every read is a miss. Used when caching
/// is disabled and as the degraded-mode stand-in in tests.
pub struct NullCache;

impl ContextCache for NullCache {
    fn get(&self, _agent_id: &AgentId) -> Option<MemoryContext> {
        None
    }

    fn put(&self, _agent_id: &AgentId, _context: MemoryContext, _ttl: Duration) {}

    fn invalidate(&self, _agent_id: &AgentId) {}
}
