//! Memory decay — periodic aging and eviction of memory records.
//!
//! Each cycle subtracts a fixed rate from the strength of every record
//! older than the age cutoff; records whose strength falls to or below
//! the floor are deleted along with their index entries. When a
//! retention horizon is configured (the ephemeral-store variant),
//! anything older than the horizon is purged first regardless of
//! strength.
//!
//! The cycle is an explicit entry point — the engine spawns no timers.
//! The host schedules it (default cadence: once per 24 h) and a try-lock
//! guard keeps a late-running cycle from overlapping the next one.
//!
//! The cycle takes no per-agent locks: strength is mutated only here and
//! cycles never overlap, each backend read/write is internally
//! synchronized, and index/cache cleanups go through their own locks. A
//! decay delete racing a caller write resolves at the backend, and both
//! paths invalidate the agent's cached context.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::cache::ContextCache;
use crate::config::DecayConfig;
use crate::index::SecondaryIndex;
use crate::store::MemoryBackend;

/// Outcome of one decay cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayReport {
    /// Records considered for decay.
    pub scanned: usize,
    /// Records whose strength was lowered and persisted.
    pub decayed: usize,
    /// Records deleted for falling to or below the strength floor.
    pub deleted: usize,
    /// Records purged by the retention horizon.
    pub purged: usize,
    /// Records that failed to update or delete and were skipped.
    pub failed: usize,
    /// True when the cycle was skipped because another was running.
    pub skipped: bool,
}

/// Applies decay cycles against a backend.
pub struct DecayEngine {
    backend: Arc<dyn MemoryBackend>,
    config: DecayConfig,
    cycle_guard: Mutex<()>,
}

impl DecayEngine {
    /// Create a decay engine.
    #[must_use]
    pub fn new(backend: Arc<dyn MemoryBackend>, config: DecayConfig) -> Self {
        Self {
            backend,
            config,
            cycle_guard: Mutex::new(()),
        }
    }

    /// Run one decay cycle at `now`.
    ///
    /// Strength is monotonically non-increasing and deletion is terminal.
    /// A single record failing to update or delete is logged and skipped;
    /// it never aborts the rest of the batch. Deleted and purged records
    /// are removed from the index and their agents' cached contexts are
    /// invalidated.
    pub fn run_cycle(
        &self,
        index: &RwLock<SecondaryIndex>,
        cache: &dyn ContextCache,
        now: DateTime<Utc>,
    ) -> DecayReport {
        // A cycle that overruns its cadence must not overlap the next one.
        let Some(_guard) = self.cycle_guard.try_lock() else {
            warn!("decay cycle already running, skipping");
            return DecayReport {
                skipped: true,
                ..DecayReport::default()
            };
        };

        let mut report = DecayReport::default();

        // Retention horizon purge (ephemeral variant).
        if let Some(days) = self.config.retention_horizon_days {
            let horizon = now - Duration::days(i64::from(days));
            match self.backend.purge_older_than(horizon) {
                Ok(purged) => {
                    report.purged = purged.len();
                    let mut index = index.write();
                    for record in &purged {
                        index.remove(record);
                        cache.invalidate(&record.agent_id);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "retention purge failed, continuing with decay");
                    report.failed += 1;
                }
            }
        }

        let cutoff = now - Duration::hours(i64::from(self.config.age_cutoff_hours));
        let candidates = match self.backend.decay_candidates(cutoff) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "could not load decay candidates");
                report.failed += 1;
                return report;
            }
        };
        report.scanned = candidates.len();

        for record in candidates {
            let new_strength = (record.strength - self.config.decay_rate).max(0.0);
            if new_strength <= self.config.strength_floor {
                match self.backend.delete(record.id) {
                    Ok(true) => {
                        index.write().remove(&record);
                        cache.invalidate(&record.agent_id);
                        report.deleted += 1;
                    }
                    Ok(false) => {} // already gone — deletion is terminal either way
                    Err(e) => {
                        warn!(
                            agent = %record.agent_id,
                            memory = %record.id,
                            error = %e,
                            "failed to delete decayed record, skipping"
                        );
                        report.failed += 1;
                    }
                }
            } else {
                match self.backend.update_strength(record.id, new_strength) {
                    Ok(()) => report.decayed += 1,
                    Err(e) => {
                        warn!(
                            agent = %record.agent_id,
                            memory = %record.id,
                            error = %e,
                            "failed to persist decayed strength, skipping"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            scanned = report.scanned,
            decayed = report.decayed,
            deleted = report.deleted,
            purged = report.purged,
            failed = report.failed,
            "decay cycle complete"
        );
        report
    }
}
