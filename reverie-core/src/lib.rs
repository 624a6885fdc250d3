//! # Reverie Core
//!
//! Memory and recall engine for persistent multiplayer roleplay servers.
//!
//! Every AI agent (NPC, companion) accumulates [`record::MemoryRecord`]s
//! from its interactions, and the engine turns them back into bounded,
//! ranked context for dialogue generation:
//!
//! - **Storage** — pluggable [`store::MemoryBackend`]: durable SQLite or
//!   ephemeral in-memory
//! - **Decay** — periodic strength decay with floor-based eviction
//! - **Indexing** — in-process secondary index by context type, tag, and
//!   counterparty
//! - **Retrieval** — hybrid semantic/keyword search with an
//!   importance-dominant re-rank
//! - **Relationships** — bounded trust dimensions per counterparty
//! - **Context assembly** — cache-aside [`record::MemoryContext`]
//!   snapshots that never hard-fail a conversation turn
//!
//! The facade is [`MemoryEngine`]; everything is injected through its
//! builder, and the engine spawns no threads or timers of its own.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod decay;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod record;
pub mod relationship;
pub mod retrieval;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use decay::DecayReport;
pub use engine::{MemoryEngine, MemoryEngineBuilder};
pub use error::{Result, ReverieError};
pub use record::{MemoryContext, MemoryFilter, MemoryRecord, NewMemory, RelationshipRecord,
    RelationshipUpdate};
pub use store::{InMemoryBackend, MemoryBackend, SqliteBackend};
pub use types::*;
