//! `storeBackend = relational` (§6): a `sqlx`-backed `CatalogStore`
//! implementation plus the durable tables for dated analytics snapshots,
//! per-video podcast breakdowns, channel cursor bookkeeping, and the
//! optional knowledge-graph tier.

pub mod error;
pub mod migrations;
pub mod relational_store;
pub mod snapshot_store;

pub use error::{RelationalError, Result};
pub use relational_store::RelationalCatalogStore;
pub use snapshot_store::{KnowledgeGraphStore, PodcastStore, SnapshotKind, SnapshotStore};
