//! TechPulse Core Types and Traits
//!
//! The shared vocabulary every other crate in the workspace builds on:
//!
//! - [`record`]: the Canonical Record (§3), Identity Rules, Breakdown and
//!   Insight Atom types.
//! - [`traits`]: the `SourceAdapter` (C2) and `CatalogStore` (C4) trait
//!   seams, plus the cooperative `LlmClient`/`EmbeddingClient`/`VectorStore`
//!   contracts consumed by the Breakdown Extractor (C10).
//! - [`error`]: the crate-wide error type.

pub mod error;
pub mod record;
pub mod traits;

pub use error::{Error, Result};
pub use record::{
    AtomEdgeType, AtomLink, Breakdown, CanonicalRecord, Certainty, DateFidelity, ExternalIds,
    Insight, InsightAtom, InsightType, Metadata, OverallStructure, RecordType, Segment, Stance,
    compute_identity_key, normalize_title_fingerprint, IDENTITY_NAMESPACE_ORDER,
};
pub use traits::{CatalogStore, EmbeddingClient, LlmClient, MergeOutcome, SourceAdapter, VectorStore};
