//! C2 — Source Adapters: one module per upstream, each implementing
//! `techpulse_core::SourceAdapter`. Shared HTTP client configuration,
//! tagging, and admission-check scaffolding live alongside them.

pub mod arxiv;
pub mod client;
pub mod common;
pub mod crossref;
pub mod dblp;
pub mod error;
pub mod github;
pub mod news;
pub mod openalex;
pub mod patents;
pub mod pubmed;
pub mod retry_after;
pub mod semantic_scholar;
pub mod tagging;
pub mod youtube;

pub use arxiv::ArxivAdapter;
pub use client::{HttpClientConfig, create_client, with_retry};
pub use crossref::CrossrefAdapter;
pub use dblp::DblpAdapter;
pub use error::{Result, SourceError};
pub use github::GithubAdapter;
pub use news::NewsAdapter;
pub use openalex::OpenAlexAdapter;
pub use patents::PatentAdapter;
pub use pubmed::PubmedAdapter;
pub use retry_after::parse_retry_after;
pub use semantic_scholar::SemanticScholarAdapter;
pub use youtube::YoutubeAdapter;
