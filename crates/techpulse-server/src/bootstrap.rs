//! Builds every long-lived dependency the server needs from a loaded
//! [`ServerConfig`]: the Catalog Store and dated-snapshot cache (selected
//! by `storeBackend`), the Source Adapters and their Rate Limiters, the
//! optional LLM/embedding clients, and the optional Transcript Pipeline.
//! One function, `bootstrap`, owns the whole wiring so `main` only has to
//! call it and hand the result to [`crate::app::AppState::new`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;

use techpulse_core::{CatalogStore, EmbeddingClient, LlmClient, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use techpulse_sources::{
    ArxivAdapter, CrossrefAdapter, DblpAdapter, GithubAdapter, HttpClientConfig, NewsAdapter,
    OpenAlexAdapter, PatentAdapter, PubmedAdapter, SemanticScholarAdapter, YoutubeAdapter,
    create_client,
};
use techpulse_store::FileCatalogStore;
use techpulse_store_relational::{RelationalCatalogStore, SnapshotKind as RelationalSnapshotKind, SnapshotStore};
use techpulse_transcript::methods::{CaptionExtractionMethod, MicroserviceMethod};
use techpulse_transcript::{TranscriptMethod, TranscriptPipeline};

use crate::config::{EmbeddingProvider, LlmProvider, ServerConfig, StoreBackend, expand_path};
use crate::llm::{AnthropicLlmClient, OpenAiEmbeddingClient, OpenAiLlmClient};

pub struct Bootstrapped {
    pub catalog: Arc<dyn CatalogStore>,
    pub snapshots: SnapshotCache,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub embedder: Option<Arc<dyn EmbeddingClient>>,
    pub transcript_pipeline: Option<Arc<TranscriptPipeline>>,
}

/// The dated-snapshot cache for the Analytics Engine's outputs (§4.8),
/// unified over the file and relational backends' structurally-parallel
/// but differently-shaped `write`/`insert` + `latest` APIs. Both tables
/// named in the durable-state layout (`technology_reads_snapshots` and
/// `technology_predictions_snapshots`) hold one `AnalyticsSnapshot` bundle
/// each per §4.8; since that bundle already carries every `/insights/*`
/// output together, one kind (`TechnologyReads`) stores the whole thing
/// rather than splitting it across two near-identical rows.
pub enum SnapshotCache {
    File(techpulse_analytics::FileSnapshotCache),
    Relational(SnapshotStore),
}

impl SnapshotCache {
    pub async fn write(&self, generated_at: DateTime<Utc>, snapshot: &techpulse_analytics::AnalyticsSnapshot) -> anyhow::Result<()> {
        match self {
            SnapshotCache::File(cache) => {
                cache
                    .write(techpulse_analytics::SnapshotKind::TechnologyReads, generated_at, snapshot)
                    .await?;
            }
            SnapshotCache::Relational(store) => {
                store.insert(generated_at, snapshot).await?;
            }
        }
        Ok(())
    }

    pub async fn latest(&self) -> anyhow::Result<Option<techpulse_analytics::AnalyticsSnapshot>> {
        let snapshot = match self {
            SnapshotCache::File(cache) => {
                cache.latest(techpulse_analytics::SnapshotKind::TechnologyReads).await?
            }
            SnapshotCache::Relational(store) => store.latest().await?,
        };
        Ok(snapshot)
    }
}

pub async fn bootstrap(config: &ServerConfig) -> anyhow::Result<Bootstrapped> {
    let catalog: Arc<dyn CatalogStore> = match config.store_backend {
        StoreBackend::File => {
            let path = expand_path(&config.store_path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            Arc::new(FileCatalogStore::load(path, config.max_records).await)
        }
        StoreBackend::Relational => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("storeBackend is relational but databaseUrl is unset"))?;
            Arc::new(RelationalCatalogStore::connect(url, config.max_records).await?)
        }
    };

    let snapshots = match config.store_backend {
        StoreBackend::File => {
            let dir = expand_path(&config.snapshot_dir);
            tokio::fs::create_dir_all(&dir).await.ok();
            SnapshotCache::File(techpulse_analytics::FileSnapshotCache::new(dir))
        }
        StoreBackend::Relational => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("storeBackend is relational but databaseUrl is unset"))?;
            sqlx::any::install_default_drivers();
            let pool = sqlx::AnyPool::connect(url).await?;
            SnapshotCache::Relational(SnapshotStore::new(pool, RelationalSnapshotKind::TechnologyReads))
        }
    };

    let adapters = build_adapters(config)?;

    let llm: Option<Arc<dyn LlmClient>> = match config.llm_provider {
        LlmProvider::OpenAi => std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| Arc::new(OpenAiLlmClient::new(key)) as Arc<dyn LlmClient>),
        LlmProvider::Anthropic => std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .map(|key| Arc::new(AnthropicLlmClient::new(key)) as Arc<dyn LlmClient>),
        LlmProvider::None => None,
    };

    let embedder: Option<Arc<dyn EmbeddingClient>> = match config.embedding_provider {
        EmbeddingProvider::OpenAi => std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| Arc::new(OpenAiEmbeddingClient::new(key)) as Arc<dyn EmbeddingClient>),
        EmbeddingProvider::None => None,
    };

    let transcript_pipeline = config
        .transcript_service_url
        .as_ref()
        .map(|base_url| build_transcript_pipeline(base_url));

    Ok(Bootstrapped {
        catalog,
        snapshots,
        adapters,
        llm,
        embedder,
        transcript_pipeline,
    })
}

fn build_adapters(config: &ServerConfig) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let http_config = HttpClientConfig::default();
    let client: Client = create_client(&http_config)?;
    let enabled: std::collections::HashSet<&str> =
        config.sources.enabled.iter().map(String::as_str).collect();

    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    let rates = &config.rate_limits;

    if enabled.contains("arxiv") {
        let limiter = Arc::new(RateLimiter::new("arxiv", rates.arxiv));
        adapters.push(Arc::new(ArxivAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("semantic_scholar") {
        let limiter = Arc::new(RateLimiter::new("semantic_scholar", rates.semantic_scholar));
        adapters.push(Arc::new(SemanticScholarAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("openalex") {
        let limiter = Arc::new(RateLimiter::new("openalex", rates.openalex));
        adapters.push(Arc::new(OpenAlexAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("crossref") {
        let limiter = Arc::new(RateLimiter::new("crossref", rates.crossref));
        adapters.push(Arc::new(CrossrefAdapter::new(
            client.clone(),
            limiter,
            config.sources.crossref_polite_contact.clone(),
        )));
    }
    if enabled.contains("pubmed") {
        let limiter = Arc::new(RateLimiter::new("pubmed", rates.pubmed));
        adapters.push(Arc::new(PubmedAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("dblp") {
        let limiter = Arc::new(RateLimiter::new("dblp", rates.dblp));
        adapters.push(Arc::new(DblpAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("github") {
        let limiter = Arc::new(RateLimiter::new("github", rates.github));
        adapters.push(Arc::new(GithubAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("patents") {
        let limiter = Arc::new(RateLimiter::new("patents", rates.patents));
        adapters.push(Arc::new(PatentAdapter::new(client.clone(), limiter)));
    }
    if enabled.contains("news") && !config.sources.news_feed_urls.is_empty() {
        let limiter = Arc::new(RateLimiter::new("news", rates.news));
        adapters.push(Arc::new(NewsAdapter::new(
            client.clone(),
            limiter,
            config.sources.news_feed_urls.clone(),
        )));
    }
    if enabled.contains("youtube") && !config.sources.youtube_channel_playlists.is_empty() {
        let limiter = Arc::new(RateLimiter::new("youtube", rates.youtube));
        let api_key = std::env::var("YOUTUBE_API_KEY").ok();
        adapters.push(Arc::new(YoutubeAdapter::new(
            client.clone(),
            limiter,
            config.sources.youtube_channel_playlists.clone(),
            api_key,
        )));
    }

    Ok(adapters)
}

/// The two download-free fallback methods (micro-service, caption
/// scraping) cover every video source this server ships adapters for
/// without requiring a local `yt-dlp`/`ffmpeg` toolchain or a third-party
/// transcription subscription. The audio-download methods
/// (`SpeechToTextMethod`, `TranscriptionApiMethod`) need exactly that, so
/// they're a deliberately unimplemented extension point for now — see
/// DESIGN.md.
fn build_transcript_pipeline(transcript_service_url: &str) -> Arc<TranscriptPipeline> {
    let http_config = HttpClientConfig::default();
    let client = create_client(&http_config).unwrap_or_else(|_| Client::new());

    let microservice = Arc::new(MicroserviceMethod::new(client.clone(), transcript_service_url.to_string()));
    let captions = Arc::new(CaptionExtractionMethod::new(client, transcript_service_url.to_string()));

    let methods: Vec<Arc<dyn TranscriptMethod>> = vec![microservice, captions];
    Arc::new(TranscriptPipeline::new(methods))
}
