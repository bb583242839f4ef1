//! Server configuration (§6): recognized options, their defaults, and the
//! `TECHPULSE_*` environment-variable overrides that take precedence over
//! whatever a config file sets. Absent provider credentials are not an
//! error — they simply leave `llmProvider`/`embeddingProvider` unconfigured
//! and the dependent features fall back to templates (§4.10, §9).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    OpenAi,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Relational,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Catalog refresh cadence (§4.6, default 10 minutes).
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u64,

    /// Deep analytics refresh cadence (§4.6, default 6 hours).
    #[serde(default = "default_deep_refresh_hours")]
    pub deep_refresh_hours: u64,

    /// Catalog Store ceiling (§4.4, default 10 000).
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    #[serde(default)]
    pub store_backend: StoreBackend,

    /// `storeBackend = file`: path to the single JSON document (§6).
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// `storeBackend = relational`: `postgres://` or `sqlite://` connection string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Base directory for dated analytics snapshots (`storeBackend = file`).
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    #[serde(default)]
    pub llm_provider: LlmProvider,

    #[serde(default)]
    pub embedding_provider: EmbeddingProvider,

    /// Primary transcript micro-service base URL (§4.9 fallback method 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_service_url: Option<String>,

    #[serde(default)]
    pub rate_limits: RateLimitsConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-source `requests/second` (§4.1). Recognized names double as the
/// `rateLimits` map keys and the source adapter names used in logs/metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitsConfig {
    #[serde(default = "default_arxiv_rps")]
    pub arxiv: f64,
    #[serde(default = "default_semantic_scholar_rps")]
    pub semantic_scholar: f64,
    #[serde(default = "default_openalex_rps")]
    pub openalex: f64,
    #[serde(default = "default_crossref_rps")]
    pub crossref: f64,
    #[serde(default = "default_pubmed_rps")]
    pub pubmed: f64,
    #[serde(default = "default_dblp_rps")]
    pub dblp: f64,
    #[serde(default = "default_github_rps")]
    pub github: f64,
    #[serde(default = "default_news_rps")]
    pub news: f64,
    #[serde(default = "default_patents_rps")]
    pub patents: f64,
    #[serde(default = "default_youtube_rps")]
    pub youtube: f64,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            arxiv: default_arxiv_rps(),
            semantic_scholar: default_semantic_scholar_rps(),
            openalex: default_openalex_rps(),
            crossref: default_crossref_rps(),
            pubmed: default_pubmed_rps(),
            dblp: default_dblp_rps(),
            github: default_github_rps(),
            news: default_news_rps(),
            patents: default_patents_rps(),
            youtube: default_youtube_rps(),
        }
    }
}

/// Adapter-specific configuration that isn't a rate, a provider, or a
/// credential (§4.2, §6's "Recognized options").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesConfig {
    /// Which adapters are enabled for a catalog-refresh cycle.
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<String>,

    /// Crossref's required "polite pool" contact string.
    #[serde(default = "default_polite_contact")]
    pub crossref_polite_contact: String,

    /// RSS/Atom feed URLs the news adapter polls, plus Hacker News.
    #[serde(default)]
    pub news_feed_urls: Vec<String>,

    /// YouTube channel/playlist ids ingested as podcast episodes.
    #[serde(default)]
    pub youtube_channel_playlists: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
            crossref_polite_contact: default_polite_contact(),
            news_feed_urls: Vec::new(),
            youtube_channel_playlists: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON-formatted log lines vs. a human-readable compact format.
    #[serde(default = "default_false")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            deep_refresh_hours: default_deep_refresh_hours(),
            max_records: default_max_records(),
            store_backend: StoreBackend::default(),
            store_path: default_store_path(),
            database_url: None,
            snapshot_dir: default_snapshot_dir(),
            llm_provider: LlmProvider::default(),
            embedding_provider: EmbeddingProvider::default(),
            transcript_service_url: None,
            rate_limits: RateLimitsConfig::default(),
            sources: SourcesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config: ServerConfig = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge `TECHPULSE_*` environment variables (env vars win over the
    /// config file). Provider credentials use their conventional unprefixed
    /// names so the same `OPENAI_API_KEY`/`ANTHROPIC_API_KEY` a shell
    /// already has set works without renaming (§6 "Environment-variable
    /// names for credentials are opaque; their absence must not crash the
    /// system" — reading `env::var` and leaving the field `None` on error
    /// already satisfies that).
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("TECHPULSE_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("TECHPULSE_PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            self.port = port;
        }
        if let Ok(val) = std::env::var("TECHPULSE_REFRESH_INTERVAL_MINUTES")
            && let Ok(minutes) = val.parse::<u64>()
        {
            self.refresh_interval_minutes = minutes;
        }
        if let Ok(val) = std::env::var("TECHPULSE_DEEP_REFRESH_HOURS")
            && let Ok(hours) = val.parse::<u64>()
        {
            self.deep_refresh_hours = hours;
        }
        if let Ok(val) = std::env::var("TECHPULSE_MAX_RECORDS")
            && let Ok(max) = val.parse::<usize>()
        {
            self.max_records = max;
        }
        if let Ok(val) = std::env::var("TECHPULSE_STORE_BACKEND") {
            match val.to_lowercase().as_str() {
                "file" => self.store_backend = StoreBackend::File,
                "relational" => self.store_backend = StoreBackend::Relational,
                other => eprintln!("Warning: Invalid TECHPULSE_STORE_BACKEND '{other}', using existing setting"),
            }
        }
        if let Ok(val) = std::env::var("TECHPULSE_DATABASE_URL") {
            self.database_url = Some(val);
        }
        if let Ok(val) = std::env::var("TECHPULSE_LLM_PROVIDER") {
            match val.to_lowercase().as_str() {
                "openai" => self.llm_provider = LlmProvider::OpenAi,
                "anthropic" => self.llm_provider = LlmProvider::Anthropic,
                "none" => self.llm_provider = LlmProvider::None,
                other => eprintln!("Warning: Invalid TECHPULSE_LLM_PROVIDER '{other}', using existing setting"),
            }
        }
        if let Ok(val) = std::env::var("TECHPULSE_EMBEDDING_PROVIDER") {
            match val.to_lowercase().as_str() {
                "openai" => self.embedding_provider = EmbeddingProvider::OpenAi,
                "none" => self.embedding_provider = EmbeddingProvider::None,
                other => eprintln!("Warning: Invalid TECHPULSE_EMBEDDING_PROVIDER '{other}', using existing setting"),
            }
        }
        if let Ok(val) = std::env::var("TECHPULSE_TRANSCRIPT_SERVICE_URL") {
            self.transcript_service_url = Some(val);
        }
        if let Ok(val) = std::env::var("TECHPULSE_LOG_LEVEL") {
            self.logging.level = val;
        }

        // A provider is only "configured" once an API key is present, even
        // if the config file or TECHPULSE_LLM_PROVIDER names it — the
        // bootstrap wiring checks both (§6, §9).
        if self.llm_provider == LlmProvider::OpenAi && std::env::var("OPENAI_API_KEY").is_err() {
            eprintln!("Warning: llmProvider is openai but OPENAI_API_KEY is unset; LLM features will fall back to templates");
        }
        if self.llm_provider == LlmProvider::Anthropic && std::env::var("ANTHROPIC_API_KEY").is_err() {
            eprintln!("Warning: llmProvider is anthropic but ANTHROPIC_API_KEY is unset; LLM features will fall back to templates");
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_refresh_interval_minutes() -> u64 {
    10
}

fn default_deep_refresh_hours() -> u64 {
    6
}

fn default_max_records() -> usize {
    10_000
}

fn default_store_path() -> PathBuf {
    PathBuf::from("~/.techpulse/catalog.json")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("~/.techpulse/snapshots")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}

fn default_arxiv_rps() -> f64 {
    1.0
}
fn default_semantic_scholar_rps() -> f64 {
    1.0
}
fn default_openalex_rps() -> f64 {
    1.0
}
fn default_crossref_rps() -> f64 {
    10.0
}
fn default_pubmed_rps() -> f64 {
    2.0
}
fn default_dblp_rps() -> f64 {
    1.0
}
fn default_github_rps() -> f64 {
    0.5
}
fn default_news_rps() -> f64 {
    2.0
}
fn default_patents_rps() -> f64 {
    1.0
}
fn default_youtube_rps() -> f64 {
    1.0
}

fn default_polite_contact() -> String {
    "techpulse-contact@example.com".to_string()
}

fn default_enabled_sources() -> Vec<String> {
    [
        "arxiv",
        "semantic_scholar",
        "openalex",
        "crossref",
        "pubmed",
        "dblp",
        "github",
        "news",
        "patents",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Expand a leading `~` the way every path-bearing field in this config
/// needs before it touches the filesystem.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_recognized_options_table() {
        let config = ServerConfig::default();
        assert_eq!(config.refresh_interval_minutes, 10);
        assert_eq!(config.deep_refresh_hours, 6);
        assert_eq!(config.max_records, 10_000);
        assert_eq!(config.llm_provider, LlmProvider::None);
        assert_eq!(config.store_backend, StoreBackend::File);
    }

    #[test]
    fn rate_limit_defaults_match_section_4_1() {
        let rates = RateLimitsConfig::default();
        assert_eq!(rates.arxiv, 1.0);
        assert_eq!(rates.crossref, 10.0);
        assert_eq!(rates.github, 0.5);
        assert_eq!(rates.pubmed, 2.0);
    }

    #[test]
    fn env_overrides_beat_file_defaults() {
        // SAFETY: test runs single-threaded within this process's env.
        unsafe {
            std::env::set_var("TECHPULSE_PORT", "9999");
        }
        let mut config = ServerConfig::default();
        config.merge_env();
        assert_eq!(config.port, 9999);
        unsafe {
            std::env::remove_var("TECHPULSE_PORT");
        }
    }

    #[test]
    fn toml_and_yaml_both_parse_via_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("config.yaml");
        std::fs::write(&yaml_path, "port: 9091\nmaxRecords: 500\n").unwrap();
        let config = ServerConfig::from_file(&yaml_path).unwrap();
        assert_eq!(config.port, 9091);
        assert_eq!(config.max_records, 500);

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "port = 9092\n").unwrap();
        let config = ServerConfig::from_file(&toml_path).unwrap();
        assert_eq!(config.port, 9092);
    }
}
