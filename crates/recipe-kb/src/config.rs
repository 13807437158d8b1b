//! Configuration for the recipe pipeline
//!
//! Values come from defaults, then an optional YAML file, then environment variables.
//! The binaries apply their command-line flags last.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::data::CoreError;
use crate::similarity::SimilarityMetric;

/// OpenAI-compatible endpoint served by Gemini.
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

/// Environment variable naming the YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "RECIPE_KB_CONFIG";

/// Pipeline configuration, passed explicitly into every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// `sqlite://recipes.db`, `sqlite::memory:` or `memory://local`
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Number of new recipes the ingestor aims for.
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Normalize and log records without writing them.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,

    #[serde(default)]
    pub normalizer: NormalizerKind,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Chat model used by the LLM normalizer and overview enrichment.
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Local JSON file
    JsonFile,
    /// JSON document fetched over HTTP(S)
    Http,
}

/// One external recipe source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub kind: FeedKind,
    /// File path or URL.
    pub location: String,
    /// Overrides `retry.timeout_secs` for this feed.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerKind {
    #[default]
    FieldMapping,
    Llm,
}

impl FromStr for NormalizerKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "field_mapping" | "fields" => Ok(NormalizerKind::FieldMapping),
            "llm" => Ok(NormalizerKind::Llm),
            other => Err(CoreError::ConfigError(format!("Unknown normalizer: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible embeddings endpoint
    #[serde(rename = "openai")]
    OpenAi,
    /// Local feature hashing, no network
    #[default]
    Hashing,
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingProvider::OpenAi => write!(f, "openai"),
            EmbeddingProvider::Hashing => write!(f, "hashing"),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gemini" => Ok(EmbeddingProvider::OpenAi),
            "hashing" | "local" => Ok(EmbeddingProvider::Hashing),
            other => Err(CoreError::ConfigError(format!("Unknown embedding provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Vector length. Defaults to 384 for hashing and 768 for `text-embedding-004`.
    #[serde(default)]
    pub dimension: Option<usize>,
}

impl EmbeddingConfig {
    pub fn effective_dimension(&self) -> usize {
        self.dimension.unwrap_or(match self.provider {
            EmbeddingProvider::Hashing => 384,
            EmbeddingProvider::OpenAi => 768,
        })
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            base_url: default_base_url(),
            api_key: None,
            dimension: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Append an LLM-written overview to the embedded text.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_base_url(),
            api_key: None,
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub metric: SimilarityMetric,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Per-attempt timeout for external calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_database_url() -> String {
    "sqlite://recipes.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    3
}

fn default_target_count() -> usize {
    200
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_base_url() -> String {
    GEMINI_OPENAI_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_k() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            target_count: default_target_count(),
            dry_run: false,
            feeds: Vec::new(),
            normalizer: NormalizerKind::default(),
            embedding: EmbeddingConfig::default(),
            enrichment: EnrichmentConfig::default(),
            llm: LlmConfig::default(),
            query: QueryConfig::default(),
            retry: RetryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Parses `raw` into `target`, keeping the previous value and warning when it is invalid.
fn parse_into<T: FromStr>(
    target: &mut T,
    key: &'static str,
    raw: &str,
    rejected: &mut Vec<&'static str>,
) -> bool {
    match raw.trim().parse::<T>() {
        Ok(value) => {
            *target = value;
            true
        }
        Err(_) => {
            warn!("Invalid {} value: {}", key, raw);
            rejected.push(key);
            false
        }
    }
}

fn parse_flag(target: &mut bool, key: &'static str, raw: &str, rejected: &mut Vec<&'static str>) {
    match parse_bool(raw) {
        Some(value) => *target = value,
        None => {
            warn!("Invalid {} value: {}", key, raw);
            rejected.push(key);
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl PipelineConfig {
    /// Load configuration from an optional YAML file and environment variables.
    ///
    /// `path` wins over `RECIPE_KB_CONFIG`; without either, defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match &path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        let rejected = config.apply_env_overrides();

        info!(
            config_file = ?path,
            rejected_overrides = rejected.len(),
            database_url = %config.database_url,
            feeds = config.feeds.len(),
            embedding_provider = %config.embedding.provider,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, CoreError> {
        serde_yaml::from_str(raw)
            .map_err(|e| CoreError::ConfigError(format!("Invalid configuration: {}", e)))
    }

    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`, a stand-in for the process environment.
    ///
    /// Returns the keys whose values were rejected; each is logged as a warning and the
    /// previous value is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();

        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(raw) = lookup("RECIPE_TARGET_COUNT") {
            parse_into(&mut self.target_count, "RECIPE_TARGET_COUNT", &raw, &mut rejected);
        }
        if let Some(raw) = lookup("RECIPE_DRY_RUN") {
            parse_flag(&mut self.dry_run, "RECIPE_DRY_RUN", &raw, &mut rejected);
        }
        if let Some(raw) = lookup("RECIPE_NORMALIZER") {
            parse_into(&mut self.normalizer, "RECIPE_NORMALIZER", &raw, &mut rejected);
        }

        if let Some(raw) = lookup("EMBEDDING_PROVIDER") {
            parse_into(&mut self.embedding.provider, "EMBEDDING_PROVIDER", &raw, &mut rejected);
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(base_url) = lookup("EMBEDDING_BASE_URL") {
            self.embedding.base_url = base_url;
        }
        if let Some(raw) = lookup("EMBEDDING_DIMENSION") {
            let mut dimension = self.embedding.effective_dimension();
            if parse_into(&mut dimension, "EMBEDDING_DIMENSION", &raw, &mut rejected) {
                self.embedding.dimension = Some(dimension);
            }
        }

        // Same key serves embeddings and chat, Gemini first
        if let Some(api_key) = lookup("GEMINI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.embedding.api_key = Some(api_key.clone());
            self.llm.api_key = Some(api_key);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(raw) = lookup("RECIPE_ENRICHMENT") {
            parse_flag(&mut self.enrichment.enabled, "RECIPE_ENRICHMENT", &raw, &mut rejected);
        }

        if let Some(raw) = lookup("QUERY_TOP_K") {
            parse_into(&mut self.query.top_k, "QUERY_TOP_K", &raw, &mut rejected);
        }
        if let Some(raw) = lookup("SIMILARITY_METRIC") {
            parse_into(&mut self.query.metric, "SIMILARITY_METRIC", &raw, &mut rejected);
        }

        if let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") {
            parse_into(&mut self.retry.timeout_secs, "REQUEST_TIMEOUT_SECS", &raw, &mut rejected);
        }
        if let Some(raw) = lookup("RETRY_MAX_ATTEMPTS") {
            parse_into(&mut self.retry.max_attempts, "RETRY_MAX_ATTEMPTS", &raw, &mut rejected);
        }
        if let Some(raw) = lookup("RETRY_DELAY_MS") {
            parse_into(&mut self.retry.delay_ms, "RETRY_DELAY_MS", &raw, &mut rejected);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(raw) = lookup("LOG_JSON") {
            parse_flag(&mut self.log.json, "LOG_JSON", &raw, &mut rejected);
        }

        rejected
    }

    /// Settings every stage relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.database_url.trim().is_empty() {
            return Err(CoreError::ConfigError("database_url must not be empty".into()));
        }
        if self.embedding.effective_dimension() == 0 {
            return Err(CoreError::ConfigError("embedding dimension must be positive".into()));
        }
        if self.embedding.provider == EmbeddingProvider::OpenAi && missing(&self.embedding.api_key) {
            return Err(CoreError::ConfigError(
                "embedding provider 'openai' needs GEMINI_API_KEY or OPENAI_API_KEY".into(),
            ));
        }
        if self.query.top_k == 0 {
            return Err(CoreError::ConfigError("query.top_k must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(CoreError::ConfigError("retry.max_attempts must be positive".into()));
        }
        if self.retry.timeout_secs == 0 {
            return Err(CoreError::ConfigError("retry.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Settings the ingestor needs. Does not require an embedding key.
    pub fn validate_ingestion(&self) -> Result<(), CoreError> {
        if self.database_url.trim().is_empty() {
            return Err(CoreError::ConfigError("database_url must not be empty".into()));
        }
        if self.target_count == 0 {
            return Err(CoreError::ConfigError("target_count must be positive".into()));
        }
        if self.feeds.is_empty() {
            return Err(CoreError::ConfigError("at least one feed must be configured".into()));
        }
        let mut names = HashSet::new();
        for feed in &self.feeds {
            if feed.name.trim().is_empty() || feed.location.trim().is_empty() {
                return Err(CoreError::ConfigError("feeds need a name and a location".into()));
            }
            if !names.insert(feed.name.as_str()) {
                return Err(CoreError::ConfigError(format!("duplicate feed name: {}", feed.name)));
            }
        }
        if self.normalizer == NormalizerKind::Llm && missing(&self.llm.api_key) {
            return Err(CoreError::ConfigError(
                "normalizer 'llm' needs GEMINI_API_KEY or OPENAI_API_KEY".into(),
            ));
        }
        Ok(())
    }

    /// Settings the embedding generator needs.
    pub fn validate_generation(&self) -> Result<(), CoreError> {
        self.validate()?;
        if self.enrichment.enabled && missing(&self.llm.api_key) {
            return Err(CoreError::ConfigError(
                "overview enrichment needs GEMINI_API_KEY or OPENAI_API_KEY".into(),
            ));
        }
        Ok(())
    }
}

fn missing(key: &Option<String>) -> bool {
    key.as_deref().map_or(true, |k| k.trim().is_empty())
}
