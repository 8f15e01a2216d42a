use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::parse::Strictness;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// JSON snapshot of the posts corpus
    pub posts_path: PathBuf,
    /// Ranking model provider configuration
    pub llm: LlmConfig,
    /// Lexical filter and reply validation settings
    pub ranking: RankingConfig,
    /// Result cache bounds
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name used for ranking
    pub chat_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Per-call timeout in seconds (capped at 120)
    pub timeout_secs: u64,
    /// Upper bound on generated tokens per ranking call
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Maximum candidates forwarded to the ranking model
    pub candidate_limit: usize,
    /// Minimum lexical score for a candidate to survive the filter
    pub min_lexical_score: u32,
    /// How many field markers a reply must carry to be parsed
    pub strictness: Strictness,
    /// USD per 1k input tokens, for diagnostics only
    pub input_cost_per_1k: f64,
    /// USD per 1k output tokens, for diagnostics only
    pub output_cost_per_1k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of finished rankings kept. Computations still in
    /// flight are tracked separately and do not count.
    pub capacity: usize,
    /// Entry lifetime in seconds (0 = never expires)
    pub ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            posts_path: PathBuf::from("./data/posts.json"),
            llm: LlmConfig::default(),
            ranking: RankingConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_tokens: 1500,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 20,
            min_lexical_score: 2,
            strictness: Strictness::Strict,
            input_cost_per_1k: 0.00015,
            output_cost_per_1k: 0.0006,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GITWISE_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("GITWISE_POSTS_PATH") {
            config.posts_path = PathBuf::from(path);
        }

        // LLM config
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.llm.timeout_secs = v.min(120);
            }
        }
        if let Ok(val) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                config.llm.max_tokens = v;
            }
        }

        // Ranking config
        if let Ok(val) = std::env::var("RANKING_CANDIDATE_LIMIT") {
            if let Ok(v) = val.parse::<usize>() {
                config.ranking.candidate_limit = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("RANKING_MIN_LEXICAL_SCORE") {
            if let Ok(v) = val.parse() {
                config.ranking.min_lexical_score = v;
            }
        }
        if let Ok(val) = std::env::var("RANKING_STRICTNESS") {
            match val.parse() {
                Ok(strictness) => config.ranking.strictness = strictness,
                Err(e) => tracing::warn!("Ignoring RANKING_STRICTNESS: {e}"),
            }
        }
        if let Ok(val) = std::env::var("RANKING_INPUT_COST_PER_1K") {
            if let Ok(v) = val.parse() {
                config.ranking.input_cost_per_1k = v;
            }
        }
        if let Ok(val) = std::env::var("RANKING_OUTPUT_COST_PER_1K") {
            if let Ok(v) = val.parse() {
                config.ranking.output_cost_per_1k = v;
            }
        }

        // Cache config
        if let Ok(val) = std::env::var("CACHE_CAPACITY") {
            if let Ok(v) = val.parse::<usize>() {
                config.cache.capacity = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("CACHE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.cache.ttl_secs = v;
            }
        }

        config
    }
}
