use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::retrieval::prompts::DEFAULT_PERSONAL_CONTEXT;

const DEFAULT_CHAT_API_URL: &str = "https://api.together.xyz/v1/chat/completions";
const DEFAULT_CHAT_MODEL: &str = "meta-llama/Llama-2-7b-chat-hf";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub admin_password: String,
    pub resume_data_path: String,
    pub conversations_path: String,
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_timeout: Duration,
    pub chat_api_url: String,
    pub chat_api_key: Option<String>,
    pub chat_model: String,
    pub retrieval: RetrievalConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Retrieval policy. These are the knobs the engine consults at query time.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Hits must score strictly above this to enter assembled context.
    pub similarity_threshold: f32,
    /// Nearest neighbours considered for assembled context.
    pub context_top_k: usize,
    /// Default result count for diagnostic search.
    pub search_limit: usize,
    /// Upper bound on a query-time embedding call.
    pub query_timeout: Duration,
    /// Static paragraph that leads every assembled context.
    pub personal_context: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            context_top_k: 3,
            search_limit: 5,
            query_timeout: Duration::from_millis(10_000),
            personal_context: DEFAULT_PERSONAL_CONTEXT.to_string(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            similarity_threshold: parse_env("RAG_SIMILARITY_THRESHOLD", defaults.similarity_threshold)?,
            context_top_k: parse_env("RAG_CONTEXT_TOP_K", defaults.context_top_k)?,
            search_limit: parse_env("RAG_SEARCH_LIMIT", defaults.search_limit)?,
            query_timeout: Duration::from_millis(parse_env("RAG_QUERY_TIMEOUT_MS", 10_000u64)?),
            // An empty override would let ready context come back empty.
            personal_context: optional_env("RAG_PERSONAL_CONTEXT")
                .unwrap_or(defaults.personal_context),
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            admin_password: require_env("ADMIN_PASSWORD")?,
            resume_data_path: std::env::var("RESUME_DATA_PATH")
                .unwrap_or_else(|_| "data/resume_data.json".to_string()),
            conversations_path: std::env::var("CONVERSATIONS_PATH")
                .unwrap_or_else(|_| "data/conversations.json".to_string()),
            embedding_api_url: std::env::var("EMBEDDING_API_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "all-minilm".to_string()),
            embedding_timeout: Duration::from_secs(parse_env("EMBEDDING_TIMEOUT_SECS", 30u64)?),
            chat_api_url: std::env::var("CHAT_API_URL")
                .unwrap_or_else(|_| DEFAULT_CHAT_API_URL.to_string()),
            chat_api_key: optional_env("CHAT_API_KEY"),
            chat_model: std::env::var("CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            retrieval: RetrievalConfig::from_env()?,
            port: parse_env("PORT", 5000u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
