use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 100;
const DEFAULT_SIMILARITY_TOP_K: usize = 2;
const DEFAULT_SUMMARY_CONTEXT_TOKENS: usize = 8000;
const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the question-answering server.
///
/// Built once at startup and handed to the service as an `Arc<Config>`; nothing reads the
/// environment after that point.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the hosted Gemini API. Checked lazily on first use.
    pub google_api_key: Option<String>,
    /// Backend that answers prompts.
    pub llm_provider: LlmProvider,
    /// Completion model identifier passed to the LLM provider.
    pub llm_model: String,
    /// Backend that produces embeddings for the vector index.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Vector length produced by the offline hash embedder.
    pub embedding_dimension: usize,
    /// Base URL of the Gemini REST API.
    pub gemini_base_url: String,
    /// Base URL of a local Ollama runtime.
    pub ollama_url: String,
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens carried over from the previous chunk of the same page.
    pub chunk_overlap: usize,
    /// Number of chunks handed to the LLM by the vector path.
    pub similarity_top_k: usize,
    /// Token budget for one packed group during tree summarization.
    pub summary_context_tokens: usize,
    /// Directory for the scoped upload file; `None` uses the OS temp dir.
    pub upload_dir: Option<PathBuf>,
    /// Upper bound on the multipart request body.
    pub max_upload_bytes: usize,
    /// Optional timeout applied to outbound HTTP calls.
    pub http_timeout: Option<Duration>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    /// Hosted Google Gemini API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted Google Gemini embeddings.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic byte-hash embedding that never leaves the process.
    Hash,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            google_api_key: load_env_optional("GOOGLE_API_KEY"),
            llm_provider: parse_or("LLM_PROVIDER", LlmProvider::Gemini)?,
            llm_model: load_env_optional("LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            embedding_provider: parse_or("EMBEDDING_PROVIDER", EmbeddingProvider::Gemini)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            gemini_base_url: load_env_optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            chunk_size: parse_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            similarity_top_k: parse_or("SIMILARITY_TOP_K", DEFAULT_SIMILARITY_TOP_K)?,
            summary_context_tokens: parse_or(
                "SUMMARY_CONTEXT_TOKENS",
                DEFAULT_SUMMARY_CONTEXT_TOKENS,
            )?,
            upload_dir: load_env_optional("UPLOAD_DIR").map(PathBuf::from),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            http_timeout: parse_optional::<u64>("HTTP_TIMEOUT_SECS")?.map(Duration::from_secs),
            server_port: parse_optional("SERVER_PORT")?,
        }
        .validated()?)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if self.similarity_top_k == 0 {
            return Err(ConfigError::InvalidValue("SIMILARITY_TOP_K".into()));
        }
        if self.summary_context_tokens == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CONTEXT_TOKENS".into()));
        }
        if self.embedding_provider == EmbeddingProvider::Hash && self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_api_key: None,
            llm_provider: LlmProvider::Gemini,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embedding_provider: EmbeddingProvider::Gemini,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
            summary_context_tokens: DEFAULT_SUMMARY_CONTEXT_TOKENS,
            upload_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            http_timeout: None,
            server_port: None,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(key)?.unwrap_or(default))
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

/// Load and log the configuration. Call after `.env` has been applied to the environment.
pub fn load() -> Result<Config, ConfigError> {
    let config = Config::from_env()?;
    tracing::debug!(
        llm_provider = ?config.llm_provider,
        llm_model = %config.llm_model,
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        has_api_key = config.google_api_key.is_some(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
