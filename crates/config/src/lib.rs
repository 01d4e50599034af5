//! Configuration loading, validation, and management for ragcall.
//!
//! Loads configuration from `~/.ragcall/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use ragcall_core::persona::PersonaProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragcall/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM/embedding provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used for embeddings, answer synthesis and console replies
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Text model used for answer synthesis and console replies
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Temperature for text completions
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per text completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Knowledge source and index settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Per-turn retrieval gate settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Agent persona
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Realtime session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("knowledge", &self.knowledge)
            .field("retrieval", &self.retrieval)
            .field("persona", &self.persona)
            .field("session", &self.session)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// How the index turns retrieved chunks into one answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Draft an answer from the best chunk, then refine it with each next chunk (LLM calls)
    #[default]
    Refine,
    /// Return the retrieved chunks joined together (no LLM call)
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory holding the narrative file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Narrative file name inside `data_dir`
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Sources smaller than this are treated as missing
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,

    /// Marker text identifying placeholder content
    #[serde(default = "default_placeholder_marker")]
    pub placeholder_marker: String,

    /// How many leading characters are scanned for the marker
    #[serde(default = "default_placeholder_scan_chars")]
    pub placeholder_scan_chars: usize,

    /// Chunk size in (estimated) tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in (estimated) tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks used per answer
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Chunks scoring below this cosine similarity are ignored
    #[serde(default)]
    pub min_similarity: f32,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default)]
    pub response_mode: ResponseMode,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_file_name() -> String {
    "nxtwave_onboarding_narrative.txt".into()
}
fn default_min_bytes() -> u64 {
    200
}
fn default_placeholder_marker() -> String {
    "Placeholder".into()
}
fn default_placeholder_scan_chars() -> usize {
    300
}
fn default_chunk_size() -> usize {
    768
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_similarity_top_k() -> usize {
    4
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}

impl KnowledgeConfig {
    /// Full path of the narrative file.
    pub fn source_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            min_bytes: default_min_bytes(),
            placeholder_marker: default_placeholder_marker(),
            placeholder_scan_chars: default_placeholder_scan_chars(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            similarity_top_k: default_similarity_top_k(),
            min_similarity: 0.0,
            embedding_model: default_embedding_model(),
            response_mode: ResponseMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Utterances whose trimmed length is at or below this never hit the index
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    /// Index output equal to this (case-insensitive) means "nothing found"
    #[serde(default = "default_empty_sentinel")]
    pub empty_sentinel: String,

    /// Upper bound on a single query
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retrieval worker slots
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_min_query_chars() -> usize {
    2
}
fn default_empty_sentinel() -> String {
    "empty response".into()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_concurrent() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_query_chars: default_min_query_chars(),
            empty_sentinel: default_empty_sentinel(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(flatten)]
    pub profile: PersonaProfile,

    /// Use this file's content as the full instruction text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transport to run the call on
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Realtime (audio) model
    #[serde(default = "default_realtime_model")]
    pub model: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_session_temperature")]
    pub temperature: f32,

    #[serde(default = "default_true")]
    pub noise_cancellation: bool,
}

fn default_transport() -> String {
    "console".into()
}
fn default_realtime_model() -> String {
    "gemini-2.5-flash-exp-native-audio-thinking-dialog".into()
}
fn default_voice() -> String {
    "Aoede".into()
}
fn default_session_temperature() -> f32 {
    0.8
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            model: default_realtime_model(),
            voice: default_voice(),
            temperature: default_session_temperature(),
            noise_cancellation: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragcall/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration from `path`, or the default path when `None`.
    ///
    /// Environment variables override the file:
    /// - `RAGCALL_API_KEY`, then `GOOGLE_API_KEY`, then `OPENAI_API_KEY`
    /// - `RAGCALL_PROVIDER`, `RAGCALL_MODEL`, `RAGCALL_DATA_DIR`
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("RAGCALL_API_KEY")
                .ok()
                .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("RAGCALL_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("RAGCALL_MODEL") {
            self.default_model = model;
        }

        if let Ok(dir) = std::env::var("RAGCALL_DATA_DIR") {
            self.knowledge.data_dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragcall")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.session.temperature) {
            return Err(ConfigError::ValidationError(
                "session.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.knowledge.chunk_size == 0 || self.knowledge.chunk_overlap >= self.knowledge.chunk_size {
            return Err(ConfigError::ValidationError(
                "knowledge.chunk_overlap must be smaller than a non-zero knowledge.chunk_size".into(),
            ));
        }

        if self.knowledge.similarity_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.similarity_top_k must be at least 1".into(),
            ));
        }

        if self.knowledge.placeholder_marker.is_empty() {
            return Err(ConfigError::ValidationError(
                "knowledge.placeholder_marker must not be empty".into(),
            ));
        }

        if self.retrieval.max_concurrent == 0 || self.retrieval.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_concurrent and retrieval.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Text model for the default provider: its `default_model` override,
    /// otherwise the top-level `default_model`.
    pub fn text_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self.providers.values().any(|p| p.api_key.is_some())
            || std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS").is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            knowledge: KnowledgeConfig::default(),
            retrieval: RetrievalConfig::default(),
            persona: PersonaConfig::default(),
            session: SessionConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for ragcall_core::Error {
    fn from(err: ConfigError) -> Self {
        ragcall_core::Error::Config { message: err.to_string() }
    }
}
