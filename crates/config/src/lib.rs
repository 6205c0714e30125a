//! Configuration loading, validation, and management for Merlin.
//!
//! Loads configuration from `~/.merlin/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use merlin_core::User;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.merlin/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion + embedding provider
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Reasoning loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Long-term memory index
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Per-thread conversation state
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Outbound chat platform
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Parameter/measurement service
    #[serde(default)]
    pub structured_data: StructuredDataConfig,

    /// Reply pacing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Queue consumer
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Seed users for the built-in directory
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default)]
    pub temperature: f32,
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: 0.0,
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum completion calls per turn before the turn fails
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Thread used when a job carries none
    #[serde(default = "default_thread_id")]
    pub default_thread_id: String,

    /// Default number of memories consulted per retrieval
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Route saved/queried text through the LLM cleaner first
    #[serde(default = "default_true")]
    pub clean_tool_text: bool,
}

fn default_max_steps() -> u32 {
    10
}
fn default_thread_id() -> String {
    "default-thread".into()
}
fn default_retrieval_k() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            default_thread_id: default_thread_id(),
            retrieval_k: default_retrieval_k(),
            clean_tool_text: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    #[default]
    Memory,
    Pinecone,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub backend: VectorBackend,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Index host, e.g. `https://merlin-abc123.svc.pinecone.io`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,

    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "ns1".into()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            api_key: None,
            index_host: None,
            namespace: default_namespace(),
        }
    }
}

impl std::fmt::Debug for VectorStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreConfig")
            .field("backend", &self.backend)
            .field("api_key", &redact(&self.api_key))
            .field("index_host", &self.index_host)
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,

    /// SQLite database path (sqlite backend only)
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
}

fn default_checkpoint_path() -> String {
    AppConfig::config_dir()
        .join("checkpoints.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            path: default_checkpoint_path(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StructuredDataConfig {
    #[serde(default = "default_structured_data_url")]
    pub base_url: String,

    /// HMAC signing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_structured_data_url() -> String {
    "https://correlateapp-be.onrender.com".into()
}

impl Default for StructuredDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_structured_data_url(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for StructuredDataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredDataConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Longest text the platform accepts in one message
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
}

fn default_min_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    3000
}
fn default_message_limit() -> usize {
    4096
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            message_limit: default_message_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Jobs processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// A user entry for the built-in directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: String,
    pub external_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl From<UserConfig> for User {
    fn from(u: UserConfig) -> Self {
        User {
            id: u.id,
            external_id: u.external_id,
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.merlin/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load a specific file, then apply environment overrides.
    ///
    /// Environment variables (highest priority):
    /// - `OPENAI_API_KEY`, `MERLIN_MODEL`
    /// - `TELEGRAM_BOT_TOKEN`
    /// - `PINECONE_API_KEY`, `PINECONE_INDEX_HOST`
    /// - `CORRELATE_API_KEY`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|name| std::env::var(name).ok());
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

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(model) = var("MERLIN_MODEL") {
            self.openai.model = model;
        }
        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(key) = var("PINECONE_API_KEY") {
            self.vector_store.api_key = Some(key);
        }
        if let Some(host) = var("PINECONE_INDEX_HOST") {
            self.vector_store.index_host = Some(host);
        }
        if let Some(key) = var("CORRELATE_API_KEY") {
            self.structured_data.api_key = Some(key);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".merlin")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(ConfigError::ValidationError(
                "openai.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be > 0".into(),
            ));
        }

        if self.dispatch.min_delay_ms == 0 || self.dispatch.min_delay_ms > self.dispatch.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "dispatch delays must satisfy 0 < min_delay_ms <= max_delay_ms".into(),
            ));
        }

        if self.dispatch.message_limit == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.message_limit must be > 0".into(),
            ));
        }

        if self.worker.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "worker.concurrency must be > 0".into(),
            ));
        }

        if self.vector_store.backend == VectorBackend::Pinecone && self.vector_store.index_host.is_none() {
            return Err(ConfigError::ValidationError(
                "vector_store.index_host is required for the pinecone backend".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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
