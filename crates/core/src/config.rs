//! Configuration management for the Pitlane assistant.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.pitlane/config.yaml` or `PITLANE_CONFIG`)
//! - Environment variables (`PITLANE_*`)
//! - Command-line flags
//!
//! The keyword lists and relevance threshold are hand-tuned defaults; they
//! are exposed here so deployments can adjust them without a rebuild.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .pitlane/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active generation provider (e.g., "ollama", "openai", "mock")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// API key for the providers that need one
    pub api_key: Option<String>,

    /// Credential required by the forced-reload command
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines instead of text
    pub log_json: bool,

    pub knowledge: KnowledgeSettings,
    pub sessions: SessionSettings,
    pub dialogue: DialogueSettings,
    pub answer: AnswerSettings,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,
}

/// Knowledge source synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSettings {
    /// URL (http/https) or local file path of the knowledge document
    #[serde(default)]
    pub source: Option<String>,

    /// Seconds between background refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Drop retrieved chunks scoring below this value (disabled when unset)
    #[serde(default)]
    pub min_relevance_score: Option<f32>,
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            source: None,
            refresh_interval_secs: default_refresh_interval(),
            min_relevance_score: None,
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Maximum number of turns retained per session
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_idle_timeout() -> u64 {
    30 * 60
}

fn default_max_turns() -> usize {
    12
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            max_turns: default_max_turns(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Dialogue policy keyword lists.
///
/// Single words match as word prefixes ("book" matches "booking"); phrases
/// match as whole-word sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueSettings {
    /// The one track whose answers depend on the day of the visit
    #[serde(default = "default_day_track")]
    pub day_track: String,

    #[serde(default = "default_venue_keywords")]
    pub venue_keywords: Vec<String>,

    #[serde(default = "default_ticket_keywords")]
    pub ticket_keywords: Vec<String>,

    #[serde(default = "default_booking_keywords")]
    pub booking_keywords: Vec<String>,

    #[serde(default = "default_general_keywords")]
    pub general_keywords: Vec<String>,
}

fn default_day_track() -> String {
    "mile_end".to_string()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_venue_keywords() -> Vec<String> {
    strings(&[
        "where are your tracks",
        "where are you located",
        "where are you based",
        "your locations",
        "your venues",
        "which tracks",
        "how many tracks",
        "list your tracks",
        "locations",
        "venues",
    ])
}

fn default_ticket_keywords() -> Vec<String> {
    strings(&[
        "manage my booking",
        "manage booking",
        "change my booking",
        "my tickets",
        "my ticket",
        "cancel",
        "reschedule",
        "refund",
        "resend",
    ])
}

fn default_booking_keywords() -> Vec<String> {
    strings(&[
        "book", "reserv", "pay", "avail", "slot", "spaces", "price", "cost", "how much",
    ])
}

fn default_general_keywords() -> Vec<String> {
    strings(&[
        "laps",
        "how long",
        "age",
        "height",
        "helmet",
        "safety",
        "clothing",
        "wear",
        "equipment",
        "parking",
        "food",
        "drink",
        "spectat",
        "toilet",
        "accessib",
        "opening hours",
        "what time",
    ])
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            day_track: default_day_track(),
            venue_keywords: default_venue_keywords(),
            ticket_keywords: default_ticket_keywords(),
            booking_keywords: default_booking_keywords(),
            general_keywords: default_general_keywords(),
        }
    }
}

/// Answer composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSettings {
    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of recent user turns folded into the retrieval query
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Optional instruction definition overriding the built-in one
    #[serde(default)]
    pub prompt_path: Option<PathBuf>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_top_k() -> usize {
    5
}

fn default_context_turns() -> usize {
    3
}

fn default_currency_symbol() -> String {
    "£".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    600
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            context_turns: default_context_turns(),
            currency_symbol: default_currency_symbol(),
            prompt_path: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        dimensions: Option<usize>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        dimensions: Option<usize>,
        timeout: Option<u64>,
    },
    Mock {
        mock: bool,
        dimensions: Option<usize>,
    },
}

impl ProviderConfig {
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint),
            ProviderConfig::Mock { .. } => None,
        }
    }

    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI {
                embedding_model, ..
            }
            | ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
            ProviderConfig::Mock { .. } => None,
        }
    }

    pub fn dimensions(&self) -> Option<usize> {
        match self {
            ProviderConfig::OpenAI { dimensions, .. }
            | ProviderConfig::Ollama { dimensions, .. }
            | ProviderConfig::Mock { dimensions, .. } => *dimensions,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    knowledge: Option<KnowledgeSettings>,
    sessions: Option<SessionSettings>,
    dialogue: Option<DialogueSettings>,
    answer: Option<AnswerSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            admin_token: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            knowledge: KnowledgeSettings::default(),
            sessions: SessionSettings::default(),
            dialogue: DialogueSettings::default(),
            answer: AnswerSettings::default(),
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file and defaults.
    ///
    /// Environment variables:
    /// - `PITLANE_WORKSPACE`: Override workspace path
    /// - `PITLANE_CONFIG`: Path to config file
    /// - `PITLANE_SOURCE`: Knowledge source URL or path
    /// - `PITLANE_PROVIDER`: Generation provider
    /// - `PITLANE_MODEL`: Generation model
    /// - `PITLANE_API_KEY`: API key
    /// - `PITLANE_ADMIN_TOKEN`: Credential for forced reloads
    /// - `RUST_LOG`: Log level
    /// - `PITLANE_LOG_JSON`: JSON log lines when "1" or "true"
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], reading `config_file` when given instead of
    /// `PITLANE_CONFIG` or the workspace default.
    pub fn load_from(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("PITLANE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        config.config_file =
            config_file.or_else(|| std::env::var("PITLANE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        match config.config_file.clone() {
            Some(path) if !path.exists() => {
                return Err(AppError::Config(format!("Config file not found: {:?}", path)))
            }
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let default_path = config.pitlane_dir().join("config.yaml");
                if default_path.exists() {
                    config = config.merge_yaml(&default_path)?;
                }
            }
        }

        // Environment variables override YAML config
        if let Ok(source) = std::env::var("PITLANE_SOURCE") {
            config.knowledge.source = Some(source);
        }

        if let Ok(provider) = std::env::var("PITLANE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("PITLANE_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("PITLANE_API_KEY").ok();
        config.admin_token = std::env::var("PITLANE_ADMIN_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        config.log_level = config.log_level.or_else(|| std::env::var("RUST_LOG").ok());

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        if std::env::var("PITLANE_LOG_JSON").is_ok_and(|v| v == "1" || v == "true") {
            config.log_json = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }
        if let Some(sessions) = config_file.sessions {
            result.sessions = sessions;
        }
        if let Some(dialogue) = config_file.dialogue {
            result.dialogue = dialogue;
        }
        if let Some(answer) = config_file.answer {
            result.answer = answer;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = match provider_config {
                    ProviderConfig::OpenAI { model, .. } => model.clone(),
                    ProviderConfig::Ollama { model, .. } => model.clone(),
                    ProviderConfig::Mock { .. } => "mock".to_string(),
                };
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        source: Option<String>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(source) = source {
            self.knowledge.source = Some(source);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .pitlane directory.
    pub fn pitlane_dir(&self) -> PathBuf {
        self.workspace.join(".pitlane")
    }

    /// Active embedding provider name ("mock" when nothing is configured).
    pub fn embedding_provider(&self) -> String {
        self.llm
            .as_ref()
            .map(|llm| llm.active_embedding_provider.clone())
            .unwrap_or_else(|| "mock".to_string())
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(&api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration before the assistant starts.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama", "mock"];

        for provider in [self.provider.clone(), self.embedding_provider()] {
            if !known_providers.contains(&provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown provider: {}. Supported: {}",
                    provider,
                    known_providers.join(", ")
                )));
            }
        }

        match self.knowledge.source.as_deref() {
            Some(source) if !source.trim().is_empty() => {}
            _ => {
                return Err(AppError::Config(
                    "No knowledge source configured. Set knowledge.source or PITLANE_SOURCE"
                        .to_string(),
                ))
            }
        }

        self.validate_limits()?;

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.resolve_api_key(&self.provider).is_none() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        Ok(())
    }

    /// Check the numeric settings that must be positive.
    ///
    /// Intervals of zero would make the background timers panic.
    pub fn validate_limits(&self) -> AppResult<()> {
        if self.knowledge.refresh_interval_secs == 0 {
            return Err(AppError::Config(
                "knowledge.refreshIntervalSecs must be positive".to_string(),
            ));
        }

        if self.sessions.idle_timeout_secs == 0 || self.sessions.sweep_interval_secs == 0 {
            return Err(AppError::Config(
                "Session timeout and sweep interval must be positive".to_string(),
            ));
        }

        if self.sessions.max_turns == 0 || self.answer.top_k == 0 {
            return Err(AppError::Config(
                "sessions.maxTurns and answer.topK must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
