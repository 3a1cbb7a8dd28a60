//! Configuration management for Docent.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.docent/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with the document catalog, prompt
//! overrides and chat database stored in `.docent/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Providers understood by the client factory.
pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "offline"];

/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Model used for `provider` when neither the config file nor a flag names one.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => DEFAULT_OPENAI_MODEL,
        "offline" => "offline",
        _ => DEFAULT_OLLAMA_MODEL,
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docent/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("ollama", "openai", "offline")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// Set once `DOCENT_MODEL` or `--model` chose the model; a later
    /// provider switch then keeps it
    #[serde(skip)]
    pub model_pinned: bool,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Retrieval and citation settings
    pub retrieval: RetrievalConfig,

    /// Generation call settings
    pub generation: GenerationConfig,

    /// Catalog and database locations
    pub storage: StorageConfig,

    /// HTTP boundary settings
    pub server: ServerConfig,
}

/// Provider section of config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

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
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
    Offline {},
}

impl ProviderConfig {
    /// Endpoint override for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
            ProviderConfig::Offline {} => None,
        }
    }
}

/// Retrieval and citation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of ranked documents placed in a prompt
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Excerpt length in characters before truncation
    #[serde(rename = "excerptChars")]
    pub excerpt_chars: usize,

    /// Number of ranked documents attached at retrieval confidence when the
    /// answer carries no resolvable markers (0 disables)
    #[serde(rename = "fallbackCitations")]
    pub fallback_citations: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            excerpt_chars: 200,
            fallback_citations: 0,
        }
    }
}

/// Generation call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Bound on a completion call, and on the wait for each streamed chunk
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,

    pub temperature: f32,

    #[serde(rename = "maxTokens")]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Storage locations, relative paths resolve against the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub catalog: PathBuf,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from(".docent/catalog.yaml"),
            database: PathBuf::from(".docent/chat.db"),
        }
    }
}

/// HTTP boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    retrieval: Option<RetrievalConfig>,
    generation: Option<GenerationConfig>,
    storage: Option<StorageConfig>,
    server: Option<ServerConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            model_pinned: false,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `DOCENT_WORKSPACE`: Override workspace path
    /// - `DOCENT_CONFIG`: Path to config file
    /// - `DOCENT_PROVIDER`: Generation provider
    /// - `DOCENT_MODEL`: Model identifier
    /// - `DOCENT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docent_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("DOCENT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("DOCENT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.docent_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("DOCENT_PROVIDER") {
            config.switch_provider(provider);
        }

        if let Ok(model) = std::env::var("DOCENT_MODEL") {
            config.pin_model(model);
        }

        config.api_key = std::env::var("DOCENT_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok().or(config.log_level);

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge_file(config_file))
    }

    fn merge_file(mut self, config_file: ConfigFile) -> Self {
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(generation) = config_file.generation {
            self.generation = generation;
        }
        if let Some(storage) = config_file.storage {
            self.storage = storage;
        }
        if let Some(server) = config_file.server {
            self.server = server;
        }

        if let Some(llm) = config_file.llm {
            self.provider = llm.active_provider.clone();
            self.llm = Some(llm);
            if !self.model_pinned {
                self.model = self.provider_model(&self.provider);
            }
        }

        self
    }

    /// Model for `provider`: its config file block first, then the built-in default.
    fn provider_model(&self, provider: &str) -> String {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { model, .. }) => model,
            Some(ProviderConfig::Ollama { model, .. }) => model,
            _ => default_model(provider).to_string(),
        }
    }

    fn switch_provider(&mut self, provider: String) {
        if provider != self.provider && !self.model_pinned {
            self.model = self.provider_model(&provider);
        }
        self.provider = provider;
    }

    fn pin_model(&mut self, model: String) {
        self.model = model;
        self.model_pinned = true;
    }

    /// Point the config at another workspace or config file and re-read
    /// the YAML file found there.
    pub fn relocate(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> AppResult<Self> {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }
        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        let config_path = self
            .config_file
            .clone()
            .unwrap_or_else(|| self.docent_dir().join("config.yaml"));

        if config_path.exists() {
            self.merge_yaml(&config_path)
        } else {
            Ok(self)
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.switch_provider(provider);
        }

        if let Some(model) = model {
            self.pin_model(model);
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

    /// Get the path to the .docent directory.
    pub fn docent_dir(&self) -> PathBuf {
        self.workspace.join(".docent")
    }

    /// Ensure the .docent directory exists.
    pub fn ensure_docent_dir(&self) -> AppResult<()> {
        let docent_dir = self.docent_dir();
        if !docent_dir.exists() {
            std::fs::create_dir_all(&docent_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .docent directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Absolute path of the document catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.storage.catalog)
    }

    /// Absolute path of the chat database.
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.storage.database)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key: explicit `DOCENT_API_KEY` first, then the
    /// provider's `apiKeyEnv` variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(&api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration.
    ///
    /// A missing API key is not checked here; the chat controller reports
    /// it as an answer.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        if self.generation.timeout_secs == 0 {
            return Err(AppError::Config(
                "generation.timeoutSecs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
