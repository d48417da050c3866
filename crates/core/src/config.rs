//! Configuration management for askboard.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.askboard/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! All persistent state (conversation log, vector index, prompt overrides)
//! lives under `<workspace>/.askboard/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const DATA_DIR_NAME: &str = ".askboard";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .askboard/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active provider for answer generation ("openai", "ollama", "none")
    pub provider: String,

    /// Model identifier for answer generation
    pub model: String,

    /// Explicit API key override (ASKBOARD_API_KEY)
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider definitions
    pub llm: LlmConfig,

    /// Embedding chain settings
    pub embedding: EmbeddingSettings,

    /// Answer generation settings
    pub generation: GenerationSettings,

    /// Confidence gate thresholds
    pub gate: GateSettings,

    /// Storage file names
    pub storage: StorageSettings,
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

impl Default for LlmConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            "openai".to_string(),
            ProviderConfig::OpenAI {
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                embedding_model: Some("text-embedding-3-small".to_string()),
                endpoint: None,
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderConfig::Ollama {
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.2".to_string(),
                embedding_model: Some("nomic-embed-text".to_string()),
                timeout: Some(30),
            },
        );

        Self {
            active_provider: "openai".to_string(),
            active_embedding_provider: "openai".to_string(),
            providers,
        }
    }
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
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Completion model for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Embedding model, if the provider has one configured.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Embedding chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Fixed vector dimension of the index; every provider output is fitted to it
    pub dimensions: usize,

    /// Texts per remote request
    pub batch_size: usize,

    /// Attempts per batch before degrading to the next provider
    pub max_retries: u32,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Probe and use the local runtime as secondary provider
    pub local_enabled: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimensions: 1536,
            batch_size: 8,
            max_retries: 2,
            timeout_secs: 20,
            local_enabled: true,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    /// Temperature for final answers
    pub temperature: f32,

    /// Temperature for reviewer drafts
    pub draft_temperature: f32,

    /// Token cap per generation
    pub max_tokens: u32,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            draft_temperature: 0.2,
            max_tokens: 800,
            timeout_secs: 20,
        }
    }
}

/// Confidence gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateSettings {
    /// Largest top-hit distance still considered answerable
    pub max_distance: f32,

    /// Smallest confidence score still considered answerable
    pub min_confidence: f32,

    /// Number of neighbours retrieved per question
    pub top_k: usize,

    /// Domain allow-list; at least one must appear in question or context
    pub allowed_keywords: Vec<String>,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            max_distance: 0.65,
            min_confidence: 0.35,
            top_k: 4,
            allowed_keywords: [
                "태양광", "패널", "폐패널", "EPR", "재활용", "수거", "인버터", "모듈", "설치",
                "교체", "철거", "발전소", "태양열", "오염", "파손", "성능", "예측", "수명",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

/// Storage file names, relative to the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub log_file: String,
    pub index_file: String,

    /// Upper bound for one blocking index operation
    pub index_timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            log_file: "logs.json".to_string(),
            index_file: "index.sqlite".to_string(),
            index_timeout_secs: 20,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    embedding: Option<EmbeddingSettings>,
    generation: Option<GenerationSettings>,
    gate: Option<GateSettings>,
    storage: Option<StorageSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let llm = LlmConfig::default();
        let model = llm
            .providers
            .get(&llm.active_provider)
            .map(|p| p.model().to_string())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: llm.active_provider.clone(),
            model,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm,
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            gate: GateSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `ASKBOARD_WORKSPACE`: Override workspace path
    /// - `ASKBOARD_CONFIG`: Path to config file
    /// - `ASKBOARD_PROVIDER`: Generation provider
    /// - `ASKBOARD_MODEL`: Generation model
    /// - `ASKBOARD_API_KEY`: API key for remote providers
    /// - `ASKBOARD_MAX_DISTANCE` / `ASKBOARD_MIN_CONFIDENCE`: Gate thresholds
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use askboard_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Log file: {:?}", config.log_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("ASKBOARD_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("ASKBOARD_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.data_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("ASKBOARD_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("ASKBOARD_MODEL") {
            config.model = model;
        }

        if let Some(value) = env_f32("ASKBOARD_MAX_DISTANCE")? {
            config.gate.max_distance = value;
        }

        if let Some(value) = env_f32("ASKBOARD_MIN_CONFIDENCE")? {
            config.gate.min_confidence = value;
        }

        config.api_key = std::env::var("ASKBOARD_API_KEY").ok();
        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
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

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
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
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = llm;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(gate) = config_file.gate {
            result.gate = gate;
        }
        if let Some(storage) = config_file.storage {
            result.storage = storage;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the YAML file.
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
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .askboard directory.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(DATA_DIR_NAME)
    }

    /// Ensure the .askboard directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        let data_dir = self.data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", DATA_DIR_NAME, e))
            })?;
            tracing::debug!("Created data directory {:?}", data_dir);
        }
        Ok(())
    }

    /// Path of the conversation log JSON file.
    pub fn log_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.log_file)
    }

    /// Path of the vector index database.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.index_file)
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.providers.get(provider)
    }

    /// Resolve the API key for a provider.
    ///
    /// `ASKBOARD_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            _ => None,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama", "none"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        let known_embedding = ["openai", "ollama", "keyword"];
        if !known_embedding.contains(&self.llm.active_embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.llm.active_embedding_provider,
                known_embedding.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.batchSize must be greater than zero".to_string(),
            ));
        }

        if self.gate.top_k == 0 {
            return Err(AppError::Config(
                "gate.topK must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.gate.max_distance) {
            return Err(AppError::Config(format!(
                "gate.maxDistance must be within [0, 2], got {}",
                self.gate.max_distance
            )));
        }

        if !(0.0..=1.0).contains(&self.gate.min_confidence) {
            return Err(AppError::Config(format!(
                "gate.minConfidence must be within [0, 1], got {}",
                self.gate.min_confidence
            )));
        }

        Ok(())
    }
}

fn env_f32(name: &str) -> AppResult<Option<f32>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.gate.max_distance, 0.65);
        assert_eq!(config.gate.min_confidence, 0.35);
        assert_eq!(config.gate.top_k, 4);
        assert!(config.gate.allowed_keywords.iter().any(|k| k == "패널"));
        assert!(!config.verbose);
    }

    #[test]
    fn test_storage_paths() {
        let config = AppConfig::default();
        assert!(config.data_dir().ends_with(DATA_DIR_NAME));
        assert!(config.log_path().ends_with("logs.json"));
        assert!(config.index_path().ends_with("index.sqlite"));
    }

    #[test]
    fn test_ensure_data_dir_is_idempotent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp_dir.path().to_path_buf(),
            ..AppConfig::default()
        };

        config.ensure_data_dir().unwrap();
        assert!(config.data_dir().is_dir());
        config.ensure_data_dir().unwrap();
        assert!(config.data_dir().is_dir());
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  activeProvider: ollama
  activeEmbeddingProvider: keyword
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: qwen2.5
      embeddingModel: nomic-embed-text
gate:
  maxDistance: 0.5
  minConfidence: 0.4
  allowedKeywords: ["inverter"]
embedding:
  dimensions: 384
logging:
  level: warn
  color: false
"#;

        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "qwen2.5");
        assert_eq!(merged.llm.active_embedding_provider, "keyword");
        assert_eq!(merged.gate.max_distance, 0.5);
        assert_eq!(merged.gate.top_k, 4);
        assert_eq!(merged.gate.allowed_keywords, vec!["inverter".to_string()]);
        assert_eq!(merged.embedding.dimensions, 384);
        assert_eq!(merged.embedding.batch_size, 8);
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "storage:\n  logFile: history.json\n").unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert!(merged.log_path().ends_with("history.json"));
        assert!(merged.index_path().ends_with("index.sqlite"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_thresholds() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.gate.min_confidence = 1.5;
        assert!(config.validate().is_err());

        config.gate.min_confidence = 0.35;
        config.gate.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-explicit".to_string());
        assert_eq!(
            config.resolve_api_key("openai").as_deref(),
            Some("sk-explicit")
        );
    }

    #[test]
    fn test_ollama_has_no_api_key() {
        let config = AppConfig::default();
        assert_eq!(config.resolve_api_key("ollama"), None);
    }
}
