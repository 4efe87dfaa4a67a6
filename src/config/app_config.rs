use serde::Deserialize;

use crate::domain::RagConfig;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Connection settings for the OpenAI-compatible endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Per-role model settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_guardrail_model")]
    pub guardrail: ModelSettings,
    #[serde(default = "default_generate_model")]
    pub generate: ModelSettings,
    #[serde(default = "default_evaluate_model")]
    pub evaluate: ModelSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Query metrics recording
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON file rewritten after every recorded query; none keeps metrics in memory only
    #[serde(default = "default_metrics_file")]
    pub metrics_file: Option<String>,
    /// Records kept in memory; the oldest are dropped past this
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_base_url() -> String {
    crate::infrastructure::llm::DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_guardrail_model() -> ModelSettings {
    ModelSettings::new("gpt-4o-mini", 0.0, 150)
}

fn default_generate_model() -> ModelSettings {
    ModelSettings::new("gpt-4o-mini", 0.3, 1000)
}

fn default_evaluate_model() -> ModelSettings {
    ModelSettings::new("gpt-4o-mini", 0.0, 200)
}

fn default_top_k() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_metrics_file() -> Option<String> {
    Some("logs/metrics.json".to_string())
}

fn default_max_records() -> usize {
    crate::infrastructure::metrics::DEFAULT_MAX_RECORDS
}

impl ModelSettings {
    pub fn new(name: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            name: name.into(),
            temperature,
            max_tokens,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            guardrail: default_guardrail_model(),
            generate: default_generate_model(),
            evaluate: default_evaluate_model(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_file: default_metrics_file(),
            max_records: default_max_records(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
