use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE: &str = "engram.db";
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
const DEFAULT_MAX_RESULTS: usize = 5;

const DEFAULT_PROMPT: &str = "You are a helpful assistant.";
const DEFAULT_DESCRIPTION: &str =
    "This assistant provides helpful information based on stored knowledge.";
const DEFAULT_SHORT_DESCRIPTION: &str = "Helpful knowledge assistant";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Ranking parameters applied to every search request.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_results: default_max_results(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token hash in `sha256:<hex>` form. Auth is disabled when unset.
    pub token_hash: Option<String>,
}

/// Values seeded into the config table on first startup.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_short_description")]
    pub short_description: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            description: default_description(),
            short_description: default_short_description(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_short_description() -> String {
    DEFAULT_SHORT_DESCRIPTION.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(contents).map_err(|e| format!("invalid config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let threshold = self.search.similarity_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(format!(
                "search.similarity_threshold must be within [-1, 1], got {threshold}"
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Config-table defaults keyed the way the store expects them.
    pub fn seed_values(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("prompt".to_string(), self.assistant.prompt.clone()),
            ("description".to_string(), self.assistant.description.clone()),
            (
                "short_description".to_string(),
                self.assistant.short_description.clone(),
            ),
            (
                "embedding".to_string(),
                self.assistant.embedding_model.clone(),
            ),
        ])
    }
}
