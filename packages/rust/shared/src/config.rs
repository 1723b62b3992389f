//! Application configuration for the horoscope pipeline.
//!
//! User config lives at `~/.horoscope/horoscope.toml` unless a path is given
//! explicitly. CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HoroscopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "horoscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".horoscope";

// ---------------------------------------------------------------------------
// Config structs (matching horoscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Batch run settings.
    #[serde(default)]
    pub run: RunSection,

    /// Text generation service settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Prompt template settings.
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Directory holding the source spreadsheets.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Process only this file (relative to `data_dir`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,

    /// Global record cap. Unset or non-positive means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Directory receiving checkpoint files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Accepted source file extensions (case-insensitive, without the dot).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Write a checkpoint after every N successful records (0 = final only).
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            target_file: None,
            limit: None,
            output_dir: default_output_dir(),
            extensions: default_extensions(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

fn default_data_dir() -> String {
    "horoscope_data".into()
}
fn default_output_dir() -> String {
    "horoscope_results".into()
}
fn default_extensions() -> Vec<String> {
    vec!["xlsx".into()]
}
fn default_checkpoint_every() -> usize {
    10
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Env var that, when set, overrides `base_url`.
    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Optional `X-Title` header identifying the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_title: Option<String>,

    /// Per-request timeout. Unset means the client waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            base_url_env: default_base_url_env(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            app_title: None,
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_base_url_env() -> String {
    "BASE_URL".into()
}
fn default_api_key_env() -> String {
    "API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    3000
}

/// `[prompt]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Path to a template file; the built-in template is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the source files.
    pub data_dir: PathBuf,
    /// Process only this file name inside `data_dir`.
    pub target_file: Option<String>,
    /// Global record cap; `None` means unlimited.
    pub record_limit: Option<usize>,
    /// Directory receiving checkpoint files.
    pub output_dir: PathBuf,
    /// Accepted extensions, lowercased.
    pub extensions: Vec<String>,
    /// Checkpoint cadence in successful records (0 = final only).
    pub checkpoint_every: usize,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        let run = &config.run;
        Self {
            data_dir: PathBuf::from(&run.data_dir),
            target_file: run.target_file.clone().filter(|f| !f.trim().is_empty()),
            record_limit: record_limit(run.limit),
            output_dir: PathBuf::from(&run.output_dir),
            extensions: run
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            checkpoint_every: run.checkpoint_every,
        }
    }
}

/// Convert a configured limit into a cap. Non-positive values mean unlimited.
pub fn record_limit(limit: Option<i64>) -> Option<usize> {
    limit
        .filter(|l| *l > 0)
        .and_then(|l| usize::try_from(l).ok())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.horoscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HoroscopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.horoscope/horoscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HoroscopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        HoroscopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HoroscopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HoroscopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HoroscopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the configured env var. Fails if unset or empty.
pub fn resolve_api_key(config: &GenerationConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(HoroscopeError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Base URL from the override env var when set, otherwise from the config.
pub fn resolve_base_url(config: &GenerationConfig) -> String {
    match std::env::var(&config.base_url_env) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => config.base_url.clone(),
    }
}
