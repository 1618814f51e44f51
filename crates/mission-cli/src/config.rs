//! Configuration file support

use mission_ai::providers::get_api_key;
use mission_core::{ChatConfig, HeadroomConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for mission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini models to try, in order
    pub models: Option<Vec<String>>,
    /// How many stored messages are read back per turn
    pub history_window: Option<usize>,
    /// Most-recent messages kept verbatim by Headroom
    pub keep_recent_count: Option<usize>,
    /// Whether the first message in the window is pinned
    pub keep_system: Option<bool>,
    /// Chat history file path
    pub history_file: Option<String>,
    /// Seconds to wait for a reply before giving up
    pub timeout_secs: Option<u64>,
    /// Cap on tokens generated per reply
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Gemini API endpoint, for proxies
    pub base_url: Option<String>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub google: Option<String>,
}

/// Default reply timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mission-control")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("MISSION_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let defaults = ChatConfig::default();
        let default_config = Config {
            models: Some(
                mission_ai::providers::google::DEFAULT_MODELS
                    .iter()
                    .map(|m| m.to_string())
                    .collect(),
            ),
            history_window: Some(defaults.history_window),
            keep_recent_count: Some(defaults.headroom.keep_recent_count),
            keep_system: Some(defaults.headroom.keep_system),
            history_file: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            max_output_tokens: None,
            temperature: None,
            base_url: None,
            api_keys: ApiKeys::default(),
        };

        default_config.save()?;
        Ok(path)
    }

    /// Google API key from config, then GOOGLE_API_KEY, then GEMINI_API_KEY
    pub fn google_api_key(&self) -> Option<String> {
        get_api_key(self.api_keys.google.as_deref(), "GOOGLE_API_KEY")
            .or_else(|_| get_api_key(None, "GEMINI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Compression settings, defaults filled in
    pub fn headroom(&self) -> HeadroomConfig {
        let defaults = HeadroomConfig::default();
        HeadroomConfig {
            keep_recent_count: self.keep_recent_count.unwrap_or(defaults.keep_recent_count),
            keep_system: self.keep_system.unwrap_or(defaults.keep_system),
        }
    }

    /// Pipeline settings, defaults filled in
    pub fn chat_config(&self) -> ChatConfig {
        let defaults = ChatConfig::default();
        ChatConfig {
            history_window: self.history_window.unwrap_or(defaults.history_window),
            headroom: self.headroom(),
            max_output_tokens: self.max_output_tokens.or(defaults.max_output_tokens),
            temperature: self.temperature.or(defaults.temperature),
        }
    }

    /// Reply timeout in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# mission configuration file
# Place at ~/.config/mission-control/config.toml (Linux), or point
# MISSION_CONFIG_PATH at another file

# Gemini models to try, in order; the first that answers wins
models = ["gemini-2.5-flash", "gemini-1.5-flash", "gemini-pro"]

# Stored messages read back per turn
history_window = 20

# Headroom: most-recent messages kept verbatim
keep_recent_count = 4

# Headroom: keep the first message in the window as a pinned anchor
keep_system = true

# Chat history file (JSONL); defaults to the local data dir
# history_file = "~/.local/share/mission-control/history.jsonl"

# Seconds to wait for a reply
timeout_secs = 60

# Generation settings (optional)
# max_output_tokens = 1024
# temperature = 0.7

# Gemini endpoint override (optional)
# base_url = "https://generativelanguage.googleapis.com/v1beta"

# API keys (optional - can also use GOOGLE_API_KEY or GEMINI_API_KEY)
[api_keys]
# google = "..."
"#
}
