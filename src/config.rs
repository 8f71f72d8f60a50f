//! Configuration management for codescribe.
//!
//! Configuration is loaded from `~/.config/codescribe/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Text-generation backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Where generated files go.
    #[serde(default)]
    pub output: OutputConfig,
    /// Chat session settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the API (default: https://text.pollinations.ai).
    #[serde(default = "default_base_url")]
    pub url: String,
    /// Model name (default: openai).
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature, 0.0-3.0 (default: 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://text.pollinations.ai".to_string()
}

fn default_model() -> String {
    "openai".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

/// Output directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory generated files are written under (default: generated).
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "generated".to_string()
}

/// Chat session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum messages retained in the conversation history (default: 20).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> usize {
    20
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("codescribe"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.url, "https://text.pollinations.ai");
        assert_eq!(config.backend.model, "openai");
        assert_eq!(config.output.dir, "generated");
        assert_eq!(config.chat.history_limit, 20);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("pollinations"));
        assert!(toml.contains("generated"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
[backend]
url = "http://localhost:8080"
model = "mistral"
temperature = 0.5

[output]
dir = "out"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.model, "mistral");
        assert_eq!(config.backend.temperature, 0.5);
        assert_eq!(config.output.dir, "out");
        // Missing sections fall back to defaults.
        assert_eq!(config.chat.history_limit, 20);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.backend.model, "openai");
    }
}
