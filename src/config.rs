//! Configuration file handling.
//!
//! Settings live in `config.toml` under the user's config directory
//! (`hvac-tracker/`), or under `HVT_CONFIG_DIR` when set. Secrets are never
//! stored here: the AI key comes from `GEMINI_API_KEY` or `API_KEY` and the
//! server token from `HVT_TOKEN`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR_ENV: &str = "HVT_CONFIG_DIR";
pub const AI_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

const KEYS: [&str; 7] = [
    "data_dir",
    "remote.base_url",
    "remote.timeout_secs",
    "ai.model",
    "ai.base_url",
    "ai.timeout_secs",
    "ai.api_key",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of project files; `~/.hvt` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub remote: RemoteConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project server, e.g. `http://localhost:3001/api`. Files are used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AiConfig {
    /// API key from the environment, if any.
    pub fn resolved_api_key(&self) -> Option<String> {
        AI_KEY_ENVS
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|key| !key.trim().is_empty())
    }

    pub fn redacted_api_key(&self) -> Option<String> {
        self.resolved_api_key().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "***".to_string()
            } else {
                let suffix: String = chars[chars.len() - 4..].iter().collect();
                format!("***{}", suffix)
            }
        })
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("hvac-tracker")
        };
        Ok(dir)
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults when absent.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Directory of project files.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".hvt")
        })
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "data_dir" => Ok(self.resolved_data_dir().display().to_string()),
            "remote.base_url" => Ok(self
                .remote
                .base_url
                .clone()
                .unwrap_or_else(|| "(not set - projects are stored as local files)".to_string())),
            "remote.timeout_secs" => Ok(self.remote.timeout_secs.to_string()),
            "ai.model" => Ok(self.ai.model.clone()),
            "ai.base_url" => Ok(self.ai.base_url.clone()),
            "ai.timeout_secs" => Ok(self.ai.timeout_secs.to_string()),
            "ai.api_key" => Ok(self
                .ai
                .redacted_api_key()
                .unwrap_or_else(|| "(not set - use GEMINI_API_KEY or API_KEY env var; offline answers are used)".to_string())),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `hvt config show` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match key {
            "data_dir" => {
                self.data_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "remote.base_url" => {
                if !value.is_empty() && !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(anyhow!("remote.base_url must start with http:// or https://"));
                }
                self.remote.base_url = (!value.is_empty()).then(|| value.trim_end_matches('/').to_string());
            }
            "remote.timeout_secs" => {
                self.remote.timeout_secs = parse_timeout(value)?;
            }
            "ai.model" => {
                if value.is_empty() {
                    return Err(anyhow!("ai.model cannot be empty"));
                }
                self.ai.model = value.to_string();
            }
            "ai.base_url" => {
                if value.is_empty() {
                    return Err(anyhow!("ai.base_url cannot be empty"));
                }
                self.ai.base_url = value.trim_end_matches('/').to_string();
            }
            "ai.timeout_secs" => {
                self.ai.timeout_secs = parse_timeout(value)?;
            }
            "ai.api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration. \
                     Set the GEMINI_API_KEY or API_KEY environment variable instead."
                ));
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `hvt config show` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// All keys with their current values.
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}

fn parse_timeout(value: &str) -> anyhow::Result<u64> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("Invalid timeout value: {}", value))?;
    if secs == 0 {
        return Err(anyhow!("Timeout must be at least one second"));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_set_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.set("remote.base_url", "http://localhost:3001/api/").unwrap();
        config.set("ai.timeout_secs", "15").unwrap();
        config.set("data_dir", "/srv/hvt").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.remote.base_url.as_deref(), Some("http://localhost:3001/api"));
        assert_eq!(loaded.ai.timeout_secs, 15);
        assert_eq!(loaded.get("data_dir").unwrap(), "/srv/hvt");

        let mut cleared = loaded.clone();
        cleared.set("remote.base_url", "").unwrap();
        assert!(cleared.remote.base_url.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ai]\nmodel = \"gemini-2.0-pro\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ai.model, "gemini-2.0-pro");
        assert_eq!(config.ai.timeout_secs, 60);
        assert_eq!(config.remote.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        assert!(config.set("ai.api_key", "secret").is_err());
        assert!(config.set("ai.timeout_secs", "0").is_err());
        assert!(config.set("ai.timeout_secs", "soon").is_err());
        assert!(config.set("remote.base_url", "ftp://x").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert!(config.get("colour").is_err());
        assert_eq!(config.list().unwrap().len(), KEYS.len());
    }
}
