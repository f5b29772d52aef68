use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "TRIAGE_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_LLM_URL: &str = "TRIAGE_LLM_URL";
const ENV_LLM_MODEL: &str = "TRIAGE_LLM_MODEL";
const ENV_LLM_TIMEOUT_SECS: &str = "TRIAGE_LLM_TIMEOUT_SECS";

const DEFAULT_LLM_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "google/gemini-3-flash-preview";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Per-user triage quota configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TriageLimits {
    /// Maximum analyses per user per trailing hour
    #[serde(default = "default_hourly_limit")]
    pub hourly_limit: i64,
    /// Maximum findings selected for one batch
    #[serde(default = "default_batch_cap")]
    pub batch_cap: u32,
}

fn default_hourly_limit() -> i64 {
    20
}

fn default_batch_cap() -> u32 {
    50
}

impl Default for TriageLimits {
    fn default() -> Self {
        Self {
            hourly_limit: default_hourly_limit(),
            batch_cap: default_batch_cap(),
        }
    }
}

/// Model endpoint configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Sampling temperature, kept low for reproducibility
    pub temperature: f32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub limits: TriageLimits,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub limits: TriageLimits,
    pub llm: LlmConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: TriageLimits::default(),
            llm: LlmConfig {
                endpoint: DEFAULT_LLM_URL.to_string(),
                model: DEFAULT_LLM_MODEL.to_string(),
                temperature: 0.3,
                timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            },
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let endpoint = std::env::var(ENV_LLM_URL).unwrap_or_else(|_| DEFAULT_LLM_URL.to_string());
        let model =
            std::env::var(ENV_LLM_MODEL).unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());
        let timeout_secs = std::env::var(ENV_LLM_TIMEOUT_SECS)
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        // Load config file
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let limits = Self::load_config_file(&config_path)
            .map(|cf| cf.limits)
            .unwrap_or_default();

        Self {
            limits,
            llm: LlmConfig {
                endpoint,
                model,
                temperature: 0.3,
                timeout_secs,
            },
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Handle empty file
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_to_hourly_20_batch_50() {
        let limits = TriageLimits::default();
        assert_eq!(limits.hourly_limit, 20);
        assert_eq!(limits.batch_cap, 50);
    }

    #[test]
    fn config_file_fills_missing_fields() {
        let cf: ConfigFile = serde_yaml::from_str("limits:\n  hourly_limit: 5\n").unwrap();
        assert_eq!(cf.limits.hourly_limit, 5);
        assert_eq!(cf.limits.batch_cap, 50);
    }
}
