use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_LITELLM_PROXY_URL, DEFAULT_MAX_EPISODES, DEFAULT_SESSION_TTL_SECS,
    DEFAULT_SWEEP_PROBABILITY,
};
use crate::utils::CogflowError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session lifecycle
    #[serde(default)]
    pub session: SessionConfig,

    /// Stage processor selection
    #[serde(default)]
    pub stages: StageConfig,

    /// LiteLLM proxy used by model-backed stages
    #[serde(default)]
    pub litellm: LiteLlmConfig,

    /// Long-term memory
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Reject values the runtime cannot honor
    pub fn validate(&self) -> Result<(), CogflowError> {
        let p = self.session.sweep_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(CogflowError::Config(format!(
                "session.sweep_probability must be within [0, 1], got {}",
                p
            )));
        }
        if self.session.ttl_secs == 0 {
            return Err(CogflowError::Config(
                "session.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.session.sweep_interval_secs == Some(0) {
            return Err(CogflowError::Config(
                "session.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.memory.enabled && self.memory.max_episodes == 0 {
            return Err(CogflowError::Config(
                "memory.max_episodes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session may be evicted
    pub ttl_secs: u64,
    /// Fraction of incoming turns that trigger a sweep
    pub sweep_probability: f64,
    /// Optional fixed-interval background sweep
    pub sweep_interval_secs: Option<u64>,
    /// Optional cap on how long one turn may run its stages
    pub turn_timeout_secs: Option<u64>,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
            sweep_interval_secs: None,
            turn_timeout_secs: None,
        }
    }
}

/// Stage processor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageConfig {
    /// Use model-backed processors instead of local heuristics
    pub use_model: bool,
    /// Max acceptable cost per 1M tokens when routing models
    pub cost_threshold: Option<f64>,
}

/// LiteLLM proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteLlmConfig {
    pub proxy_url: String,
    /// Overridden by LITELLM_MASTER_KEY when set
    pub master_key: Option<String>,
}

impl Default for LiteLlmConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_LITELLM_PROXY_URL.to_string(),
            master_key: None,
        }
    }
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Record turns in episodic memory
    pub enabled: bool,
    /// Episodes kept before the oldest are dropped
    pub max_episodes: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_episodes: DEFAULT_MAX_EPISODES,
        }
    }
}

/// Load configuration from multiple sources
///
/// Precedence, lowest first: defaults, global config, local
/// `.cogflow/config.toml`, explicit file, `COGFLOW_` environment variables.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.toml");
        if global_config.exists() {
            figment = figment.merge(Toml::file(&global_config));
        }
    }

    let local_config = PathBuf::from(".cogflow/config.toml");
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    // COGFLOW_SESSION__TTL_SECS=60 -> session.ttl_secs
    figment = figment.merge(Env::prefixed("COGFLOW_").split("__"));

    let config: Config = figment.extract().context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "cogflow") {
        Ok(proj_dirs.config_dir().to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        Ok(PathBuf::from(home).join(".config").join("cogflow"))
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => get_config_dir()?.join("config.toml"),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(path)
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<Option<PathBuf>> {
    let config_file = get_config_dir()?.join("config.toml");
    if config_file.exists() {
        return Ok(None);
    }
    save_config(&Config::default(), Some(config_file)).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.ttl(), Duration::from_secs(30 * 60));
        assert_eq!(config.session.sweep_probability, 0.01);
        assert_eq!(config.session.sweep_interval(), None);
        assert!(!config.stages.use_model);
        assert!(config.memory.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cogflow.toml");
        std::fs::write(
            &path,
            r#"
[session]
ttl_secs = 120
sweep_probability = 0.5
sweep_interval_secs = 30

[stages]
use_model = true
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.session.sweep_probability, 0.5);
        assert_eq!(config.session.sweep_interval(), Some(Duration::from_secs(30)));
        assert!(config.stages.use_model);
        // Untouched sections keep their defaults
        assert_eq!(config.litellm.proxy_url, DEFAULT_LITELLM_PROXY_URL);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let mut config = Config::default();
        config.session.sweep_probability = 1.5;
        assert!(matches!(config.validate(), Err(CogflowError::Config(_))));

        config.session.sweep_probability = 0.1;
        config.session.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_episode_cap() {
        let mut config = Config::default();
        assert_eq!(config.memory.max_episodes, DEFAULT_MAX_EPISODES);
        config.memory.max_episodes = 0;
        assert!(matches!(config.validate(), Err(CogflowError::Config(_))));

        config.memory.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_round_trips_through_loader() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.session.ttl_secs = 99;
        let path = save_config(&config, Some(dir.path().join("nested/config.toml"))).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.session.ttl_secs, 99);
    }
}
