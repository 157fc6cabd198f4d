use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::runner::PauseRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub take_data_random: bool,
    pub max_tasks_retries: u32,
    pub pause_between_tasks: PauseRange,
    pub pause_between_accounts: PauseRange,
    pub threads: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            take_data_random: false,
            max_tasks_retries: 0,
            pause_between_tasks: PauseRange::default(),
            pause_between_accounts: PauseRange::default(),
            threads: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub request: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request: 60 }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub server_url: String,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            run: RunSettings::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path.unwrap_or_else(Self::default_config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn default_config_path() -> PathBuf {
        if let Some(config_path) = std::env::var_os("XBATCH_CONFIG") {
            PathBuf::from(config_path)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("xbatch")
                .join("config.yaml")
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.run.threads = threads;
        self
    }

    pub fn with_take_data_random(mut self, take_data_random: bool) -> Self {
        self.run.take_data_random = take_data_random;
        self
    }
}
