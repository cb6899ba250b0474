// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::{Result, RolloutError};
use crate::models::UpdateStyle;
use config::{Config, Environment, File, FileFormat};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.toml";
const ROLLOUT_DIR_NAME: &str = ".rollout";
const ENV_PREFIX: &str = "ROLLOUT";

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 60 * MINUTE_MS;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    pub client: ClientConfig,
    pub update: UpdateConfig,
    pub download: DownloadConfig,
    pub failover: FailoverConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub language: String,
    pub pro: bool,
    /// Highest update style the user wants to hear about.
    pub style: UpdateStyle,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            pro: false,
            style: UpdateStyle::Minor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Window over which notifications are spread after a collection's timestamp.
    pub delay_ms: u64,
    /// Interval of the periodic download retry.
    pub retry_delay_ms: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            delay_ms: DAY_MS,
            retry_delay_ms: 30 * MINUTE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Window over which update transfers are spread.
    pub delay_ms: u64,
    pub giveup_factor: u64,
    pub min_attempts: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            delay_ms: DAY_MS,
            giveup_factor: 2,
            min_attempts: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    pub timeout_url: String,
    pub max_urls: Vec<String>,
    pub min_max_delay_ms: u64,
    pub max_max_delay_ms: u64,
    pub silent_period_ms: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            timeout_url: "http://update0.rollout.invalid/v3/update.def".to_string(),
            max_urls: (1..=10)
                .map(|i| format!("http://update{i}.rollout.invalid/v3/update.def"))
                .collect(),
            min_max_delay_ms: MINUTE_MS,
            max_max_delay_ms: 30 * MINUTE_MS,
            silent_period_ms: 5 * MINUTE_MS,
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
        }
    }
}

impl FailoverConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub document_file: String,
    pub state_file: String,
    pub update_dir: String,
    pub bundled_document: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            document_file: "version.xml".to_string(),
            state_file: "update_state.json".to_string(),
            update_dir: "updates".to_string(),
            bundled_document: None,
        }
    }
}

/// `ROLLOUT_HOME` when set to an absolute path, else `~/.rollout`.
pub fn rollout_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("ROLLOUT_HOME") {
        let path = PathBuf::from(home);
        if path.is_absolute() {
            return Ok(path);
        }
        log::warn!("Ignoring relative ROLLOUT_HOME {path:?}");
    }

    home_dir()
        .map(|home| home.join(ROLLOUT_DIR_NAME))
        .ok_or_else(|| RolloutError::ConfigError("Unable to determine home directory".to_string()))
}

impl RolloutConfig {
    /// Loads `<home>/config.toml` with `ROLLOUT_*` environment overrides,
    /// e.g. `ROLLOUT_DOWNLOAD__MIN_ATTEMPTS=10`.
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = home.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            log::debug!("Config file not found at {config_path:?}, using defaults");
        }

        let settings = Config::builder()
            .add_source(File::from(config_path.clone()).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("failover.max_urls")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| RolloutError::ConfigError(format!("Failed to load configuration: {e}")))?;

        let config: RolloutConfig = settings
            .try_deserialize()
            .map_err(|e| RolloutError::InvalidConfig(format!("{config_path:?}: {e}")))?;

        config.validate()?;
        log::debug!("Loaded config from {config_path:?}");
        Ok(config)
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        let config_path = home.join(CONFIG_FILE_NAME);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| RolloutError::ConfigError(format!("Failed to serialize config: {e}")))?;

        fs::write(&config_path, contents)?;
        log::debug!("Saved config to {config_path:?}");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.failover.min_max_delay_ms > self.failover.max_max_delay_ms {
            return Err(RolloutError::InvalidConfig(
                "failover.min_max_delay_ms exceeds failover.max_max_delay_ms".to_string(),
            ));
        }
        if self.client.language.trim().is_empty() {
            return Err(RolloutError::InvalidConfig(
                "client.language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn document_path(&self, home: &Path) -> PathBuf {
        home.join(&self.storage.document_file)
    }

    pub fn state_path(&self, home: &Path) -> PathBuf {
        home.join(&self.storage.state_file)
    }

    pub fn update_dir(&self, home: &Path) -> PathBuf {
        home.join(&self.storage.update_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RolloutConfig::default();
        assert_eq!(config.client.language, "en");
        assert_eq!(config.client.style, UpdateStyle::Minor);
        assert_eq!(config.update.delay_ms, DAY_MS);
        assert_eq!(config.download.giveup_factor, 2);
        assert_eq!(config.download.min_attempts, 500);
        assert_eq!(config.failover.max_urls.len(), 10);
        assert_eq!(config.failover.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.storage.bundled_document, None);
    }

    #[test]
    #[serial]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = RolloutConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, RolloutConfig::default());
    }

    #[test]
    #[serial]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = RolloutConfig::default();
        config.client.language = "fr".to_string();
        config.client.style = UpdateStyle::Major;
        config.download.min_attempts = 10;
        config.failover.max_urls = vec!["http://mirror.invalid/update".to_string()];

        config.save(temp_dir.path()).unwrap();

        let loaded = RolloutConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"
[download]
min_attempts = 3

[storage]
bundled_document = "/opt/rollout/version.xml"
"#,
        )
        .unwrap();

        let loaded = RolloutConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.download.min_attempts, 3);
        assert_eq!(loaded.download.giveup_factor, 2);
        assert_eq!(
            loaded.storage.bundled_document,
            Some(PathBuf::from("/opt/rollout/version.xml"))
        );
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        let temp_dir = TempDir::new().unwrap();
        unsafe {
            std::env::set_var("ROLLOUT_DOWNLOAD__GIVEUP_FACTOR", "7");
        }
        let loaded = RolloutConfig::load(temp_dir.path());
        unsafe {
            std::env::remove_var("ROLLOUT_DOWNLOAD__GIVEUP_FACTOR");
        }
        assert_eq!(loaded.unwrap().download.giveup_factor, 7);
    }

    #[test]
    #[serial]
    fn test_invalid_delay_window() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[failover]\nmin_max_delay_ms = 10\nmax_max_delay_ms = 5\n",
        )
        .unwrap();
        assert!(matches!(
            RolloutConfig::load(temp_dir.path()),
            Err(RolloutError::InvalidConfig(_))
        ));
    }

    #[test]
    #[serial]
    fn test_rollout_home_env() {
        let temp_dir = TempDir::new().unwrap();
        unsafe {
            std::env::set_var("ROLLOUT_HOME", temp_dir.path());
        }
        let home = rollout_home().unwrap();
        unsafe {
            std::env::remove_var("ROLLOUT_HOME");
        }
        assert_eq!(home, temp_dir.path());
    }
}
