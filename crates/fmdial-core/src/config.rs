use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Where the station list lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Path to the JSON station file.
    /// Defaults to `$XDG_CONFIG_HOME/fmdial/stations.json`.
    #[serde(default = "default_stations_file")]
    pub stations_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Startup volume, 0..=100.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            stations_file: default_stations_file(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

fn default_stations_file() -> PathBuf {
    platform::config_dir().join("stations.json")
}

fn default_volume() -> u8 {
    80
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("malformed config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stations: StationsConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.playback.default_volume, 80);
        assert!(config
            .stations
            .stations_file
            .ends_with("fmdial/stations.json"));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.playback.default_volume, 80);
    }

    #[test]
    fn test_load_from_rejects_malformed_toml() {
        let path = std::env::temp_dir().join(format!(
            "fmdial-config-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[playback\ndefault_volume = 80").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("malformed config"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("could not read config"));
    }
}
