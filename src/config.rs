//! Daemon configuration loaded from a TOML file under the home directory.
//!
//! Missing files and missing keys fall back to defaults so the daemon stays
//! bootable on a factory-fresh device; a present-but-broken file is an
//! error, silently ignoring operator intent would be worse.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::state::SchemaProfile;

const CONFIG_DIR: &str = ".config/airmond";
const CONFIG_FILE: &str = "airmond.toml";
const STATE_DIR: &str = ".local/state/airmond";
const STATE_FILE: &str = "sensor_state.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("config file {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown schema profile `{0}` (expected `standard` or `altitude`)")]
    UnknownProfile(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct DaemonConfig {
    pub broker: BrokerConfig,
    pub device: DeviceConfig,
    pub indicator: IndicatorConfig,
}

/// Fixed broker connection parameters for this daemon role.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    pub client_id: String,
    /// Wall-clock budget for the initial connect before the error is fatal.
    pub startup_deadline_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive_secs: 60,
            client_id: "air_quality_monitor".to_string(),
            startup_deadline_secs: 10,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct DeviceConfig {
    /// Interface whose MAC address becomes the device identity.
    pub interface: String,
    /// Schema profile selecting the required sensor fields.
    pub profile: String,
    /// Overrides the default state record location.
    pub state_path: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            profile: "standard".to_string(),
            state_path: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Gpio,
    Log,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct IndicatorConfig {
    pub driver: IndicatorKind,
    pub red_pin: u8,
    pub green_pin: u8,
    pub blue_pin: u8,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            driver: IndicatorKind::Gpio,
            red_pin: 23,
            green_pin: 24,
            blue_pin: 25,
        }
    }
}

impl DaemonConfig {
    /// Loads `~/.config/airmond/airmond.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_config_path())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                info!(
                    "no config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn schema_profile(&self) -> Result<SchemaProfile, ConfigError> {
        SchemaProfile::by_name(&self.device.profile)
            .ok_or_else(|| ConfigError::UnknownProfile(self.device.profile.clone()))
    }

    pub fn state_path(&self) -> PathBuf {
        self.device
            .state_path
            .clone()
            .unwrap_or_else(|| home_dir().join(STATE_DIR).join(STATE_FILE))
    }
}

pub fn default_config_path() -> PathBuf {
    home_dir().join(CONFIG_DIR).join(CONFIG_FILE)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DaemonConfig::load(&dir.path().join("airmond.toml")).expect("load");

        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.startup_deadline_secs, 10);
        assert_eq!(config.device.profile, "standard");
        assert_eq!(config.indicator.driver, IndicatorKind::Gpio);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("airmond.toml");
        fs::write(
            &path,
            "[broker]\nhost = \"broker.lan\"\n\n[device]\nprofile = \"altitude\"\n",
        )
        .expect("write");

        let config = DaemonConfig::load(&path).expect("load");
        assert_eq!(config.broker.host, "broker.lan");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.schema_profile().expect("profile").name(), "altitude");
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("airmond.toml");
        fs::write(&path, "[broker\nhost=").expect("write");

        assert!(matches!(
            DaemonConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = DaemonConfig {
            device: DeviceConfig {
                profile: "bme680".to_string(),
                ..DeviceConfig::default()
            },
            ..DaemonConfig::default()
        };

        assert!(matches!(
            config.schema_profile(),
            Err(ConfigError::UnknownProfile(name)) if name == "bme680"
        ));
    }

    #[test]
    fn state_path_override_wins() {
        let config = DaemonConfig {
            device: DeviceConfig {
                state_path: Some(PathBuf::from("/var/lib/airmond/state.toml")),
                ..DeviceConfig::default()
            },
            ..DaemonConfig::default()
        };

        assert_eq!(
            config.state_path(),
            PathBuf::from("/var/lib/airmond/state.toml")
        );
    }
}
