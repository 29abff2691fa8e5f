//! Configuration for the registration registry

use crate::registration::error::RegistrationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const FIVE_MIB: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file backing the key-value store
    pub data_path: PathBuf,
    /// Password given to every driver derived from an approved registration
    pub default_driver_password: String,
    pub default_driver_rating: f32,
    pub max_photo_bytes: u64,
    /// Whether newly registered passengers can log in straight away
    pub passenger_active_by_default: bool,
    /// Seed the demo drivers and passengers into an empty store
    pub seed_demo_accounts: bool,
    pub listen_addr: String,
}

impl RegistryConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistrationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RegistrationError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&text).map_err(|e| {
            RegistrationError::ConfigError(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn with_default_driver_password(mut self, password: impl Into<String>) -> Self {
        self.default_driver_password = password.into();
        self
    }

    pub fn with_passengers_active(mut self, active: bool) -> Self {
        self.passenger_active_by_default = active;
        self
    }

    pub fn with_demo_accounts(mut self, seed: bool) -> Self {
        self.seed_demo_accounts = seed;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/registry.json"),
            default_driver_password: "123456".to_string(),
            default_driver_rating: 4.5,
            max_photo_bytes: FIVE_MIB,
            passenger_active_by_default: true,
            seed_demo_accounts: false,
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: RegistryConfig = toml::from_str(
            r#"
            data_path = "/tmp/registry.json"
            passenger_active_by_default = false
            "#,
        )
        .unwrap();

        assert_eq!(cfg.data_path, PathBuf::from("/tmp/registry.json"));
        assert!(!cfg.passenger_active_by_default);
        assert_eq!(cfg.default_driver_password, "123456");
        assert_eq!(cfg.max_photo_bytes, FIVE_MIB);
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = RegistryConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, RegistrationError::ConfigError(_)));
    }
}
