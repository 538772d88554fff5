//! Configuration loading and validation for the clusterprobe server.

use clusterprobe::{ClientSettings, ProbeSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub probes: ProbeSettings,

    #[serde(default)]
    pub client: ClientSettings,

    #[serde(default)]
    pub persistence: PersistenceSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server-level settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerSettings {
    /// Address the API and metrics listener binds to.
    #[validate(length(min = 1))]
    pub listen: String,
}

/// Registration persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// JSON file holding the registered probe URIs, replayed at startup.
    pub path: PathBuf,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.server.validate()?;
        validate_probes(&self.probes)?;
        validate_client(&self.client)?;
        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./config.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            probes: ProbeSettings::default(),
            client: ClientSettings::default(),
            persistence: PersistenceSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// Custom validators

fn field_errors(field: &'static str, error: ValidationError) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

fn validate_probes(probes: &ProbeSettings) -> Result<(), ValidationErrors> {
    if !(100..=10_000_000).contains(&probes.http_history_size) {
        return Err(field_errors(
            "probes",
            ValidationError::new("history_size_out_of_range"),
        ));
    }

    let delay = probes.check_delay.as_millis();
    if !(10..=60_000).contains(&delay) {
        return Err(field_errors(
            "probes",
            ValidationError::new("check_delay_out_of_range"),
        ));
    }

    if probes.connect_timeout < Duration::from_millis(100)
        || probes.connect_timeout > Duration::from_secs(60)
    {
        return Err(field_errors(
            "probes",
            ValidationError::new("connect_timeout_out_of_range"),
        ));
    }

    Ok(())
}

fn validate_client(client: &ClientSettings) -> Result<(), ValidationErrors> {
    if !(1..=20).contains(&client.max_attempts) {
        return Err(field_errors(
            "client",
            ValidationError::new("max_attempts_out_of_range"),
        ));
    }

    if client.request_timeout < Duration::from_millis(100)
        || client.request_timeout > Duration::from_secs(120)
    {
        return Err(field_errors(
            "client",
            ValidationError::new("request_timeout_out_of_range"),
        ));
    }

    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations.
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/clusterprobe/clusterprobe.yaml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config/clusterprobe/clusterprobe.yaml"));
        }

        paths.push(PathBuf::from("./clusterprobe.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn valid_yaml_parsing() {
        let yaml = r#"
server:
  listen: "127.0.0.1:9000"

probes:
  http_history_size: 5000
  check_delay: 250ms
  connect_timeout: 2s

client:
  request_timeout: 5s
  max_attempts: 3
  retry_deadline: 4s

persistence:
  path: "/var/lib/clusterprobe/config.json"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.probes.http_history_size, 5000);
        assert_eq!(config.probes.check_delay, Duration::from_millis(250));
        assert_eq!(config.client.max_attempts, 3);
        assert_eq!(
            config.persistence.path,
            PathBuf::from("/var/lib/clusterprobe/config.json")
        );
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let yaml = r#"
server:
  listen: "127.0.0.1:9000"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.probes.http_history_size, 100_000);
        assert_eq!(config.probes.check_delay, Duration::from_millis(100));
        assert_eq!(config.client.max_attempts, 6);
        assert_eq!(config.persistence.path, PathBuf::from("./config.json"));
    }

    #[test]
    fn rejects_tiny_history() {
        let yaml = r#"
probes:
  http_history_size: 10
  check_delay: 100ms
  connect_timeout: 5s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_check_delay() {
        let yaml = r#"
probes:
  http_history_size: 1000
  check_delay: 1ms
  connect_timeout: 5s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_excessive_attempts() {
        let yaml = r#"
client:
  request_timeout: 5s
  max_attempts: 50
  retry_deadline: 10s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_listen_address() {
        let yaml = r#"
server:
  listen: ""
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
