//! Deployment Configuration
//!
//! Handles loading and saving deployment configuration from TOML files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veil_fhe::CoprocessorConfig;
use veil_registry::{Address, RegistryConfig};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full deployment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeilConfig {
    /// Registry deployment parameters
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Local coprocessor / KMS settings
    #[serde(default)]
    pub oracle: OracleSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl VeilConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Create configuration for a named network
    pub fn for_network(network: &str) -> Self {
        match network {
            "testnet" => Self::testnet(),
            _ => Self::local(),
        }
    }

    /// Local development configuration
    pub fn local() -> Self {
        Self {
            registry: RegistrySettings {
                network: "local".to_string(),
                cooldown_seconds: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Testnet configuration
    pub fn testnet() -> Self {
        Self {
            registry: RegistrySettings {
                network: "testnet".to_string(),
                address: Address::from_label("veil-registry-testnet").to_string(),
                cooldown_seconds: 60,
                ..Default::default()
            },
            oracle: OracleSettings::from(CoprocessorConfig::with_signers(7)),
            logging: LoggingSettings {
                level: "info".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.cooldown_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Cooldown must be greater than 0".to_string(),
            ));
        }

        if self.oracle.threshold > self.oracle.signer_count {
            return Err(ConfigError::Invalid(
                "Threshold cannot exceed signer count".to_string(),
            ));
        }

        if self.oracle.threshold == 0 {
            return Err(ConfigError::Invalid(
                "Threshold must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "Unknown log format '{}' (expected text or json)",
                self.logging.format
            )));
        }

        self.registry_address()?;
        self.owner()?;
        Ok(())
    }

    pub fn registry_address(&self) -> Result<Address, ConfigError> {
        parse_address("registry.address", &self.registry.address)
    }

    pub fn owner(&self) -> Result<Address, ConfigError> {
        parse_address("registry.owner", &self.registry.owner)
    }

    /// Deployment parameters for a fresh registry
    pub fn registry_config(&self) -> Result<RegistryConfig, ConfigError> {
        Ok(RegistryConfig::new(self.registry_address()?, self.owner()?)
            .with_cooldown(self.registry.cooldown_seconds))
    }

    pub fn coprocessor_config(&self) -> CoprocessorConfig {
        CoprocessorConfig {
            signer_count: self.oracle.signer_count,
            threshold: self.oracle.threshold,
        }
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{}: {}", field, e)))
}

/// Registry deployment parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Network name (local, testnet)
    pub network: String,

    /// Registry identity, 0x-prefixed hex
    pub address: String,

    /// Initial owner, 0x-prefixed hex
    pub owner: String,

    /// Initial cooldown interval
    pub cooldown_seconds: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            network: "local".to_string(),
            address: Address::from_label("veil-registry-local").to_string(),
            owner: Address::from_label("owner").to_string(),
            cooldown_seconds: veil_registry::DEFAULT_COOLDOWN_SECONDS,
        }
    }
}

/// Local coprocessor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Number of KMS signers
    pub signer_count: usize,

    /// Signatures required on a decryption proof
    pub threshold: usize,
}

impl From<CoprocessorConfig> for OracleSettings {
    fn from(config: CoprocessorConfig) -> Self {
        Self {
            signer_count: config.signer_count,
            threshold: config.threshold,
        }
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        CoprocessorConfig::default().into()
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database file name inside the data directory
    pub db_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_file: veil_storage::DEFAULT_DB_FILE.to_string(),
        }
    }
}

/// Logging settings, used when `--log-level` / `--json-logs` are not given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl LoggingSettings {
    pub fn json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Get default data directory
///
/// Shared by every network preset; the deployed network is recorded in the
/// config file inside it.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "veil", "veil")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".veil"))
}

/// Get default config file path
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}
