//! Configuration loading and builder methods.

use std::{fs, path::Path};

use super::types::{Config, ConfigBuilder, KeyStoreConfig};
use crate::{Error, Result};

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a TOML document. Missing sections and keys fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, writing a default file there first if none exists.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            Self::from_toml_str(&raw)
        } else {
            let config = Self::default();
            config.write(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            Ok(config)
        }
    }

    /// Serialize and write the config as TOML.
    pub fn write(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, raw)?;
        Ok(())
    }

    /// Reject values that would make a component unusable.
    pub fn validate(&self) -> Result<()> {
        if self.directory.timeout_ms == 0 {
            return Err(Error::Config("directory.timeout_ms must be positive".into()));
        }
        if self.keystore.argon2_iterations == 0 || self.keystore.argon2_parallelism == 0 {
            return Err(Error::Config("argon2 iterations and parallelism must be positive".into()));
        }
        if self.matching.batch_interval_secs == 0 {
            return Err(Error::Config("matching.batch_interval_secs must be positive".into()));
        }
        Ok(())
    }
}

impl KeyStoreConfig {
    /// Cheap parameters for tests. Never use for real keyrings.
    pub fn insecure_for_tests() -> Self {
        Self { argon2_memory_kib: 64, argon2_iterations: 1, argon2_parallelism: 1 }
    }
}

impl ConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }

    pub fn keystore(mut self, keystore: KeyStoreConfig) -> Self {
        self.config.keystore = keystore;
        self
    }

    pub fn directory_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.directory.timeout_ms = timeout_ms;
        self
    }

    pub fn hop_limit(mut self, hop_limit: u32) -> Self {
        self.config.matching.hop_limit = hop_limit;
        self
    }

    pub fn batch_interval_secs(mut self, secs: u64) -> Self {
        self.config.matching.batch_interval_secs = secs;
        self
    }
}
