//! Configuration data structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keystore: KeyStoreConfig,
    pub directory: DirectoryConfig,
    pub matching: MatchingConfig,
}

/// Argon2id parameters protecting the keyring at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreConfig {
    /// Memory cost in KiB
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self { argon2_memory_kib: 65536, argon2_iterations: 3, argon2_parallelism: 4 }
    }
}

/// Key directory behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Upper bound on every registry round trip
    pub timeout_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Matching engine and scheduled recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Graph distance beyond which the network dimension scores 0
    pub hop_limit: u32,
    pub batch_interval_secs: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { hop_limit: 3, batch_interval_secs: 24 * 3600 }
    }
}

impl MatchingConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs(self.batch_interval_secs)
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    pub(crate) config: Config,
}
