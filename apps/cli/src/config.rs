use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use trustmesh::Config;

/// CLI configuration: the library sections plus a `[cli]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cli: CliSection,
    #[serde(flatten)]
    pub core: Config,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSection {
    /// Identity the keyring belongs to
    pub identity: String,
    /// Keyring file; relative paths resolve against the config directory
    pub keyring: PathBuf,
    pub registry_url: String,
}

impl Default for CliSection {
    fn default() -> Self {
        Self { identity: String::new(), keyring: PathBuf::from("keyring.json"), registry_url: "http://127.0.0.1:8081".into() }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &Path) -> PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().is_none_or(|ext| ext != "toml") {
        path.set_extension("toml");
    }
    path
}

/// `$XDG_CONFIG_HOME/trustmesh/config.toml`, or under `$HOME/.config`.
fn default_config_path() -> Result<PathBuf> {
    let base = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(config_home)
    } else if let Some(home) = env::home_dir() {
        home.join(".config")
    } else {
        bail!("no config path given and neither XDG_CONFIG_HOME nor HOME is set");
    };
    Ok(base.join("trustmesh/config.toml"))
}

impl Settings {
    /// Load settings, writing defaults to the path first if nothing is there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => normalize_toml_path(path),
            None => default_config_path()?,
        };

        let mut settings = if path.exists() {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let settings: Settings = toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
            settings.core.validate()?;
            settings
        } else {
            let settings = Self::default();
            settings.write(&path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            settings
        };

        if settings.cli.keyring.is_relative() {
            if let Some(dir) = path.parent() {
                settings.cli.keyring = dir.join(&settings.cli.keyring);
            }
        }
        Ok(settings)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("serializing settings")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
    }

    /// The configured identity, which must be set before keys are touched.
    pub fn identity(&self) -> Result<trustmesh::IdentityId> {
        let identity = self.cli.identity.trim();
        if identity.is_empty() {
            bail!("cli.identity is not set in the configuration file");
        }
        Ok(identity.into())
    }
}
