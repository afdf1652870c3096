//! Configuration for trustmesh components.
//!
//! Every section has defaults, so an empty TOML document is a valid config.

mod methods;
mod types;

pub use types::{Config, ConfigBuilder, DirectoryConfig, KeyStoreConfig, MatchingConfig};
