//! Tracing setup shared by the trustmesh binaries.
//!
//! `RUST_LOG` overrides the default level. `RUST_LOG_FORMAT=json` switches to
//! one JSON object per line. Audit events (`target: "trustmesh::audit"`) stay
//! enabled at `info` unless `RUST_LOG` says otherwise for that target.

use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const AUDIT_DIRECTIVE: &str = "trustmesh::audit=info";

pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Install the global subscriber. Does nothing if one is already set.
pub fn init_with_level(level: LevelFilter) {
    let env_filter = env_filter(level);

    let log_format = var("RUST_LOG_FORMAT")
        .inspect_err(|error| {
            if matches!(error, std::env::VarError::NotUnicode(_)) {
                warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}")
            }
        })
        .unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    let _ = tracing_subscriber::registry().with(log_layer).try_init();
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    let mut filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    let overridden = var("RUST_LOG").is_ok_and(|v| v.contains("trustmesh::audit"));
    if !overridden {
        if let Ok(directive) = AUDIT_DIRECTIVE.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}
