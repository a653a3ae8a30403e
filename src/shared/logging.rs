//! tracing-subscriber setup for the binary

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::shared::config::LoggingCfg;

const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "h2=warn"];

/// `RUST_LOG` wins over `[logging] level`; HTTP internals are capped at warn.
pub fn build_filter(cfg: &LoggingCfg) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.level.as_str()));
    for target in QUIET_TARGETS {
        if let Ok(directive) = target.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(cfg: &LoggingCfg) {
    let filter = build_filter(cfg);
    let installed = if cfg.json {
        tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(filter)
            .try_init()
    };

    if installed.is_ok() {
        tracing::info!(level = %cfg.level, json = cfg.json, "logging initialized");
    }
}
