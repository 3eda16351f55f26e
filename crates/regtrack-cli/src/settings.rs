//! Configuration loading: optional TOML file layered with environment
//! variables (`REGTRACK__REGISTRY__API_KEY=...`).

use std::path::Path;

use config::{Config, Environment, File};
use regtrack_core::TrackerConfig;
use tracing::debug;

use crate::error::CliError;

const ENV_PREFIX: &str = "REGTRACK";
const DEFAULT_FILE: &str = "regtrack";

/// An explicit `path` must exist; without one, `./regtrack.toml` is read if
/// present. The result is not validated.
pub fn load(path: Option<&Path>) -> Result<TrackerConfig, CliError> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, environment: Environment) -> Result<TrackerConfig, CliError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_FILE).required(false),
    };

    let config: TrackerConfig = Config::builder()
        .add_source(file)
        .add_source(
            environment
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    debug!(?config, "configuration loaded");
    Ok(config)
}
