//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use robbit_core::config::{CliConfigOverrides, LayeredConfig, Settings};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "robbit.toml";

/// Load layered configuration: defaults, then the file, then the environment.
///
/// An explicit `path` must exist; the default `robbit.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<LayeredConfig> {
    let config = LayeredConfig::with_defaults();

    let config = match path {
        Some(path) => config
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?,
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default.exists() {
                config.load_from_file(&default).context("Failed to load robbit.toml")?
            } else {
                config
            }
        }
    };

    Ok(config.load_from_env())
}

/// Load and resolve settings with CLI overrides applied last
pub fn load_settings(path: Option<&Path>, overrides: CliConfigOverrides) -> Result<Settings> {
    let mut config = load_config(path)?;
    config.update_from_cli(overrides);
    config.resolve().context("Invalid configuration")
}
