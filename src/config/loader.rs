//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// Error type for configuration loading and watching.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("config store is already watching")]
    AlreadyWatching,
}

/// A parsed configuration together with the file modification time
/// observed before it was read.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GatewayConfig,
    pub modified: SystemTime,
}

/// Modification time of the config file.
pub fn modified_time(path: &Path) -> Result<SystemTime, ConfigError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Load a configuration from a YAML file.
///
/// An empty document yields the default configuration. Default error
/// messages are filled in before returning.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let modified = modified_time(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(LoadedConfig {
        config: parse_config(path, &content)?,
        modified,
    })
}

fn parse_config(path: &Path, content: &str) -> Result<GatewayConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(GatewayConfig::default().with_defaults());
    }

    let config: GatewayConfig = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(config.with_defaults())
}
