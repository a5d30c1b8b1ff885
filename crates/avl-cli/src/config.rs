use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use avl_catalog::DEFAULT_MAX_DEPTH;
use avl_zarr::S3Options;

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "avl.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config file '{0}' not found")]
    NotFound(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvlConfig {
    pub catalogue: CatalogueConfig,
}

/// `[catalogue]` section; the S3 settings also apply to `verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    pub bucket: Option<String>,
    pub prefix: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub anonymous: bool,
    pub max_depth: usize,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            region: None,
            endpoint: None,
            anonymous: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CatalogueConfig {
    pub fn s3_options(&self) -> S3Options {
        let non_empty = |value: &Option<String>| value.clone().filter(|text| !text.is_empty());
        S3Options {
            region: non_empty(&self.region),
            endpoint: non_empty(&self.endpoint),
            anonymous: self.anonymous,
        }
    }
}

/// Load `path`, or `avl.toml` if present; defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AvlConfig, ConfigError> {
    let path = match path {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(AvlConfig::default());
            }
            default
        }
    };
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
