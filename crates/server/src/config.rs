//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::artifacts::DEFAULT_ARTIFACT_DIR;
use serde::Deserialize;
use std::path::PathBuf;

/// Optional configuration file, looked up in the working directory
const CONFIG_FILE: &str = "charges-server";

/// Prefix of environment overrides (`CHARGES_PORT`, `CHARGES_ARTIFACT_DIR`, ...)
const ENV_PREFIX: &str = "CHARGES";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the model artifact and the feature schema
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Load artifacts at startup instead of on the first request
    #[serde(default)]
    pub preload: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_DIR)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            artifact_dir: default_artifact_dir(),
            preload: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read server configuration")?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("Invalid server configuration")
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
