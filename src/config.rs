use std::time::Duration;
use std::{fs, io, path::Path};

use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Read(#[from] io::Error),
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for one fetch through the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub proxy: String,
    pub url: String,
    pub timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: "localhost:1080".to_string(),
            url: "http://github.com/about/".to_string(),
            timeout_ms: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
