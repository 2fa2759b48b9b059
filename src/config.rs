//! Configuration management for odps-review.
//!
//! Handles loading configuration from TOML files and environment variables,
//! with support for named ODPS instances and engine tuning settings.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Default public ODPS endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://service.odps.aliyun.com/api";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Engine tuning settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Named ODPS instances.
    #[serde(default)]
    pub instances: HashMap<String, InstanceConfig>,
}

/// Engine tuning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Row limit applied to ad-hoc queries when none is given.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    /// Interval between instance status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum time to wait for a single SQL instance, in seconds.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// HTTP request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_query_limit() -> usize {
    1000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_job_timeout_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            query_limit: default_query_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EngineSettings {
    /// Returns the poll interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the job timeout as a Duration.
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Returns the HTTP request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// ODPS instance configuration: credentials, endpoint and default project.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InstanceConfig {
    /// REST endpoint, e.g. `http://service.cn-hangzhou.maxcompute.aliyun.com/api`.
    pub endpoint: Option<String>,

    /// AccessKey ID.
    pub access_id: Option<String>,

    /// AccessKey secret (not recommended to store in config).
    pub access_key: Option<String>,

    /// Default project, used when an operation names no project.
    pub project: Option<String>,
}

impl InstanceConfig {
    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &InstanceConfig) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
        if other.access_id.is_some() {
            self.access_id = other.access_id.clone();
        }
        if other.access_key.is_some() {
            self.access_key = other.access_key.clone();
        }
        if other.project.is_some() {
            self.project = other.project.clone();
        }
    }

    /// Applies environment variables (ODPS_ENDPOINT, ODPS_ACCESS_ID, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.endpoint.is_none() {
            self.endpoint = std::env::var("ODPS_ENDPOINT").ok();
        }
        if self.access_id.is_none() {
            self.access_id = std::env::var("ODPS_ACCESS_ID").ok();
        }
        if self.access_key.is_none() {
            self.access_key = std::env::var("ODPS_ACCESS_KEY").ok();
        }
        if self.project.is_none() {
            self.project = std::env::var("ODPS_PROJECT").ok();
        }
    }

    /// Returns the endpoint, falling back to the public default.
    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Parses and validates the endpoint URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(self.endpoint_or_default())
            .map_err(|e| EngineError::config(format!("Invalid endpoint: {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(EngineError::config(format!(
                "Invalid scheme '{}'. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(url)
    }

    /// Returns the credentials pair, or a config error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let access_id = self
            .access_id
            .as_deref()
            .ok_or_else(|| EngineError::config("access_id is required"))?;
        let access_key = self
            .access_key
            .as_deref()
            .ok_or_else(|| EngineError::config("access_key is required"))?;
        Ok((access_id, access_key))
    }

    /// Returns a display-safe string (no secret) for log and UI purposes.
    pub fn display_string(&self) -> String {
        let project = self.project.as_deref().unwrap_or("unknown");
        let user = self.access_id.as_deref().unwrap_or("anonymous");
        format!("{project} @ {} as {user}", self.endpoint_or_default())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("odps-review")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            EngineError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named instance, or the default instance if name is None.
    pub fn get_instance(&self, name: Option<&str>) -> Option<&InstanceConfig> {
        let key = name.unwrap_or("default");
        self.instances.get(key)
    }
}
