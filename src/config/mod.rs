//! Configuration (layered: code > env > config file > defaults).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunStreamError};

pub const ENV_BASE_URL: &str = "RUNSTREAM_BASE_URL";
pub const ENV_API_KEY: &str = "RUNSTREAM_API_KEY";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "RUNSTREAM_CONNECT_TIMEOUT_MS";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Where and how to reach the run-execution service.
///
/// Resolution order, later wins:
/// 1. Built-in defaults
/// 2. `~/.runstream/config.toml`
/// 3. `RUNSTREAM_*` environment variables (a `.env` file is honoured)
/// 4. Explicit `with_*` calls
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout_ms: u64,
    /// Headers sent with every run request.
    pub headers: HashMap<String, String>,
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("headers", &self.headers)
            .finish()
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            headers: HashMap::new(),
        }
    }
}

impl StreamConfig {
    /// Defaults overlaid with the file at [`default_path`](Self::default_path)
    /// (if present) and the environment.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Ok(base.apply_env())
    }

    /// Defaults overlaid with the environment only.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::default().apply_env()
    }

    /// Parse a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// `~/.runstream/config.toml`
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".runstream"))
            .unwrap_or_else(|| PathBuf::from(".runstream"))
            .join("config.toml")
    }

    /// Overlay `RUNSTREAM_*` variables from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup. Empty values are skipped.
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(key) = var(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(raw) = var(ENV_CONNECT_TIMEOUT_MS) {
            match raw.trim().parse() {
                Ok(ms) => self.connect_timeout_ms = ms,
                Err(_) => tracing::warn!(
                    var = ENV_CONNECT_TIMEOUT_MS,
                    value = %raw,
                    "ignoring non-numeric connect timeout"
                ),
            }
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RunStreamError::Configuration(format!(
                "base_url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(RunStreamError::Configuration(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
