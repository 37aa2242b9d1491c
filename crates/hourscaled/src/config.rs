//! hourscaled.toml configuration.
//!
//! ```toml
//! [controller]
//! requeue_interval = "30s"
//! error_backoff = "10s"
//! namespace = "prod"
//!
//! [logging]
//! filter = "info,hourscale=debug"
//! format = "json"
//! ```
//!
//! Every key is optional. Command-line flags override file values.
//! Durations use humantime syntax ("30s", "5m", "1h 30m").

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hourscale_kube::{ControllerSettings, DEFAULT_ERROR_BACKOFF};
use hourscale_reconcile::{DEFAULT_REQUEUE_INTERVAL, ReconcilerConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub controller: ControllerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Delay between passes over the same Scaler.
    #[serde(with = "humantime_serde")]
    pub requeue_interval: Duration,
    /// Delay before retrying a pass that failed.
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
    /// Namespace to watch; all namespaces when absent.
    pub namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_interval: DEFAULT_REQUEUE_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            namespace: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,hourscale=debug".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub requeue_interval: Option<Duration>,
    pub error_backoff: Option<Duration>,
    pub log_format: Option<LogFormat>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(ns) = overrides.namespace {
            self.controller.namespace = Some(ns);
        }
        if let Some(d) = overrides.requeue_interval {
            self.controller.requeue_interval = d;
        }
        if let Some(d) = overrides.error_backoff {
            self.controller.error_backoff = d;
        }
        if let Some(f) = overrides.log_format {
            self.logging.format = f;
        }
    }

    /// Resolve the controller section into runtime settings.
    ///
    /// Zero delays are rejected: the controller would requeue immediately
    /// and hammer the API server.
    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        let c = &self.controller;
        Ok(ControllerSettings {
            namespace: c.namespace.clone(),
            error_backoff: non_zero("error_backoff", c.error_backoff)?,
            reconciler: ReconcilerConfig {
                requeue_interval: non_zero("requeue_interval", c.requeue_interval)?,
            },
        })
    }
}

fn non_zero(field: &'static str, value: Duration) -> Result<Duration, ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroDuration { field });
    }
    Ok(value)
}
