//! Configuration file handling.
//!
//! A configuration file looks like this, with every key optional:
//!
//! ```toml
//! log_level = "info"
//!
//! [ask]
//! deadline_ms = 5000
//! retries = 3
//! poll_interval_ms = 5
//! ```

use crate::kernel::AskPolicy;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{path::Path, time::Duration};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Log specification in the `RUST_LOG` format, used unless the
    /// environment variable is set.
    pub log_level: String,
    pub ask: AskConfig,
}

impl Default for Config {
    fn default() -> Self {
        let policy = AskPolicy::default();
        Config {
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            ask: AskConfig {
                deadline_ms: policy
                    .deadline()
                    .and_then(|d| u64::try_from(d.as_millis()).ok()),
                retries: policy.retry_budget(),
                poll_interval_ms: None,
            },
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Config> {
        toml::from_str(source).context("Invalid configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read configuration from {}", path.display()))?;
        Config::from_toml_str(&source).with_context(|| format!("In {}", path.display()))
    }
}

/// The `[ask]` section, describing an [AskPolicy].
///
/// Leaving the section out gives the default policy. A section which is
/// present must set at least one of the bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AskConfig {
    pub deadline_ms: Option<u64>,
    pub retries: Option<usize>,
    pub poll_interval_ms: Option<u64>,
}

impl AskConfig {
    pub fn policy(&self) -> Result<AskPolicy> {
        let policy = match (self.deadline_ms, self.retries) {
            (Some(deadline), Some(retries)) => {
                AskPolicy::timeout(Duration::from_millis(deadline)).and_retry(retries)
            }
            (Some(deadline), None) => AskPolicy::timeout(Duration::from_millis(deadline)),
            (None, Some(retries)) => AskPolicy::retry(retries),
            (None, None) => bail!("[ask] needs deadline_ms, retries or both"),
        };
        Ok(match self.poll_interval_ms {
            Some(0) => bail!("[ask] poll_interval_ms must be positive"),
            Some(interval) => policy.poll_every(Duration::from_millis(interval)),
            None => policy,
        })
    }
}
