use std::time::Duration;

use serde::Deserialize;

use ladon_core::error::{Error, Result};

use crate::feed::Backoff;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicaConfig {
    pub version: u32,

    #[serde(default)]
    pub feed: FeedConfig,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            version: 1,
            feed: FeedConfig::default(),
        }
    }
}

impl ReplicaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::UnsupportedVersion);
        }

        self.feed.validate()?;

        Ok(())
    }
}

/// Change feed consumer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            jitter: default_jitter(),
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60_000).contains(&self.backoff_base_ms) {
            return Err(Error::Config(
                "feed.backoff_base_ms must be between 1 and 60000".into(),
            ));
        }
        if self.backoff_max_ms > 600_000 {
            return Err(Error::Config(
                "feed.backoff_max_ms must be at most 600000".into(),
            ));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(Error::Config(
                "feed.backoff_max_ms must not be less than backoff_base_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            base: Duration::from_millis(self.backoff_base_ms),
            max: Duration::from_millis(self.backoff_max_ms),
            jitter: self.jitter,
        }
    }
}

fn default_backoff_base_ms() -> u64 {
    100
}
fn default_backoff_max_ms() -> u64 {
    30_000
}
fn default_jitter() -> bool {
    true
}
