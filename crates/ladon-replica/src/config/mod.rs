//! Replica config loader (strict parsing).

pub mod schema;

use std::fs;

use ladon_core::error::{Error, Result};

pub use schema::{FeedConfig, ReplicaConfig};

pub fn load_from_file(path: &str) -> Result<ReplicaConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ReplicaConfig> {
    let cfg: ReplicaConfig =
        serde_yaml::from_str(s).map_err(|e| Error::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
