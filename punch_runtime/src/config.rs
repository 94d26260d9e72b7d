//! Startup configuration.
//!
//! Loaded once. Without a config file the bot tracks the stock
//! delivery domains, rewards every 5 punches and keeps its ledger in
//! `punchcards.json`.

use std::fs;
use std::path::{Path, PathBuf};

use punch_engine::{LinkDetector, RewardEngine, DEFAULT_PUNCHES_PER_REWARD};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DATA_FILE: &str = "punchcards.json";

pub const DEFAULT_TRACKED_DOMAINS: [&str; 5] = [
    "ubereats.com",
    "doordash.com",
    "grubhub.com",
    "postmates.com",
    "deliveroo.com",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Checked in order; the first hit wins.
    pub tracked_domains: Vec<String>,
    pub punches_per_reward: u64,
    pub data_file: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tracked_domains: DEFAULT_TRACKED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            punches_per_reward: DEFAULT_PUNCHES_PER_REWARD,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}

impl RuntimeConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.punches_per_reward == 0 {
            return Err(ConfigError::Invalid(
                "punches_per_reward must be at least 1".to_string(),
            ));
        }
        if self.tracked_domains.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "tracked_domains must name at least one domain".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reward_engine(&self) -> Result<RewardEngine, ConfigError> {
        RewardEngine::new(self.punches_per_reward)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn link_detector(&self) -> LinkDetector {
        LinkDetector::new(&self.tracked_domains)
    }
}
