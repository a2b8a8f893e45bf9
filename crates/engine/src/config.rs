//! Arbitrator configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! yields the stock behavior.
//!
//! ```toml
//! mirror_pairs = [[0, 2], [1, 3]]
//!
//! [chassis_retry]
//! max_attempts = 3
//! backoff_ms = 100
//! ```

use std::path::{Path, PathBuf};

use homewrecker_core::SYSTEM_DRIVE_COUNT;
use homewrecker_storage::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid mirror pairs: {0}")]
    MirrorPairs(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomewreckerConfig {
    /// Slots that hold the two halves of each mirrored pair. Losing both
    /// halves of one pair is fatal on the early boot path.
    pub mirror_pairs: [[usize; 2]; 2],
    /// Retry for chassis identity store calls.
    pub chassis_retry: RetryPolicy,
}

impl Default for HomewreckerConfig {
    fn default() -> Self {
        Self {
            mirror_pairs: [[0, 2], [1, 3]],
            chassis_retry: RetryPolicy::default(),
        }
    }
}

impl HomewreckerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: HomewreckerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Mirror pair slots must be system slots, and no slot may appear twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = [false; SYSTEM_DRIVE_COUNT];
        for pair in &self.mirror_pairs {
            for &slot in pair {
                if slot >= SYSTEM_DRIVE_COUNT {
                    return Err(ConfigError::MirrorPairs(format!(
                        "slot {} is not a system slot",
                        slot
                    )));
                }
                if seen[slot] {
                    return Err(ConfigError::MirrorPairs(format!(
                        "slot {} appears more than once",
                        slot
                    )));
                }
                seen[slot] = true;
            }
        }
        Ok(())
    }

    /// True if `a` and `b` are the two halves of one mirrored pair.
    pub fn same_mirror_pair(&self, a: usize, b: usize) -> bool {
        self.mirror_pairs
            .iter()
            .any(|pair| (pair[0] == a && pair[1] == b) || (pair[0] == b && pair[1] == a))
    }
}
