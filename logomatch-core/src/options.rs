use crate::error::{GroupError, Result};
use crate::fingerprint::Fingerprint;
use logomatch_scanner::FetchSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 10;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 32;

/// Options for a grouping run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingOptions {
    /// Largest Hamming distance at which two logos still count as similar.
    /// Lower is stricter.
    pub similarity_threshold: u32,
    /// Maximum number of domains being fetched at once
    pub fetch_concurrency: usize,
    /// How many fetched logos to keep around for inspection
    pub preview_count: usize,
    pub fetch: FetchSettings,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            preview_count: 0,
            fetch: FetchSettings::default(),
        }
    }
}

impl GroupingOptions {
    /// Load options from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let options = serde_json::from_str(&content)?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.similarity_threshold > Fingerprint::BITS {
            return Err(GroupError::InvalidThreshold {
                threshold: self.similarity_threshold,
                max: Fingerprint::BITS,
            });
        }
        if self.fetch_concurrency == 0 {
            return Err(GroupError::InvalidConcurrency);
        }
        if self.fetch.image_timeout_secs == 0 || self.fetch.homepage_timeout_secs == 0 {
            return Err(GroupError::InvalidOption(
                "fetch timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}
