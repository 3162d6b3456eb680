// File: src/config.rs
use crate::core::aggregator::DEFAULT_REPETITION_THRESHOLD;
use crate::error::{RaterError, RaterResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DICTIONARY_PATH_ENV: &str = "CONTENT_RATER_DICTIONARY";
pub const HISTORY_PATH_ENV: &str = "CONTENT_RATER_HISTORY";

const DEFAULT_HISTORY_LEN: usize = 5;

/// Top-level rater configuration, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaterConfig {
    /// Dictionary snapshot file.
    pub dictionary_path: PathBuf,
    /// Rating history snapshot file.
    pub history_path: PathBuf,
    pub rating: RatingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Occurrences in one category that escalate its rating a step.
    pub repetition_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Records returned when the caller does not ask for a count.
    pub default_len: usize,
}

impl Default for RaterConfig {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            dictionary_path: dir.join("dictionary.bin"),
            history_path: dir.join("history.bin"),
            rating: RatingConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            repetition_threshold: DEFAULT_REPETITION_THRESHOLD,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_len: DEFAULT_HISTORY_LEN,
        }
    }
}

impl RaterConfig {
    /// Reads `path` when given and present, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> RaterResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_toml_file(path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> RaterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| RaterError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DICTIONARY_PATH_ENV).filter(|p| !p.is_empty()) {
            self.dictionary_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(HISTORY_PATH_ENV).filter(|p| !p.is_empty()) {
            self.history_path = PathBuf::from(path);
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("content-rater")
}
