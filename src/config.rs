//! Runtime configuration shared by the navigator, diff engine and comment
//! pipeline.
//!
//! Values come from CLI flags, optionally layered over a JSON file. Every
//! component receives its copy at construction; nothing reads globals.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_DIFF_LINES: usize = 10_000;
pub const DEFAULT_SNIFF_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Commits per history page, identical for every retrieval mode.
    pub page_size: usize,
    /// Diff lines materialised per diff request.
    pub max_diff_lines: usize,
    /// Whether comment notifications are mailed at all.
    pub mail_enabled: bool,
    /// Blob prefix length used for image sniffing.
    pub sniff_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_diff_lines: DEFAULT_MAX_DIFF_LINES,
            mail_enabled: false,
            sniff_bytes: DEFAULT_SNIFF_BYTES,
        }
    }
}

impl Config {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Validation(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            AppError::Validation(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(AppError::Validation("pageSize must be at least 1".to_string()));
        }
        if self.max_diff_lines == 0 {
            return Err(AppError::Validation("maxDiffLines must be at least 1".to_string()));
        }
        Ok(())
    }
}
