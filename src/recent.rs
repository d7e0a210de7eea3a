//! Most-recently-used notebook picks.
//!
//! [`push_recent`] computes the next list; a [`RecentPicksStore`] persists it
//! between runs.

use std::path::{Path, PathBuf};

use crate::error::{ClipperError, Result};

/// Maximum number of remembered notebook ids.
pub const MAX_RECENT: usize = 5;

/// Move `new_id` to the front of `previous`, dropping any older copy and
/// anything past [`MAX_RECENT`].
pub fn push_recent(previous: &[String], new_id: &str) -> Vec<String> {
    std::iter::once(new_id.to_string())
        .chain(previous.iter().filter(|id| *id != new_id).cloned())
        .take(MAX_RECENT)
        .collect()
}

/// Persistence for recent picks.
pub trait RecentPicksStore: Send + Sync {
    /// Stored picks, most recent first. Empty when nothing was stored yet.
    fn read(&self) -> Result<Vec<String>>;

    /// Replace the stored picks.
    fn write(&self, picks: &[String]) -> Result<()>;
}

/// Stores picks as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecentPicksStore for JsonFileStore {
    fn read(&self) -> Result<Vec<String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ClipperError::io(&self.path, e)),
        };
        serde_json::from_str(&contents).map_err(|e| {
            ClipperError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn write(&self, picks: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ClipperError::io(parent, e))?;
        }
        let contents = serde_json::to_string(picks).map_err(|e| {
            ClipperError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        std::fs::write(&self.path, contents).map_err(|e| ClipperError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), count = picks.len(), "Saved recent notebooks");
        Ok(())
    }
}
