//! Dual-path operations: rename, link and symlink.
//!
//! Both paths are checked before anything else happens. When both are
//! denied the first path's error is the one reported.

use std::fs;

use tracing::info;

use crate::core::error::Result;
use crate::domains::fs::{Operation, SafeFs};

impl SafeFs {
    /// Rename or move `from` to `to`, replacing `to` if it exists.
    pub fn rename_sync(&self, from: &str, to: &str) -> Result<()> {
        let (from_path, to_path) = self.guard_pair(Operation::Rename, from, to)?;
        fs::rename(from_path, to_path)?;
        info!("Renamed '{}' to '{}'", from, to);
        Ok(())
    }

    /// Create a hard link `new` pointing at `existing`.
    pub fn link_sync(&self, existing: &str, new: &str) -> Result<()> {
        let (existing, new) = self.guard_pair(Operation::Link, existing, new)?;
        Ok(fs::hard_link(existing, new)?)
    }

    /// Create a symlink at `path` whose target is `target`.
    ///
    /// The target is checked and substituted like any other path argument,
    /// so a relative target is stored as the absolute resolved path.
    pub fn symlink_sync(&self, target: &str, path: &str) -> Result<()> {
        let (target, path) = self.guard_pair(Operation::Symlink, target, path)?;
        Ok(std::os::unix::fs::symlink(target, path)?)
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (from_path, to_path) = self.guard_pair(Operation::Rename, from, to)?;
        tokio::fs::rename(from_path, to_path).await?;
        info!("Renamed '{}' to '{}'", from, to);
        Ok(())
    }

    pub async fn link(&self, existing: &str, new: &str) -> Result<()> {
        let (existing, new) = self.guard_pair(Operation::Link, existing, new)?;
        Ok(tokio::fs::hard_link(existing, new).await?)
    }

    pub async fn symlink(&self, target: &str, path: &str) -> Result<()> {
        let (target, path) = self.guard_pair(Operation::Symlink, target, path)?;
        Ok(tokio::fs::symlink(target, path).await?)
    }
}
