//! Filesystem facade domain.
//!
//! [`SafeFs`] exposes the native filesystem interface with every path
//! argument routed through a [`PathGuard`] first.
//!
//! ## Architecture
//!
//! - `registry.rs` - Static operation table and the per-shape guard helpers
//! - `definitions/` - Adapters, one file per shape (single path, dual path,
//!   existence, descriptor, stream, watch)
//!
//! ## Adding a New Operation
//!
//! 1. Add a variant to `Operation` in `registry.rs` and give it a shape
//! 2. Implement the async and `_sync` adapters in the file for that shape
//! 3. Route the path argument(s) through the matching guard helper

pub mod definitions;
mod registry;

use std::sync::Arc;

use crate::core::config::{Config, WatchConfig};
use crate::core::security::{GuardOptions, PathCheck, PathGuard};
use crate::domains::watchers::StatWatchers;

pub use registry::{Operation, Shape};

/// A root-confined view of the native filesystem.
///
/// Cloning is cheap and clones share the guard and the `watch_file`
/// registry. Independent instances never share anything, so several
/// differently rooted facades can coexist.
#[derive(Debug, Clone)]
pub struct SafeFs {
    guard: Arc<PathGuard>,
    watch: WatchConfig,
    stat_watchers: Arc<StatWatchers>,
}

impl SafeFs {
    /// Build a facade around a new guard.
    pub fn create(options: GuardOptions) -> Self {
        Self {
            guard: Arc::new(PathGuard::new(options)),
            watch: WatchConfig::default(),
            stat_watchers: Arc::new(StatWatchers::default()),
        }
    }

    /// Build a facade from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::create(config.guard.to_options()).with_watch_config(config.watch.clone())
    }

    pub fn with_watch_config(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Run the containment check on its own, without touching the disk.
    pub fn check(&self, path: &str) -> PathCheck {
        self.guard.check(path)
    }

    pub(crate) fn watch_config(&self) -> &WatchConfig {
        &self.watch
    }

    pub(crate) fn stat_watchers(&self) -> &StatWatchers {
        &self.stat_watchers
    }
}
