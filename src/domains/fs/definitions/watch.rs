//! Watch operations. A denied path fails immediately, before any watcher or
//! poller is created.

use std::time::Duration;

use crate::core::error::Result;
use crate::domains::fs::{Operation, SafeFs};
#[cfg(feature = "watch")]
use crate::domains::watchers::FsWatcher;
use crate::domains::watchers::{ListenerId, StatListener};

impl SafeFs {
    /// Watch `path` for native change notifications.
    #[cfg(feature = "watch")]
    pub fn watch(&self, path: &str, recursive: bool) -> Result<FsWatcher> {
        let resolved = self.guard_path(Operation::Watch, path)?;
        FsWatcher::new(resolved, recursive)
    }

    /// Poll `path` and call `listener(current, previous)` when its stat
    /// changes. `interval` defaults to the configured poll interval.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn watch_file(
        &self,
        path: &str,
        interval: Option<Duration>,
        listener: StatListener,
    ) -> Result<ListenerId> {
        let resolved = self.guard_path(Operation::WatchFile, path)?;
        let interval = interval.unwrap_or_else(|| self.watch_config().poll_interval());
        Ok(self.stat_watchers().add(resolved, interval, listener))
    }

    /// Remove one listener, or all of them when `listener` is `None`.
    pub fn unwatch_file(&self, path: &str, listener: Option<ListenerId>) -> Result<()> {
        let resolved = self.guard_path(Operation::UnwatchFile, path)?;
        self.stat_watchers().remove(&resolved, listener);
        Ok(())
    }
}
