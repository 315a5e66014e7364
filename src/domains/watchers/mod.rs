//! Watchers domain module.
//!
//! - `fs_watcher.rs` - Native change notification (`watch`), behind the
//!   `watch` feature
//! - `stat_watcher.rs` - Polling stat comparison (`watch_file`)

#[cfg(feature = "watch")]
pub mod fs_watcher;
pub mod stat_watcher;

#[cfg(feature = "watch")]
pub use fs_watcher::{FsWatcher, WatchEvent, WatchEventKind};
pub use stat_watcher::{ListenerId, StatListener, StatSnapshot, StatWatchers};
