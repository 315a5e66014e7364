//! Polling stat watchers.
//!
//! One poller task runs per watched path. Every listener registered on the
//! path is called with the current and previous snapshot whenever the two
//! differ.

use std::collections::HashMap;
use std::fmt;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

/// The subset of file metadata compared between polls.
///
/// A missing file is a snapshot with `exists == false` and every other field
/// zeroed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatSnapshot {
    pub exists: bool,
    pub is_file: bool,
    pub is_dir: bool,
    pub size: u64,
    pub mode: u32,
    pub modified: Option<SystemTime>,
}

impl StatSnapshot {
    pub fn capture(path: &Path) -> Self {
        std::fs::metadata(path)
            .map(|meta| Self::from_metadata(&meta))
            .unwrap_or_default()
    }

    pub async fn capture_async(path: &Path) -> Self {
        tokio::fs::metadata(path)
            .await
            .map(|meta| Self::from_metadata(&meta))
            .unwrap_or_default()
    }

    fn from_metadata(meta: &Metadata) -> Self {
        Self {
            exists: true,
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            size: meta.len(),
            mode: meta.mode(),
            modified: meta.modified().ok(),
        }
    }
}

/// Called as `listener(current, previous)`.
pub type StatListener = Arc<dyn Fn(&StatSnapshot, &StatSnapshot) + Send + Sync>;

/// Handle for removing a single listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Shortest poll interval. Shorter requests, zero included, are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

type Listeners = Arc<Mutex<Vec<(ListenerId, StatListener)>>>;

struct Poller {
    listeners: Listeners,
    task: JoinHandle<()>,
}

/// Registry of polling watchers, keyed by resolved path.
#[derive(Default)]
pub struct StatWatchers {
    pollers: Mutex<HashMap<PathBuf, Poller>>,
    next_id: AtomicU64,
}

impl StatWatchers {
    /// Register `listener` on `path`, starting a poller if the path is not
    /// watched yet. A path that is already watched keeps its first interval.
    /// The poller takes its baseline snapshot once it starts running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn add(&self, path: PathBuf, interval: Duration, listener: StatListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut pollers = self.lock();

        if let Some(poller) = pollers.get(&path) {
            lock(&poller.listeners).push((id, listener));
            return id;
        }

        let interval = interval.max(MIN_POLL_INTERVAL);
        let listeners: Listeners = Arc::new(Mutex::new(vec![(id, listener)]));
        let task = tokio::spawn(poll(path.clone(), interval, listeners.clone()));
        debug!(path = %path.display(), interval_ms = interval.as_millis() as u64, "stat poller started");

        pollers.insert(path, Poller { listeners, task });
        id
    }

    /// Remove one listener, or every listener when `id` is `None`. The poller
    /// stops once its last listener is gone. Returns how many were removed.
    pub fn remove(&self, path: &Path, id: Option<ListenerId>) -> usize {
        let mut pollers = self.lock();
        let Some(poller) = pollers.get(path) else {
            return 0;
        };

        let (removed, empty) = {
            let mut listeners = lock(&poller.listeners);
            let before = listeners.len();
            match id {
                Some(id) => listeners.retain(|(existing, _)| *existing != id),
                None => listeners.clear(),
            }
            (before - listeners.len(), listeners.is_empty())
        };

        if empty && let Some(poller) = pollers.remove(path) {
            poller.task.abort();
            debug!(path = %path.display(), "stat poller stopped");
        }
        removed
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    pub fn listener_count(&self, path: &Path) -> usize {
        self.lock()
            .get(path)
            .map_or(0, |poller| lock(&poller.listeners).len())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Poller>> {
        lock(&self.pollers)
    }
}

impl fmt::Debug for StatWatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatWatchers")
            .field("paths", &self.watched_paths())
            .finish()
    }
}

impl Drop for StatWatchers {
    fn drop(&mut self) {
        for poller in self.lock().values() {
            poller.task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn poll(path: PathBuf, interval: Duration, listeners: Listeners) {
    let mut previous = StatSnapshot::capture_async(&path).await;
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let current = StatSnapshot::capture_async(&path).await;
        if current == previous {
            continue;
        }

        trace!(path = %path.display(), "stat changed");
        let snapshot: Vec<StatListener> = lock(&listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(&current, &previous);
        }
        previous = current;
    }
}
