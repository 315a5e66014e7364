//! Native change notification via `notify`.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::error::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// An entry appeared, disappeared or was renamed.
    Rename,
    /// Contents or metadata changed.
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub paths: Vec<PathBuf>,
}

impl WatchEvent {
    /// Map a raw notification. Access events are dropped.
    fn from_notify(event: Event) -> Option<Self> {
        let kind = match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                WatchEventKind::Rename
            }
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => WatchEventKind::Change,
            EventKind::Access(_) => return None,
        };
        Some(Self {
            kind,
            paths: event.paths,
        })
    }
}

/// A live watch on a resolved path. Dropping it, or calling
/// [`Self::close`], stops delivery.
#[derive(Debug)]
pub struct FsWatcher {
    path: PathBuf,
    events: mpsc::UnboundedReceiver<Result<WatchEvent>>,
    watcher: Option<RecommendedWatcher>,
}

impl FsWatcher {
    pub(crate) fn new(path: PathBuf, recursive: bool) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let item = match res {
                Ok(event) => match WatchEvent::from_notify(event) {
                    Some(event) => Ok(event),
                    None => return,
                },
                Err(e) => Err(FsError::from(e)),
            };
            let _ = tx.send(item);
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&path, mode)?;
        debug!(path = %path.display(), recursive, "watch started");

        Ok(Self {
            path,
            events,
            watcher: Some(watcher),
        })
    }

    /// The resolved path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next event. Returns `None` once the watcher is closed.
    pub async fn next_event(&mut self) -> Option<Result<WatchEvent>> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        if self.watcher.take().is_some() {
            debug!(path = %self.path.display(), "watch closed");
        }
        self.events.close();
    }
}

impl Stream for FsWatcher {
    type Item = Result<WatchEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RenameMode};

    fn event(kind: EventKind) -> Event {
        Event::new(kind).add_path(PathBuf::from("/w/a"))
    }

    #[test]
    fn test_event_mapping() {
        let mapped = |kind| WatchEvent::from_notify(event(kind)).map(|e| e.kind);

        assert_eq!(mapped(EventKind::Create(CreateKind::File)), Some(WatchEventKind::Rename));
        assert_eq!(
            mapped(EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(WatchEventKind::Rename)
        );
        assert_eq!(
            mapped(EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(WatchEventKind::Change)
        );
        assert_eq!(mapped(EventKind::Access(AccessKind::Any)), None);
    }

    #[test]
    fn test_event_keeps_paths() {
        let mapped = WatchEvent::from_notify(event(EventKind::Any)).unwrap();
        assert_eq!(mapped.paths, vec![PathBuf::from("/w/a")]);
    }
}
