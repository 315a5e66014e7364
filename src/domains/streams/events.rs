//! Stream events and the channel that carries them.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::core::error::FsError;

/// Lifecycle events emitted by [`super::ReadStream`] and [`super::WriteStream`].
///
/// A read stream emits `Open`, any number of `Data`, `End`, `Close`. A write
/// stream emits `Open`, `Finish`, `Close`. Either one emits `Error` followed
/// by `Close` when it fails, and nothing else after that.
#[derive(Debug)]
pub enum StreamEvent {
    /// The file was opened at this resolved path.
    Open(PathBuf),
    /// A chunk of file contents.
    Data(Bytes),
    /// All requested bytes were read.
    End,
    /// All written bytes were flushed.
    Finish,
    /// The stream failed.
    Error(FsError),
    /// The underlying handle was released. Always the last event.
    Close,
}

impl StreamEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Producer half, owned by the task that drives the stream.
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
    failed: Arc<AtomicBool>,
}

/// Consumer half, owned by the stream handle.
///
/// Events are buffered, so a consumer that starts listening late still sees
/// every event in order.
#[derive(Debug)]
pub(crate) struct EventSource {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    failed: Arc<AtomicBool>,
}

pub(crate) fn channel() -> (EventSink, EventSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    let failed = Arc::new(AtomicBool::new(false));
    (
        EventSink {
            tx,
            failed: failed.clone(),
        },
        EventSource { rx, failed },
    )
}

impl EventSink {
    /// Returns `false` once the consumer is gone.
    pub(crate) fn emit(&self, event: StreamEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Mark the stream failed, then emit `Error` and `Close`.
    pub(crate) fn fail(&self, error: FsError) {
        self.failed.store(true, Ordering::Release);
        self.emit(StreamEvent::Error(error));
        self.emit(StreamEvent::Close);
    }
}

impl EventSource {
    pub(crate) async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    pub(crate) fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        self.rx.poll_recv(cx)
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}
