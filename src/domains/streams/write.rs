//! Writable file streams.

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::events::{self, EventSink, EventSource, StreamEvent};
use crate::core::error::Result;
use crate::core::security::AccessDenied;

/// Options for [`crate::SafeFs::create_write_stream_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteStreamOptions {
    /// Append instead of truncating.
    pub append: bool,
    /// Permission bits for a newly created file.
    pub mode: Option<u32>,
}

/// A file being written in the background.
///
/// Chunks passed to [`Self::write`] are queued and written in order.
/// [`Self::end`] (or dropping the handle) flushes and closes the file.
#[derive(Debug)]
pub struct WriteStream {
    path: String,
    chunks: Option<mpsc::UnboundedSender<Bytes>>,
    events: EventSource,
}

impl WriteStream {
    pub(crate) fn denied(path: &str, denied: AccessDenied) -> Self {
        let (sink, events) = events::channel();
        tokio::spawn(async move {
            sink.fail(denied.into());
        });

        Self {
            path: path.to_string(),
            chunks: None,
            events,
        }
    }

    pub(crate) fn spawn(path: &str, resolved: PathBuf, options: WriteStreamOptions) -> Self {
        let (sink, events) = events::channel();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(resolved, options, rx, sink));

        Self {
            path: path.to_string(),
            chunks: Some(tx),
            events,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_failed(&self) -> bool {
        self.events.is_failed()
    }

    /// Queue a chunk. Returns `false` if the stream has ended or failed and
    /// the chunk was discarded.
    pub fn write(&self, chunk: impl Into<Bytes>) -> bool {
        if self.is_failed() {
            return false;
        }
        match &self.chunks {
            Some(tx) => tx.send(chunk.into()).is_ok(),
            None => false,
        }
    }

    /// Stop accepting chunks; the file is flushed once the queue drains.
    pub fn end(&mut self) {
        self.chunks = None;
    }

    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.next().await
    }

    /// End the stream and wait until every queued chunk is on disk.
    pub async fn finish(mut self) -> Result<()> {
        self.end();
        while let Some(event) = self.events.next().await {
            match event {
                StreamEvent::Error(error) => return Err(error),
                StreamEvent::Close => break,
                _ => {}
            }
        }
        Ok(())
    }
}

impl Stream for WriteStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_next(cx)
    }
}

async fn drain(
    path: PathBuf,
    options: WriteStreamOptions,
    mut chunks: mpsc::UnboundedReceiver<Bytes>,
    sink: EventSink,
) {
    let mut open = tokio::fs::OpenOptions::new();
    open.write(true).create(true);
    if options.append {
        open.append(true);
    } else {
        open.truncate(true);
    }
    if let Some(mode) = options.mode {
        open.mode(mode);
    }

    let mut file = match open.open(&path).await {
        Ok(file) => file,
        Err(e) => return sink.fail(e.into()),
    };
    sink.emit(StreamEvent::Open(path));

    while let Some(chunk) = chunks.recv().await {
        if let Err(e) = file.write_all(&chunk).await {
            return sink.fail(e.into());
        }
    }

    if let Err(e) = file.flush().await {
        return sink.fail(e.into());
    }
    sink.emit(StreamEvent::Finish);
    sink.emit(StreamEvent::Close);
}
