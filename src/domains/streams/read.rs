//! Readable file streams.

use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::events::{self, EventSink, EventSource, StreamEvent};
use crate::core::error::{FsError, Result};
use crate::core::security::AccessDenied;

/// Default chunk size for read streams.
pub const DEFAULT_HIGH_WATER_MARK: usize = 64 * 1024;

/// Options for [`crate::SafeFs::create_read_stream_with`].
#[derive(Debug, Clone, Copy)]
pub struct ReadStreamOptions {
    /// First byte to read.
    pub start: Option<u64>,
    /// Last byte to read, inclusive.
    pub end: Option<u64>,
    /// Largest `Data` chunk emitted.
    pub high_water_mark: usize,
}

impl Default for ReadStreamOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

/// A file being read in the background, observed as a sequence of
/// [`StreamEvent`]s.
///
/// The handle is returned before the file is opened. Opening, reading, and
/// any failure (including a guard denial) are reported as events.
#[derive(Debug)]
pub struct ReadStream {
    path: String,
    events: EventSource,
}

impl ReadStream {
    /// A stream whose only events are `Error(denied)` and `Close`, emitted
    /// from a spawned task.
    pub(crate) fn denied(path: &str, denied: AccessDenied) -> Self {
        let (sink, events) = events::channel();
        tokio::spawn(async move {
            sink.fail(denied.into());
        });

        Self {
            path: path.to_string(),
            events,
        }
    }

    pub(crate) fn spawn(path: &str, resolved: PathBuf, options: ReadStreamOptions) -> Self {
        let (sink, events) = events::channel();
        tokio::spawn(pump(resolved, options, sink));

        Self {
            path: path.to_string(),
            events,
        }
    }

    /// The path as the caller supplied it.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether an `Error` event has been emitted.
    pub fn is_failed(&self) -> bool {
        self.events.is_failed()
    }

    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.next().await
    }

    /// Drain the stream, collecting every `Data` chunk.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut contents = Vec::new();
        while let Some(event) = self.events.next().await {
            match event {
                StreamEvent::Data(chunk) => contents.extend_from_slice(&chunk),
                StreamEvent::Error(error) => return Err(error),
                StreamEvent::Close => break,
                _ => {}
            }
        }
        Ok(contents)
    }
}

impl Stream for ReadStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_next(cx)
    }
}

async fn pump(path: PathBuf, options: ReadStreamOptions, sink: EventSink) {
    let start = options.start.unwrap_or(0);
    if let Some(end) = options.end.filter(|end| *end < start) {
        let message = format!("read range end ({end}) is before start ({start})");
        return sink.fail(io::Error::new(io::ErrorKind::InvalidInput, message).into());
    }

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => return sink.fail(e.into()),
    };
    if !sink.emit(StreamEvent::Open(path.clone())) {
        return;
    }

    if start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            return sink.fail(e.into());
        }
    }

    let mut remaining = options.end.map(|end| end.saturating_add(1).saturating_sub(start));
    let mut buf = vec![0u8; options.high_water_mark.max(1)];

    loop {
        let want = match remaining {
            Some(0) => break,
            Some(left) => left.min(buf.len() as u64) as usize,
            None => buf.len(),
        };

        match file.read(&mut buf[..want]).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(left) = remaining.as_mut() {
                    *left -= n as u64;
                }
                if !sink.emit(StreamEvent::Data(Bytes::copy_from_slice(&buf[..n]))) {
                    debug!(path = %path.display(), "read stream dropped before end");
                    return;
                }
            }
            Err(e) => return sink.fail(FsError::from(e)),
        }
    }

    sink.emit(StreamEvent::End);
    sink.emit(StreamEvent::Close);
}
