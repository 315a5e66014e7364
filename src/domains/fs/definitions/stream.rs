//! Stream-opening operations.
//!
//! These return a stream handle immediately, even for a denied path. The
//! denial is delivered as the stream's first event from a spawned task, so a
//! consumer that starts listening after the call returns still observes it.

use crate::domains::fs::{Operation, SafeFs};
use crate::domains::streams::{ReadStream, ReadStreamOptions, WriteStream, WriteStreamOptions};

impl SafeFs {
    /// Stream the contents of `path`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn create_read_stream(&self, path: &str) -> ReadStream {
        self.create_read_stream_with(path, ReadStreamOptions::default())
    }

    pub fn create_read_stream_with(&self, path: &str, options: ReadStreamOptions) -> ReadStream {
        match self.guard_stream(Operation::CreateReadStream, path) {
            Ok(resolved) => ReadStream::spawn(path, resolved, options),
            Err(denied) => ReadStream::denied(path, denied),
        }
    }

    /// Stream chunks into `path`, truncating it first.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn create_write_stream(&self, path: &str) -> WriteStream {
        self.create_write_stream_with(path, WriteStreamOptions::default())
    }

    pub fn create_write_stream_with(&self, path: &str, options: WriteStreamOptions) -> WriteStream {
        match self.guard_stream(Operation::CreateWriteStream, path) {
            Ok(resolved) => WriteStream::spawn(path, resolved, options),
            Err(denied) => WriteStream::denied(path, denied),
        }
    }
}
